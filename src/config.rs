use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SignbuddyConfig {
    pub camera: CameraConfig,
    pub sampler: SamplerConfig,
    pub detection: DetectionConfig,
    pub practice: PracticeConfig,
    pub system: SystemConfig,
    pub stub: StubConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second requested from the device
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Which camera backend to open
    #[serde(default = "default_camera_source")]
    pub source: CameraSource,

    /// How long to wait for the first frame after opening the device
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraSource {
    /// V4L2 device through a GStreamer pipeline
    Gstreamer,
    /// Generated test pattern, no hardware needed
    Synthetic,
}

impl CameraSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraSource::Gstreamer => "gstreamer",
            CameraSource::Synthetic => "synthetic",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SamplerConfig {
    /// Interval between sampled frames
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// JPEG quality for encoded frames (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl SamplerConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DetectionConfig {
    /// Base URL of the inference service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the detection endpoint below the base URL
    #[serde(default = "default_detect_path")]
    pub detect_path: String,

    /// Per-request timeout
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Minimum confidence for a letter to be reported at all
    #[serde(default = "default_report_threshold")]
    pub report_threshold: f64,

    /// Minimum confidence for a reported letter to be emphasized
    #[serde(default = "default_highlight_threshold")]
    pub highlight_threshold: f64,
}

impl DetectionConfig {
    /// Full URL of the detection endpoint
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.detect_path.starts_with('/') {
            format!("{}{}", base, self.detect_path)
        } else {
            format!("{}/{}", base, self.detect_path)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PracticeConfig {
    /// Cooldown after a scored letter
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl PracticeConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StubConfig {
    /// IP address the stub detection server binds to
    #[serde(default = "default_stub_ip")]
    pub ip: String,

    /// Port the stub detection server listens on
    #[serde(default = "default_stub_port")]
    pub port: u16,

    /// Chance that the stub answers "No hand detected"
    #[serde(default = "default_no_hand_probability")]
    pub no_hand_probability: f64,
}

impl SignbuddyConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("signbuddy.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.source", default_camera_source().as_str())?
            .set_default(
                "camera.startup_timeout_ms",
                default_startup_timeout_ms() as i64,
            )?
            .set_default(
                "sampler.sample_interval_ms",
                default_sample_interval_ms() as i64,
            )?
            .set_default("sampler.jpeg_quality", default_jpeg_quality() as i64)?
            .set_default("detection.base_url", default_base_url())?
            .set_default("detection.detect_path", default_detect_path())?
            .set_default(
                "detection.request_timeout_ms",
                default_request_timeout_ms() as i64,
            )?
            .set_default("detection.report_threshold", default_report_threshold())?
            .set_default(
                "detection.highlight_threshold",
                default_highlight_threshold(),
            )?
            .set_default("practice.cooldown_ms", default_cooldown_ms() as i64)?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("stub.ip", default_stub_ip())?
            .set_default("stub.port", default_stub_port())?
            .set_default("stub.no_hand_probability", default_no_hand_probability())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // SIGNBUDDY_DETECTION__BASE_URL -> detection.base_url
            .add_source(
                Environment::with_prefix("SIGNBUDDY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: SignbuddyConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if !(100..=10_000).contains(&self.sampler.sample_interval_ms) {
            return Err(ConfigError::Message(
                "Sampler sample_interval_ms must be between 100 and 10000".to_string(),
            ));
        }

        if !(1..=100).contains(&self.sampler.jpeg_quality) {
            return Err(ConfigError::Message(
                "Sampler jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        let report = self.detection.report_threshold;
        let highlight = self.detection.highlight_threshold;
        if !(0.0..=1.0).contains(&report) || !(0.0..=1.0).contains(&highlight) {
            return Err(ConfigError::Message(
                "Detection thresholds must be within [0, 1]".to_string(),
            ));
        }

        if highlight < report {
            return Err(ConfigError::Message(
                "Detection highlight_threshold must not be below report_threshold".to_string(),
            ));
        }

        if !self.detection.base_url.starts_with("http://")
            && !self.detection.base_url.starts_with("https://")
        {
            return Err(ConfigError::Message(format!(
                "Detection base_url must be an http(s) URL, got '{}'",
                self.detection.base_url
            )));
        }

        if self.detection.request_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Detection request_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.practice.cooldown_ms == 0 {
            return Err(ConfigError::Message(
                "Practice cooldown_ms must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.stub.no_hand_probability) {
            return Err(ConfigError::Message(
                "Stub no_hand_probability must be within [0, 1]".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SignbuddyConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                source: default_camera_source(),
                startup_timeout_ms: default_startup_timeout_ms(),
            },
            sampler: SamplerConfig {
                sample_interval_ms: default_sample_interval_ms(),
                jpeg_quality: default_jpeg_quality(),
            },
            detection: DetectionConfig {
                base_url: default_base_url(),
                detect_path: default_detect_path(),
                request_timeout_ms: default_request_timeout_ms(),
                report_threshold: default_report_threshold(),
                highlight_threshold: default_highlight_threshold(),
            },
            practice: PracticeConfig {
                cooldown_ms: default_cooldown_ms(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
            stub: StubConfig {
                ip: default_stub_ip(),
                port: default_stub_port(),
                no_hand_probability: default_no_hand_probability(),
            },
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    30
}
fn default_camera_source() -> CameraSource {
    if cfg!(all(feature = "camera", target_os = "linux")) {
        CameraSource::Gstreamer
    } else {
        CameraSource::Synthetic
    }
}
fn default_startup_timeout_ms() -> u64 {
    5000
}

fn default_sample_interval_ms() -> u64 {
    1000
}
fn default_jpeg_quality() -> u8 {
    85
}

fn default_base_url() -> String {
    "http://127.0.0.1:3001".to_string()
}
fn default_detect_path() -> String {
    "/detect".to_string()
}
fn default_request_timeout_ms() -> u64 {
    5000
}
fn default_report_threshold() -> f64 {
    0.75
}
fn default_highlight_threshold() -> f64 {
    0.85
}

fn default_cooldown_ms() -> u64 {
    2000
}

fn default_event_bus_capacity() -> usize {
    100
}

fn default_stub_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_stub_port() -> u16 {
    3001
}
fn default_no_hand_probability() -> f64 {
    0.2
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SignbuddyConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.sampler.sample_interval(), Duration::from_millis(1000));
        assert_eq!(config.practice.cooldown(), Duration::from_millis(2000));
        assert_eq!(config.detection.report_threshold, 0.75);
        assert_eq!(config.detection.highlight_threshold, 0.85);
    }

    #[test]
    fn test_endpoint_joining() {
        let mut config = SignbuddyConfig::default();
        config.detection.base_url = "http://localhost:3001/".to_string();
        assert_eq!(config.detection.endpoint(), "http://localhost:3001/detect");

        config.detection.detect_path = "api/detect".to_string();
        assert_eq!(config.detection.endpoint(), "http://localhost:3001/api/detect");
    }

    #[test]
    fn test_config_validation() {
        let mut config = SignbuddyConfig::default();
        config.camera.resolution = (0, 0);
        assert!(config.validate().is_err());
        config.camera.resolution = (640, 480);
        assert!(config.validate().is_ok());

        config.detection.highlight_threshold = 0.5;
        assert!(config.validate().is_err());
        config.detection.highlight_threshold = 0.85;

        config.detection.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
        config.detection.base_url = "https://example.com".to_string();

        config.sampler.sample_interval_ms = 50;
        assert!(config.validate().is_err());
        config.sampler.sample_interval_ms = 500;

        config.practice.cooldown_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[camera]
source = "synthetic"
resolution = [320, 240]

[sampler]
sample_interval_ms = 500

[detection]
base_url = "http://inference.local:5000"
report_threshold = 0.6
highlight_threshold = 0.9

[practice]
cooldown_ms = 1500
"#
        )
        .unwrap();

        let config = SignbuddyConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.camera.source, CameraSource::Synthetic);
        assert_eq!(config.camera.resolution, (320, 240));
        assert_eq!(config.sampler.sample_interval_ms, 500);
        assert_eq!(config.detection.base_url, "http://inference.local:5000");
        assert_eq!(config.detection.report_threshold, 0.6);
        assert_eq!(config.detection.highlight_threshold, 0.9);
        assert_eq!(config.practice.cooldown_ms, 1500);
        // Untouched sections keep their defaults
        assert_eq!(config.sampler.jpeg_quality, 85);
        assert_eq!(config.stub.port, 3001);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SignbuddyConfig::load_from_file(dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.detection.detect_path, "/detect");
        assert_eq!(config.practice.cooldown_ms, 2000);
    }
}
