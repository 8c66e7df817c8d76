use crate::error::EncodeError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Prefix of the data URL carried in detection requests
pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Frame format enumeration supporting the formats our camera sources produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// Motion JPEG format - compressed JPEG frames
    Mjpeg,
    /// RGB24 format - uncompressed RGB data
    Rgb24,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Mjpeg => 0, // Variable size, compressed
            FrameFormat::Rgb24 => 3,
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, FrameFormat::Mjpeg)
    }
}

/// Immutable camera frame snapshot
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Per-source frame counter
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared ownership, frames are never mutated)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
}

impl FrameData {
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Get the expected frame size for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => true,
        }
    }

    /// Get frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A sampled frame ready for transmission to the detection service
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Sampler sequence number, strictly increasing in issue order
    pub sequence: u64,
    pub captured_at: SystemTime,
    pub width: u32,
    pub height: u32,
    /// `data:image/jpeg;base64,...`
    pub data_url: String,
}

/// Frame encoding utilities
pub struct FrameProcessor;

impl FrameProcessor {
    /// Convert frame to JPEG bytes
    pub fn encode_jpeg(frame: &FrameData, quality: u8) -> Result<Vec<u8>, EncodeError> {
        match frame.format {
            FrameFormat::Mjpeg => Ok(frame.data.as_ref().clone()),
            FrameFormat::Rgb24 => {
                if !frame.validate_size() {
                    return Err(EncodeError::InvalidSize {
                        frame_id: frame.id,
                        expected: frame.expected_size().unwrap_or_default(),
                        actual: frame.data.len(),
                    });
                }

                let mut buf = Vec::new();
                let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
                encoder
                    .encode(&frame.data, frame.width, frame.height, image::ColorType::Rgb8)
                    .map_err(|e| EncodeError::Jpeg {
                        details: e.to_string(),
                    })?;

                tracing::trace!(
                    "Encoded RGB24 frame {} ({}x{}) into {} JPEG bytes",
                    frame.id,
                    frame.width,
                    frame.height,
                    buf.len()
                );

                Ok(buf)
            }
        }
    }

    /// Wrap JPEG bytes in the data URL form the detection service expects
    pub fn to_data_url(jpeg: &[u8]) -> String {
        let mut url = String::with_capacity(JPEG_DATA_URL_PREFIX.len() + jpeg.len() * 4 / 3 + 4);
        url.push_str(JPEG_DATA_URL_PREFIX);
        BASE64.encode_string(jpeg, &mut url);
        url
    }

    /// Encode a frame for a detection request
    pub fn encode_for_detection(
        frame: &FrameData,
        sequence: u64,
        quality: u8,
    ) -> Result<EncodedFrame, EncodeError> {
        let jpeg = Self::encode_jpeg(frame, quality)?;

        Ok(EncodedFrame {
            sequence,
            captured_at: frame.timestamp,
            width: frame.width,
            height: frame.height,
            data_url: Self::to_data_url(&jpeg),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_frame(width: u32, height: u32) -> FrameData {
        let data = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
        FrameData::new(7, SystemTime::now(), data, width, height, FrameFormat::Rgb24)
    }

    #[test]
    fn test_frame_format_properties() {
        assert_eq!(FrameFormat::Mjpeg.bytes_per_pixel(), 0);
        assert_eq!(FrameFormat::Rgb24.bytes_per_pixel(), 3);
        assert!(FrameFormat::Mjpeg.is_compressed());
        assert!(!FrameFormat::Rgb24.is_compressed());
    }

    #[test]
    fn test_frame_size_validation() {
        assert!(rgb_frame(32, 24).validate_size());

        let short = FrameData::new(2, SystemTime::now(), vec![0u8; 10], 32, 24, FrameFormat::Rgb24);
        assert!(!short.validate_size());

        let mjpeg = FrameData::new(3, SystemTime::now(), vec![0u8; 5000], 640, 480, FrameFormat::Mjpeg);
        assert!(mjpeg.validate_size());
    }

    #[test]
    fn test_rgb_frame_encodes_to_jpeg() {
        let jpeg = FrameProcessor::encode_jpeg(&rgb_frame(32, 24), 80).unwrap();

        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_mjpeg_frame_passes_through() {
        let bytes = vec![0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9];
        let frame = FrameData::new(1, SystemTime::now(), bytes.clone(), 2, 2, FrameFormat::Mjpeg);

        assert_eq!(FrameProcessor::encode_jpeg(&frame, 85).unwrap(), bytes);
    }

    #[test]
    fn test_invalid_rgb_frame_is_rejected() {
        let frame = FrameData::new(9, SystemTime::now(), vec![0u8; 10], 32, 24, FrameFormat::Rgb24);

        match FrameProcessor::encode_jpeg(&frame, 85) {
            Err(EncodeError::InvalidSize { frame_id, expected, actual }) => {
                assert_eq!(frame_id, 9);
                assert_eq!(expected, 32 * 24 * 3);
                assert_eq!(actual, 10);
            }
            other => panic!("Expected size error, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_for_detection_builds_data_url() {
        let frame = rgb_frame(16, 16);
        let encoded = FrameProcessor::encode_for_detection(&frame, 42, 85).unwrap();

        assert_eq!(encoded.sequence, 42);
        assert_eq!(encoded.captured_at, frame.timestamp);
        assert!(encoded.data_url.starts_with(JPEG_DATA_URL_PREFIX));

        let payload = &encoded.data_url[JPEG_DATA_URL_PREFIX.len()..];
        let decoded = BASE64.decode(payload).unwrap();
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
    }
}
