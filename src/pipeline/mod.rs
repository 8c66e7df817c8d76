mod detection_loop;

pub use detection_loop::{DetectionLoop, DetectionLoopHandle, LoopCommand};
