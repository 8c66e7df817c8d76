mod core;

pub use core::FrameSampler;
