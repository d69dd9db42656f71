//! Video probing through `ffprobe`.

pub mod processor;

pub use processor::VideoProcessor;
