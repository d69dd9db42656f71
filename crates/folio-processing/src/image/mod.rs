//! Image probing: dimensions and format via `image`, EXIF tags via `kamadak-exif`.

pub mod exif_tags;
pub mod processor;

pub use processor::ImageProcessor;
