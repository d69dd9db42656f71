use folio_core::MediaType;
use thiserror::Error;

/// Errors raised while probing stored media.
///
/// None of these fail an upload: the finalizer logs them and commits the file without
/// enrichment.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("No extractor available for {0} files")]
    Unsupported(MediaType),

    #[cfg(feature = "image")]
    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("ffprobe failed: {0}")]
    Probe(String),

    #[error("Unexpected probe output: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;
