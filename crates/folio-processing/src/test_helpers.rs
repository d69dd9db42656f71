//! Configurable extractor for tests

use async_trait::async_trait;
use folio_core::MediaType;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{ExtractionError, ExtractionResult};
use crate::metadata::MediaMetadata;
use crate::traits::MetadataExtractor;

/// Returns a canned result and records what it was asked to probe.
#[derive(Clone, Default)]
pub struct MockExtractor {
    result: Arc<Mutex<Option<MediaMetadata>>>,
    calls: Arc<Mutex<Vec<MediaType>>>,
    inputs: Arc<Mutex<Vec<(PathBuf, Vec<u8>)>>>,
}

impl MockExtractor {
    /// Extraction succeeds with `metadata`.
    pub fn returning(metadata: MediaMetadata) -> Self {
        let mock = Self::default();
        *mock.result.lock().unwrap() = Some(metadata);
        mock
    }

    /// Extraction fails with a probe error.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MediaType> {
        self.calls.lock().unwrap().clone()
    }

    /// Each probed file's path and the contents it held at probe time.
    pub fn inputs(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataExtractor for MockExtractor {
    async fn extract(
        &self,
        media_type: MediaType,
        path: &Path,
    ) -> ExtractionResult<MediaMetadata> {
        self.calls.lock().unwrap().push(media_type);
        let contents = tokio::fs::read(path).await?;
        self.inputs
            .lock()
            .unwrap()
            .push((path.to_path_buf(), contents));
        self.result
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ExtractionError::Probe("simulated probe failure".to_string()))
    }
}
