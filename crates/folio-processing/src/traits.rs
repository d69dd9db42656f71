use async_trait::async_trait;
use folio_core::MediaType;
use std::path::Path;

use crate::error::ExtractionResult;
use crate::metadata::MediaMetadata;

/// Probe for one media family. Works on a file so large videos are never buffered.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    type Metadata: Send;

    async fn extract_metadata(&self, path: &Path) -> ExtractionResult<Self::Metadata>;
}

/// Dispatches a downloaded object to the probe for its media family.
///
/// Object-safe so the upload finalizer can hold it as `Arc<dyn MetadataExtractor>`.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(
        &self,
        media_type: MediaType,
        path: &Path,
    ) -> ExtractionResult<MediaMetadata>;
}
