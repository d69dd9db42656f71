use folio_core::validation::UploadLimits;
use folio_core::Config;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Upload saga tunables, taken from [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct UploadSettings {
    pub upload_url_ttl: Duration,
    pub read_url_ttl: Duration,
    pub limits: UploadLimits,
    pub compensation_retry: RetryPolicy,
}

impl UploadSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            upload_url_ttl: Duration::from_secs(config.upload_url_ttl_secs),
            read_url_ttl: Duration::from_secs(config.read_url_ttl_secs),
            limits: UploadLimits {
                max_image_bytes: config.max_image_size_bytes,
                max_video_bytes: config.max_video_size_bytes,
            },
            compensation_retry: RetryPolicy::default(),
        }
    }
}
