//! Mock Storage implementation for testing

use async_trait::async_trait;
use md5::{Digest, Md5};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::traits::{ObjectMetadata, Storage, StorageError, StorageResult};
use crate::StorageBackend;

#[derive(Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

#[derive(Default)]
struct State {
    objects: HashMap<String, StoredObject>,
    /// Content type each issued PUT URL was signed for, by key.
    put_bindings: HashMap<String, String>,
    failing_deletes: u32,
    failing_heads: u32,
    fail_signing: bool,
    report_md5: bool,
    delete_calls: u32,
    download_calls: u32,
}

/// Mock storage implementation that stores objects in memory
#[derive(Clone)]
pub struct MockStorage {
    state: Arc<Mutex<State>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                report_md5: true,
                ..Default::default()
            })),
        }
    }

    /// Place an object directly, bypassing any signed URL.
    pub fn set_object(&self, key: &str, data: Vec<u8>, content_type: &str) {
        self.state.lock().unwrap().objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
    }

    /// Simulate the client's direct PUT against the URL issued for `key`. Like a real
    /// signed credential, it is refused unless `content_type` is the one it was signed for.
    pub fn client_put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        let bound = self.state.lock().unwrap().put_bindings.get(key).cloned();
        match bound {
            Some(bound) if bound == content_type => {
                self.set_object(key, data, content_type);
                Ok(())
            }
            Some(bound) => Err(StorageError::SignatureInvalid(format!(
                "URL signed for {bound}, request sent {content_type}"
            ))),
            None => Err(StorageError::SignatureInvalid(format!(
                "no upload URL issued for {key}"
            ))),
        }
    }

    /// Content type the most recent PUT URL for `key` was bound to.
    pub fn put_binding(&self, key: &str) -> Option<String> {
        self.state.lock().unwrap().put_bindings.get(key).cloned()
    }

    /// Check if an object exists in the mock storage
    pub fn has_object(&self, key: &str) -> bool {
        self.state.lock().unwrap().objects.contains_key(key)
    }

    /// Make the next `count` deletes fail.
    pub fn fail_next_deletes(&self, count: u32) {
        self.state.lock().unwrap().failing_deletes = count;
    }

    /// Make the next `count` metadata fetches fail with a backend error.
    pub fn fail_next_heads(&self, count: u32) {
        self.state.lock().unwrap().failing_heads = count;
    }

    pub fn fail_signing(&self, fail: bool) {
        self.state.lock().unwrap().fail_signing = fail;
    }

    /// Behave like a multipart S3 object whose ETag is not an MD5.
    pub fn hide_md5(&self) {
        self.state.lock().unwrap().report_md5 = false;
    }

    pub fn delete_calls(&self) -> u32 {
        self.state.lock().unwrap().delete_calls
    }

    pub fn download_calls(&self) -> u32 {
        self.state.lock().unwrap().download_calls
    }

    fn signed(&self, method: &str, key: &str, expires_in: Duration) -> StorageResult<String> {
        if self.state.lock().unwrap().fail_signing {
            return Err(StorageError::SigningFailed(
                "simulated signing failure".to_string(),
            ));
        }
        Ok(format!(
            "https://storage.test/{}?method={}&expires_in={}",
            key,
            method,
            expires_in.as_secs()
        ))
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn presigned_put_url(
        &self,
        storage_key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let url = self.signed("PUT", storage_key, expires_in)?;
        self.state
            .lock()
            .unwrap()
            .put_bindings
            .insert(storage_key.to_string(), content_type.to_string());
        Ok(format!("{url}&content_type={content_type}"))
    }

    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.signed("GET", storage_key, expires_in)
    }

    async fn head_metadata(&self, storage_key: &str) -> StorageResult<ObjectMetadata> {
        let mut state = self.state.lock().unwrap();
        if state.failing_heads > 0 {
            state.failing_heads -= 1;
            return Err(StorageError::BackendError(
                "simulated metadata failure".to_string(),
            ));
        }
        let report_md5 = state.report_md5;
        let object = state
            .objects
            .get(storage_key)
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))?;
        Ok(ObjectMetadata {
            size: object.data.len() as u64,
            content_type: Some(object.content_type.clone()),
            content_md5: report_md5.then(|| hex::encode(Md5::digest(&object.data))),
        })
    }

    async fn download_to(&self, storage_key: &str, dest: &Path) -> StorageResult<u64> {
        let data = {
            let mut state = self.state.lock().unwrap();
            state.download_calls += 1;
            state
                .objects
                .get(storage_key)
                .map(|o| o.data.clone())
                .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))?
        };
        tokio::fs::write(dest, &data).await?;
        Ok(data.len() as u64)
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls += 1;
        if state.failing_deletes > 0 {
            state.failing_deletes -= 1;
            return Err(StorageError::DeleteFailed(
                "simulated delete failure".to_string(),
            ));
        }
        state.objects.remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.has_object(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_put_honours_bound_content_type() {
        let storage = MockStorage::new();
        storage
            .presigned_put_url("o/f/file", "image/jpeg", Duration::from_secs(900))
            .await
            .unwrap();

        let result = storage.client_put("o/f/file", b"frames".to_vec(), "video/mp4");
        assert!(matches!(result, Err(StorageError::SignatureInvalid(_))));
        assert!(!storage.has_object("o/f/file"));

        storage
            .client_put("o/f/file", b"pixels".to_vec(), "image/jpeg")
            .unwrap();
        assert!(storage.has_object("o/f/file"));
    }

    #[tokio::test]
    async fn test_client_put_without_issued_url_refused() {
        let storage = MockStorage::new();
        let result = storage.client_put("o/f/file", b"x".to_vec(), "image/jpeg");
        assert!(matches!(result, Err(StorageError::SignatureInvalid(_))));
    }

    #[tokio::test]
    async fn test_download_to_writes_object() {
        let storage = MockStorage::new();
        storage.set_object("o/f/file", b"hello".to_vec(), "image/png");
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("copy");

        assert_eq!(storage.download_to("o/f/file", &dest).await.unwrap(), 5);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
    }
}
