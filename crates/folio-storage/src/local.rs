use crate::digest::md5_file;
use crate::keys::validate_key;
use crate::traits::{ObjectMetadata, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncRead;

type HmacSha256 = Hmac<Sha256>;

/// Sidecar directory holding each object's content type, outside the key namespace
/// (keys may not start with `.`).
const META_DIR: &str = ".meta";

/// Local filesystem storage implementation
///
/// Signed URLs point at `{base_url}/{key}` and carry
/// `method`, `expires` and an HMAC-SHA256 `signature` over
/// `method \n key \n content_type \n expires`. PUT URLs also carry the bound
/// `content_type`; GET URLs sign an empty one. The API serves these URLs and checks
/// them with [`LocalStorage::verify_signed`].
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    signing_key: Vec<u8>,
}

/// An open object ready to be streamed back to a client.
pub struct LocalObject {
    pub file: fs::File,
    pub size: u64,
    pub content_type: Option<String>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/folio/media")
    /// * `base_url` - Base URL the API serves objects under (e.g., "http://localhost:3000/media")
    /// * `signing_key` - HMAC key for signed URLs
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        signing_key: impl Into<Vec<u8>>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();
        let signing_key = signing_key.into();

        if signing_key.is_empty() {
            return Err(StorageError::ConfigError(
                "Local storage requires a URL signing key".to_string(),
            ));
        }

        fs::create_dir_all(base_path.join(META_DIR))
            .await
            .map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    base_path.display(),
                    e
                ))
            })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            signing_key,
        })
    }

    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;
        Ok(self.base_path.join(storage_key))
    }

    fn meta_path(&self, storage_key: &str) -> PathBuf {
        self.base_path.join(META_DIR).join(storage_key)
    }

    fn mac(
        &self,
        method: &str,
        storage_key: &str,
        content_type: &str,
        expires: i64,
    ) -> StorageResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?;
        mac.update(format!("{method}\n{storage_key}\n{content_type}\n{expires}").as_bytes());
        Ok(mac)
    }

    fn signed_url(
        &self,
        method: &str,
        storage_key: &str,
        content_type: Option<&str>,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.key_to_path(storage_key)?;
        let expires = Utc::now().timestamp() + expires_in.as_secs() as i64;
        let signature = hex::encode(
            self.mac(method, storage_key, content_type.unwrap_or_default(), expires)?
                .finalize()
                .into_bytes(),
        );

        let base = format!("{}/{}", self.base_url.trim_end_matches('/'), storage_key);
        Ok(match content_type {
            Some(content_type) => format!(
                "{base}?method={method}&content_type={}&expires={expires}&signature={signature}",
                urlencoding::encode(content_type)
            ),
            None => format!("{base}?method={method}&expires={expires}&signature={signature}"),
        })
    }

    /// Check a signed URL presented back to the API.
    ///
    /// For a PUT, `content_type` is the `Content-Type` the client actually sent; it must
    /// equal the type the URL was issued for.
    pub fn verify_signed(
        &self,
        method: &str,
        storage_key: &str,
        content_type: Option<&str>,
        expires: i64,
        signature: &str,
    ) -> StorageResult<()> {
        validate_key(storage_key)?;
        let tag = hex::decode(signature)
            .map_err(|_| StorageError::SignatureInvalid("malformed signature".to_string()))?;

        self.mac(method, storage_key, content_type.unwrap_or_default(), expires)?
            .verify_slice(&tag)
            .map_err(|_| StorageError::SignatureInvalid("signature mismatch".to_string()))?;

        if Utc::now().timestamp() > expires {
            return Err(StorageError::SignatureExpired);
        }
        Ok(())
    }

    /// Stream a client upload into the store, recording its content type.
    pub async fn write_stream<R>(
        &self,
        storage_key: &str,
        content_type: &str,
        mut reader: R,
    ) -> StorageResult<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let path = self.key_to_path(storage_key)?;
        let meta_path = self.meta_path(storage_key);
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;
        self.ensure_parent_dir(&meta_path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let size = match tokio::io::copy(&mut reader, &mut file).await {
            Ok(size) => size,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        fs::write(&meta_path, content_type).await?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(size)
    }

    /// Open an object for a streamed read.
    pub async fn open(&self, storage_key: &str) -> StorageResult<LocalObject> {
        let path = self.key_to_path(storage_key)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => return Err(StorageError::DownloadFailed(e.to_string())),
        };
        let size = file.metadata().await?.len();

        Ok(LocalObject {
            file,
            size,
            content_type: self.stored_content_type(storage_key).await,
        })
    }

    async fn stored_content_type(&self, storage_key: &str) -> Option<String> {
        fs::read_to_string(self.meta_path(storage_key))
            .await
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn presigned_put_url(
        &self,
        storage_key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.signed_url("PUT", storage_key, Some(content_type), expires_in)
    }

    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.signed_url("GET", storage_key, None, expires_in)
    }

    async fn head_metadata(&self, storage_key: &str) -> StorageResult<ObjectMetadata> {
        let path = self.key_to_path(storage_key)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => return Err(StorageError::BackendError(e.to_string())),
        };

        Ok(ObjectMetadata {
            size: meta.len(),
            content_type: self.stored_content_type(storage_key).await,
            content_md5: Some(md5_file(&path).await?),
        })
    }

    async fn download_to(&self, storage_key: &str, dest: &Path) -> StorageResult<u64> {
        let path = self.key_to_path(storage_key)?;

        match fs::copy(&path, dest).await {
            Ok(size) => Ok(size),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::DownloadFailed(format!(
                "Failed to copy file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;
        // Orphaned sidecars are harmless
        let _ = fs::remove_file(self.meta_path(storage_key)).await;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;

    const SECRET: &[u8] = b"local-signing-secret";

    async fn storage(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::new(dir.path(), "http://localhost:3000/media".to_string(), SECRET)
            .await
            .unwrap()
    }

    fn query_param(url: &str, name: &str) -> Option<String> {
        let (_, query) = url.split_once('?')?;
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| urlencoding::decode(value).unwrap().into_owned())
        })
    }

    fn expires_of(url: &str) -> i64 {
        query_param(url, "expires").unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_write_then_head_reports_real_metadata() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let written = storage
            .write_stream("o/f/file", "image/png", &b"hello world"[..])
            .await
            .unwrap();
        assert_eq!(written, 11);

        let meta = storage.head_metadata("o/f/file").await.unwrap();
        assert_eq!(meta.size, 11);
        assert_eq!(meta.content_type.as_deref(), Some("image/png"));
        assert_eq!(
            meta.content_md5.as_deref(),
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );

        let dest = dir.path().join("copy");
        assert_eq!(storage.download_to("o/f/file", &dest).await.unwrap(), 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_open_streams_stored_object() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        storage
            .write_stream("o/f/file", "video/mp4", &b"frames"[..])
            .await
            .unwrap();

        let mut object = storage.open("o/f/file").await.unwrap();
        assert_eq!(object.size, 6);
        assert_eq!(object.content_type.as_deref(), Some("video/mp4"));
        let mut body = Vec::new();
        object.file.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"frames");

        assert!(matches!(
            storage.open("o/f/missing").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_head_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let result = storage.head_metadata("o/f/missing").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        let result = storage
            .download_to("o/f/missing", &dir.path().join("copy"))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let result = storage
            .download_to("../../../etc/passwd", &dir.path().join("copy"))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.head_metadata(".meta/o/f/file").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .write_stream("../outside", "image/png", &b"x"[..])
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        storage
            .write_stream("o/f/file", "image/jpeg", &b"x"[..])
            .await
            .unwrap();
        storage.delete("o/f/file").await.unwrap();
        assert!(!storage.exists("o/f/file").await.unwrap());
        storage.delete("o/f/file").await.unwrap();
    }

    #[tokio::test]
    async fn test_signed_urls_carry_method_expiry_and_signature() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let url = storage
            .presigned_put_url("o/f/file", "image/jpeg", Duration::from_secs(900))
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:3000/media/o/f/file?method=PUT&"));
        assert_eq!(query_param(&url, "content_type").as_deref(), Some("image/jpeg"));
        assert_eq!(query_param(&url, "signature").unwrap().len(), 64);
        assert!(expires_of(&url) > Utc::now().timestamp());

        let url = storage
            .presigned_get_url("o/f/file", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(query_param(&url, "method").as_deref(), Some("GET"));
        assert!(query_param(&url, "content_type").is_none());
    }

    #[tokio::test]
    async fn test_put_url_is_bound_to_its_content_type() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let jpeg = storage
            .presigned_put_url("o/f/file", "image/jpeg", Duration::from_secs(900))
            .await
            .unwrap();
        let mp4 = storage
            .presigned_put_url("o/f/file", "video/mp4", Duration::from_secs(900))
            .await
            .unwrap();
        assert_ne!(jpeg, mp4);

        let signature = query_param(&jpeg, "signature").unwrap();
        let expires = expires_of(&jpeg);

        storage
            .verify_signed("PUT", "o/f/file", Some("image/jpeg"), expires, &signature)
            .unwrap();
        assert!(matches!(
            storage.verify_signed("PUT", "o/f/file", Some("video/mp4"), expires, &signature),
            Err(StorageError::SignatureInvalid(_))
        ));
    }

    #[tokio::test]
    async fn test_signature_does_not_transfer() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let put = storage
            .presigned_put_url("o/f/file", "image/jpeg", Duration::from_secs(900))
            .await
            .unwrap();
        let signature = query_param(&put, "signature").unwrap();
        let expires = expires_of(&put);

        // other key, other method, extended expiry
        for (method, key, expires) in [
            ("PUT", "o/f/other", expires),
            ("GET", "o/f/file", expires),
            ("PUT", "o/f/file", expires + 3600),
        ] {
            let content_type = (method == "PUT").then_some("image/jpeg");
            assert!(matches!(
                storage.verify_signed(method, key, content_type, expires, &signature),
                Err(StorageError::SignatureInvalid(_))
            ));
        }

        assert!(matches!(
            storage.verify_signed("PUT", "o/f/file", Some("image/jpeg"), expires, "zz"),
            Err(StorageError::SignatureInvalid(_))
        ));

        let other = LocalStorage::new(
            dir.path(),
            "http://localhost:3000/media".to_string(),
            b"another-secret".to_vec(),
        )
        .await
        .unwrap();
        assert!(matches!(
            other.verify_signed("PUT", "o/f/file", Some("image/jpeg"), expires, &signature),
            Err(StorageError::SignatureInvalid(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_signature_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let expires = Utc::now().timestamp() - 1;
        let signature = hex::encode(
            storage
                .mac("GET", "o/f/file", "", expires)
                .unwrap()
                .finalize()
                .into_bytes(),
        );

        assert!(matches!(
            storage.verify_signed("GET", "o/f/file", None, expires, &signature),
            Err(StorageError::SignatureExpired)
        ));
    }

    #[tokio::test]
    async fn test_empty_signing_key_rejected() {
        let dir = tempdir().unwrap();
        let result =
            LocalStorage::new(dir.path(), "http://localhost/media".to_string(), Vec::new()).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }
}
