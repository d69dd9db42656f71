//! Content hashing over files, in bounded memory.

use md5::{Digest, Md5};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::traits::StorageResult;

const CHUNK_BYTES: usize = 64 * 1024;

/// Lowercase hex MD5 of a file, read in 64 KiB chunks.
pub async fn md5_file(path: &Path) -> StorageResult<String> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; CHUNK_BYTES];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}
