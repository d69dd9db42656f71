//! Two-phase upload: initiate reserves a pending file and hands out a signed PUT URL;
//! the client writes the bytes straight to the blob store; finalize verifies what
//! arrived against the ticket and either commits the file or compensates.

pub mod finalizer;
pub mod initiator;

pub use finalizer::UploadFinalizer;
pub use initiator::UploadInitiator;

/// Lowercased MIME type without parameters (`Image/JPEG; q=1` -> `image/jpeg`).
pub(crate) fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
