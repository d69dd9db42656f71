//! Declared-upload validation
//!
//! Runs before anything is written: a rejected declaration leaves no file row, no
//! ticket and no signed URL behind.
//!
//! Rules:
//! - Schema constraints from the request DTO (name length, size >= 1, md5 length)
//! - Name has no path separators or control characters
//! - MD5 is 32 hexadecimal characters
//! - Content type is `image/*` or `video/*`
//! - Size does not exceed the per-family limit

use validator::Validate;

use crate::error::AppError;
use crate::models::{InitiateUploadRequest, MediaType};

/// Per-family size ceilings, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_image_bytes: u64,
    pub max_video_bytes: u64,
}

impl UploadLimits {
    pub fn max_for(&self, media_type: MediaType) -> u64 {
        match media_type {
            MediaType::Image => self.max_image_bytes,
            MediaType::Video => self.max_video_bytes,
        }
    }
}

/// Validate a declaration and return the media family it belongs to.
pub fn validate_declared_upload(
    request: &InitiateUploadRequest,
    limits: &UploadLimits,
) -> Result<MediaType, AppError> {
    request.validate()?;

    if request
        .name
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(AppError::InvalidInput(format!(
            "Filename '{}' contains path separators or control characters",
            request.name.escape_debug()
        )));
    }

    if !request.md5.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::InvalidInput(
            "MD5 must be 32 hexadecimal characters".to_string(),
        ));
    }

    let media_type = MediaType::from_content_type(&request.content_type).ok_or_else(|| {
        AppError::InvalidFileType(format!(
            "Content type '{}' is not supported; only image/* and video/* are accepted",
            request.content_type
        ))
    })?;

    // "image/" alone names a family, not a type
    if request
        .content_type
        .split_once('/')
        .map_or(true, |(_, subtype)| subtype.trim().is_empty())
    {
        return Err(AppError::InvalidFileType(format!(
            "Content type '{}' has no subtype",
            request.content_type
        )));
    }

    let max = limits.max_for(media_type);
    if request.size > max {
        return Err(AppError::InvalidInput(format!(
            "File size {} exceeds the {} limit of {} bytes",
            request.size, media_type, max
        )));
    }

    Ok(media_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: UploadLimits = UploadLimits {
        max_image_bytes: 1_000_000,
        max_video_bytes: 10_000_000,
    };

    fn request(content_type: &str, size: u64) -> InitiateUploadRequest {
        InitiateUploadRequest {
            name: "beach.jpg".to_string(),
            size,
            content_type: content_type.to_string(),
            md5: "0123456789abcdef0123456789ABCDEF".to_string(),
        }
    }

    #[test]
    fn test_accepts_image_and_video() {
        assert_eq!(
            validate_declared_upload(&request("image/jpeg", 500_000), &LIMITS).unwrap(),
            MediaType::Image
        );
        assert_eq!(
            validate_declared_upload(&request("video/mp4", 5_000_000), &LIMITS).unwrap(),
            MediaType::Video
        );
    }

    #[test]
    fn test_rejects_other_families_as_invalid_file_type() {
        for content_type in ["application/pdf", "text/plain", "image/", "audio/mpeg"] {
            let err = validate_declared_upload(&request(content_type, 10), &LIMITS).unwrap_err();
            assert!(
                matches!(err, AppError::InvalidFileType(_)),
                "{content_type} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_rejects_bad_md5() {
        let mut req = request("image/png", 10);
        req.md5 = "z".repeat(32);
        assert!(matches!(
            validate_declared_upload(&req, &LIMITS),
            Err(AppError::InvalidInput(_))
        ));

        req.md5 = "abc".to_string();
        assert!(matches!(
            validate_declared_upload(&req, &LIMITS),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_zero_and_oversized() {
        assert!(matches!(
            validate_declared_upload(&request("image/png", 0), &LIMITS),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_declared_upload(&request("image/png", 1_000_001), &LIMITS),
            Err(AppError::InvalidInput(_))
        ));
        assert!(validate_declared_upload(&request("video/mp4", 1_000_001), &LIMITS).is_ok());
    }

    #[test]
    fn test_rejects_path_like_names() {
        let mut req = request("image/png", 10);
        req.name = "../../etc/passwd".to_string();
        assert!(matches!(
            validate_declared_upload(&req, &LIMITS),
            Err(AppError::InvalidInput(_))
        ));
        req.name = String::new();
        assert!(matches!(
            validate_declared_upload(&req, &LIMITS),
            Err(AppError::InvalidInput(_))
        ));
    }
}
