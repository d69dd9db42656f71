//! Application-wide constants.

/// Versioned prefix for every HTTP route.
pub const API_PREFIX: &str = "/api/v0";

/// Validity of a signed PUT URL handed out by the upload initiator (15 minutes).
pub const UPLOAD_URL_TTL_SECS: u64 = 15 * 60;

/// Default validity of a signed GET URL.
pub const READ_URL_TTL_SECS: u64 = 60 * 60;

/// Suffix appended to a video's object path for its poster image.
pub const THUMBNAIL_SUFFIX: &str = "-thumbnail";

/// Content type the client must use when uploading a video poster.
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

/// Request header carrying a share or person token.
pub const SHARE_TOKEN_HEADER: &str = "x-share-token";

/// Request header carrying the PIN key that unlocks a PIN-protected token.
pub const SHARE_KEY_HEADER: &str = "x-share-key";
