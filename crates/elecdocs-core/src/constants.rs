//! Application-wide constants.

/// Largest file accepted by the upload workflow (15 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 15 * 1024 * 1024;

/// Content type reported for objects stored without one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// The only content type accepted in document (non-photo) categories.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Prefix every content type in the photo category must carry.
pub const IMAGE_CONTENT_TYPE_PREFIX: &str = "image/";

/// Default lifetime of signed retrieval URLs.
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;

/// Default lifetime of an unconfirmed delete request.
pub const DEFAULT_DELETE_REQUEST_TTL_SECS: u64 = 300;

/// Versioned API prefix.
pub const API_PREFIX: &str = "/api/v0";
