//! Shared key handling for storage backends.
//!
//! Key format: `{folder}/{file_name}`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the storage key of `file_name` inside `folder`.
pub fn object_key(folder: &str, file_name: &str) -> String {
    format!("{}/{}", folder.trim_end_matches('/'), file_name)
}

/// Last segment of a key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Whether a key stays within the store: no `..` segment, no leading `/`, no
/// backslash.
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && !key.split('/').any(|segment| segment == ".." || segment.is_empty())
}

/// Percent-encode each segment of a key for use in a URL path.
pub fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        assert_eq!(object_key("swl", "a.pdf"), "swl/a.pdf");
        assert_eq!(object_key("swl/", "a.pdf"), "swl/a.pdf");
        assert_eq!(file_name("swl/a.pdf"), "a.pdf");
        assert_eq!(file_name("a.pdf"), "a.pdf");
    }

    #[test]
    fn test_is_safe_key() {
        assert!(is_safe_key("img/photo 1.jpg"));
        assert!(!is_safe_key("../etc/passwd"));
        assert!(!is_safe_key("img/../../x"));
        assert!(!is_safe_key("/etc/passwd"));
        assert!(!is_safe_key("img\\x"));
        assert!(!is_safe_key("img//x"));
    }

    #[test]
    fn test_encode_key_path() {
        assert_eq!(encode_key_path("img/photo 1.jpg"), "img/photo%201.jpg");
        assert_eq!(encode_key_path("swl/a#b?.pdf"), "swl/a%23b%3F.pdf");
    }
}
