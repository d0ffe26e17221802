//! Shared key validation for storage backends.

use crate::traits::{StorageError, StorageResult};

/// Reject keys that are not a single, plain path component.
///
/// Resolved paths never trip this; it guards the backends against callers
/// that bypass access validation.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()));
    }
    if key.starts_with('.') || key.contains("..") || key.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidKey(format!(
            "key \"{}\" is not a single path component",
            key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("eyJ1IjoiYWxpY2UiLCJhIjoieCJ9").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("a\\b").is_err());
        assert!(validate_key("a..b").is_err());
    }
}
