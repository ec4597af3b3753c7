//! Image storage implementations.

mod local;
mod memory;

use uuid::Uuid;

use inkwell_core::error::StorageError;

pub use local::LocalFileStorage;
pub use memory::InMemoryFileStorage;

/// A fresh `<uuid>.<ext>` name. Extensions that are not plain alphanumeric
/// are dropped.
pub(crate) fn unique_name(extension: &str) -> String {
    let extension = Some(extension)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
        None => Uuid::new_v4().to_string(),
    }
}

/// Stored names are flat: no separators, no leading dot.
pub(crate) fn validate_name(name: &str) -> Result<(), StorageError> {
    let valid = !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_name_lowercases_extension() {
        let name = unique_name("PNG");
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 36 + 4);
        assert_ne!(name, unique_name("PNG"));
    }

    #[test]
    fn test_unusable_extension_is_dropped() {
        assert!(Uuid::parse_str(&unique_name("")).is_ok());
        assert!(Uuid::parse_str(&unique_name("p/g")).is_ok());
        assert!(Uuid::parse_str(&unique_name("tar.gz")).is_ok());
    }

    #[test]
    fn test_validate_name_rejects_traversal() {
        assert!(validate_name("3f1c.png").is_ok());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("a/b.png").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name("").is_err());
    }
}
