use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use inkwell_core::error::StorageError;
use inkwell_core::ports::FileStorage;

use super::{unique_name, validate_name};

/// Images stored as flat files under one upload directory.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    /// Use `root` as the upload directory, creating it if needed.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::Io(format!("{}: {e}", root.display())))?;
        tracing::info!(upload_dir = %root.display(), "File storage ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, data: &[u8], extension: &str) -> Result<String, StorageError> {
        let name = unique_name(extension);
        let path = self.path_for(&name)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(name)
    }

    async fn load(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(name)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(name.to_string()),
            _ => StorageError::Io(e.to_string()),
        })
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("uploads")).await.unwrap();

        let name = storage.store(b"png-bytes", "png").await.unwrap();
        assert!(storage.root().join(&name).exists());
        assert_eq!(storage.load(&name).await.unwrap(), b"png-bytes");

        storage.delete(&name).await.unwrap();
        assert!(matches!(
            storage.load(&name).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path()).await.unwrap();

        assert!(storage.delete("missing.png").await.is_ok());
    }

    #[tokio::test]
    async fn test_load_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path()).await.unwrap();

        assert!(matches!(
            storage.load("../secret").await,
            Err(StorageError::InvalidName(_))
        ));
    }
}
