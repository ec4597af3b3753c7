use async_trait::async_trait;

use crate::error::StorageError;

/// Blob storage for uploaded images, addressed by the name it assigns.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `data` under a fresh unique name ending in `extension` and
    /// return that name.
    async fn store(&self, data: &[u8], extension: &str) -> Result<String, StorageError>;

    /// Load a stored file.
    async fn load(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete a stored file. Deleting a missing file succeeds.
    async fn delete(&self, name: &str) -> Result<(), StorageError>;
}
