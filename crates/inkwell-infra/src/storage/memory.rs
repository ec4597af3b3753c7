//! In-memory image storage - used by tests and the minimal setup.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use inkwell_core::error::StorageError;
use inkwell_core::ports::FileStorage;

use super::{unique_name, validate_name};

/// Note: Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryFileStorage {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all stored files, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.files.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn store(&self, data: &[u8], extension: &str) -> Result<String, StorageError> {
        let name = unique_name(extension);
        self.files.write().await.insert(name.clone(), data.to_vec());
        Ok(name)
    }

    async fn load(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        validate_name(name)?;
        self.files
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        validate_name(name)?;
        self.files.write().await.remove(name);
        Ok(())
    }
}
