//! Layout storage transport: opaque JSON documents keyed by network id.
//!
//! DESIGN
//! ======
//! The store never looks inside a document; serialization belongs to
//! `persist`. `MemoryLayoutStore` backs tests and embedded use,
//! `FileLayoutStore` writes one `<network-id>.json` per network for the CLI.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use uuid::Uuid;

/// Identifier of a scanned network. Assigned by the network registry.
pub type NetworkId = Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

impl crate::error::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "E_STORAGE_IO",
        }
    }
}

/// Get/put of saved-layout documents.
#[async_trait::async_trait]
pub trait LayoutStore: Send + Sync {
    /// Fetch the stored document, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be read.
    async fn get(&self, network_id: NetworkId) -> Result<Option<String>, StoreError>;

    /// Replace the stored document.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be written.
    async fn put(&self, network_id: NetworkId, document: String) -> Result<(), StoreError>;
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Default)]
pub struct MemoryLayoutStore {
    documents: RwLock<HashMap<NetworkId, String>>,
}

impl MemoryLayoutStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl LayoutStore for MemoryLayoutStore {
    async fn get(&self, network_id: NetworkId) -> Result<Option<String>, StoreError> {
        Ok(self.documents.read().await.get(&network_id).cloned())
    }

    async fn put(&self, network_id: NetworkId, document: String) -> Result<(), StoreError> {
        self.documents.write().await.insert(network_id, document);
        Ok(())
    }
}

// =============================================================================
// FILES
// =============================================================================

pub struct FileLayoutStore {
    dir: PathBuf,
}

impl FileLayoutStore {
    /// Store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf() }
    }

    fn path_for(&self, network_id: NetworkId) -> PathBuf {
        self.dir.join(format!("{network_id}.json"))
    }
}

#[async_trait::async_trait]
impl LayoutStore for FileLayoutStore {
    async fn get(&self, network_id: NetworkId) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(network_id)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, network_id: NetworkId, document: String) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(network_id), document).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
