// ABOUTME: Attachment token storage over a local directory
// ABOUTME: Tickets and reports persist opaque tokens, never file bytes

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::{StorageError, StorageResult};

/// Opaque-token attachment storage. The workflow only ever sees tokens;
/// where the bytes live is this boundary's concern.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Store file bytes and return the opaque path token.
    async fn store(&self, bytes: &[u8], original_name: &str) -> StorageResult<String>;

    /// Retrieve the bytes behind a previously issued token.
    async fn retrieve(&self, token: &str) -> StorageResult<Vec<u8>>;
}

/// Filesystem-backed attachment store rooted at a single directory.
pub struct LocalAttachmentStore {
    root: PathBuf,
}

impl LocalAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Tokens are single path components; anything else is rejected before
    /// touching the filesystem.
    fn validate_token(token: &str) -> StorageResult<()> {
        let valid = !token.is_empty()
            && !token.contains(['/', '\\'])
            && token != "."
            && token != "..";
        if valid {
            Ok(())
        } else {
            Err(StorageError::InvalidAttachmentToken(token.to_string()))
        }
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn store(&self, bytes: &[u8], original_name: &str) -> StorageResult<String> {
        fs::create_dir_all(&self.root).await.map_err(StorageError::Io)?;

        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let token = format!("{}{}", nanoid::nanoid!(), extension);

        let path = self.root.join(&token);
        fs::write(&path, bytes).await.map_err(StorageError::Io)?;

        debug!("Stored attachment {} ({} bytes)", token, bytes.len());
        Ok(token)
    }

    async fn retrieve(&self, token: &str) -> StorageResult<Vec<u8>> {
        Self::validate_token(token)?;
        fs::read(self.root.join(token)).await.map_err(StorageError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalAttachmentStore::new(dir.path());

        let token = store.store(b"facture scan", "facture.pdf").await.unwrap();
        assert!(token.ends_with(".pdf"));

        let bytes = store.retrieve(&token).await.unwrap();
        assert_eq!(bytes, b"facture scan");
    }

    #[tokio::test]
    async fn test_retrieve_rejects_traversal_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalAttachmentStore::new(dir.path());

        for bad in ["../etc/passwd", "a/b", "", ".."] {
            let err = store.retrieve(bad).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidAttachmentToken(_)));
        }
    }
}
