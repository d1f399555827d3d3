use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::ImageStore;
use crate::types::ImageRecord;

const BLOB_FILE: &str = "galleryImages.json";

/// Flat store: the whole snapshot serialized as one JSON array in a single
/// file. No per-record access; every write replaces the file.
pub struct BlobStore {
    path: PathBuf,
}

impl BlobStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(BLOB_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ImageStore for BlobStore {
    fn name(&self) -> &str {
        "blob store"
    }

    async fn load_all(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            // No file yet is just an empty store, not a failure.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let records = serde_json::from_slice(&bytes)?;
        Ok(records)
    }

    async fn replace_all(&self, records: &[ImageRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_vec(records)?;
        tokio::fs::write(&self.path, json).await?;
        log::debug!(
            "blob store wrote {} record(s) to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
