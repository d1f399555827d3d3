use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::ImageRecord;

/// One durable backing store for the gallery snapshot.
///
/// Stores only ever exchange whole snapshots: a load returns every record,
/// a save replaces every record. They never mutate individual records.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Read the full snapshot. An empty store yields an empty vector.
    async fn load_all(&self) -> Result<Vec<ImageRecord>, StoreError>;

    /// Atomically replace the stored snapshot with `records`.
    async fn replace_all(&self, records: &[ImageRecord]) -> Result<(), StoreError>;

    /// Drop all stored records.
    async fn clear(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: ImageStore + ?Sized> ImageStore for std::sync::Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn load_all(&self) -> Result<Vec<ImageRecord>, StoreError> {
        (**self).load_all().await
    }

    async fn replace_all(&self, records: &[ImageRecord]) -> Result<(), StoreError> {
        (**self).replace_all(records).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        (**self).clear().await
    }
}

/// In-memory store, used as a substitutable fake in tests.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ImageRecord>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation reports `StoreError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store failure injected".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ImageStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_all(&self) -> Result<Vec<ImageRecord>, StoreError> {
        self.check_available()?;
        Ok(self.records.lock().unwrap().clone())
    }

    async fn replace_all(&self, records: &[ImageRecord]) -> Result<(), StoreError> {
        self.check_available()?;
        *self.records.lock().unwrap() = records.to_vec();
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.check_available()?;
        self.records.lock().unwrap().clear();
        Ok(())
    }
}
