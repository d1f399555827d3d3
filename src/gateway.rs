use crate::store::ImageStore;
use crate::types::ImageRecord;

/// Owns the ordered chain of backing stores and folds their individual
/// outcomes into one aggregate result. Failures never escape this boundary:
/// `load` degrades to an empty snapshot, `save` to a `false` success flag.
pub struct PersistenceGateway {
    stores: Vec<Box<dyn ImageStore>>,
}

impl PersistenceGateway {
    /// Chain with the structured store first and the flat store as backup.
    pub fn new(primary: Box<dyn ImageStore>, backup: Box<dyn ImageStore>) -> Self {
        Self::from_stores(vec![primary, backup])
    }

    pub fn from_stores(stores: Vec<Box<dyn ImageStore>>) -> Self {
        Self { stores }
    }

    /// Read the snapshot from the first store that yields one.
    ///
    /// A store that fails or holds nothing falls through to the next
    /// strategy in the chain; if every store fails or is empty, the result
    /// is the empty snapshot.
    pub async fn load(&self) -> Vec<ImageRecord> {
        for store in &self.stores {
            match store.load_all().await {
                Ok(records) if !records.is_empty() => {
                    log::info!("loaded {} record(s) from {}", records.len(), store.name());
                    return records;
                }
                Ok(_) => {
                    log::debug!("{} is empty, trying next store", store.name());
                }
                Err(e) => {
                    log::warn!("failed to load from {}: {}", store.name(), e);
                }
            }
        }

        log::info!("no store produced a snapshot, starting empty");
        Vec::new()
    }

    /// Write the snapshot to every store in the chain.
    ///
    /// All stores are attempted regardless of earlier outcomes; the flat
    /// store is a redundant backup, not just a fallback. Returns `true` if
    /// at least one write succeeded.
    pub async fn save(&self, records: &[ImageRecord]) -> bool {
        let mut any_ok = false;

        for store in &self.stores {
            match store.replace_all(records).await {
                Ok(()) => {
                    any_ok = true;
                }
                Err(e) => {
                    log::warn!("failed to save to {}: {}", store.name(), e);
                }
            }
        }

        if !any_ok {
            log::error!("all {} store(s) failed to save the snapshot", self.stores.len());
        }
        any_ok
    }
}
