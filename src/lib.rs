pub mod blob_store;
pub mod error;
pub mod gallery;
pub mod gateway;
pub mod record_store;
pub mod store;
pub mod types;
pub mod variant;

pub use blob_store::BlobStore;
pub use error::{GalleryError, StoreError};
pub use gallery::{AddedImage, Gallery};
pub use gateway::PersistenceGateway;
pub use record_store::RecordStore;
pub use store::{ImageStore, MemoryStore};
pub use types::{ImageDetails, ImageRecord};
pub use variant::{assign_variant, random_variant, Variant, ALL_VARIANTS};
