use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use image::{GenericImageView, ImageFormat};
use sha2::{Digest, Sha256};

use crate::blob_store::BlobStore;
use crate::error::GalleryError;
use crate::gateway::PersistenceGateway;
use crate::record_store::RecordStore;
use crate::store::ImageStore;
use crate::types::ImageRecord;
use crate::variant::{assign_variant, random_variant};

const DEFAULT_ALT: &str = "Gallery Image";

/// Outcome of an add operation.
///
/// `duplicate` means the payload was already in the gallery and the existing
/// record is returned untouched. `persisted` reports the aggregate dual-write
/// outcome; a `false` here is the one-line notice the UI shows the user, the
/// record itself stays in the in-memory list either way.
#[derive(Debug, Clone)]
pub struct AddedImage {
    pub record: ImageRecord,
    pub duplicate: bool,
    pub persisted: bool,
}

/// In-memory gallery, newest record first. Owns the record list exclusively;
/// every mutation triggers one full dual-write of the current snapshot.
pub struct Gallery {
    gateway: PersistenceGateway,
    records: Vec<ImageRecord>,
    last_id: i64,
}

impl Gallery {
    /// Open the gallery backed by both stores under `dir`.
    ///
    /// A store that cannot be opened is skipped with a warning rather than
    /// failing the whole gallery; with every store unavailable the gallery
    /// still works, it just cannot persist.
    pub async fn open(dir: &Path) -> Self {
        let mut stores: Vec<Box<dyn ImageStore>> = Vec::new();

        match RecordStore::open(dir) {
            Ok(store) => stores.push(Box::new(store)),
            Err(e) => log::warn!("record store unavailable: {e}"),
        }
        match BlobStore::open(dir) {
            Ok(store) => stores.push(Box::new(store)),
            Err(e) => log::warn!("blob store unavailable: {e}"),
        }

        Self::from_gateway(PersistenceGateway::from_stores(stores)).await
    }

    pub async fn open_default() -> Self {
        Self::open(&Self::default_dir()).await
    }

    fn default_dir() -> PathBuf {
        let mut dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        dir.push("image-gallery");
        dir
    }

    /// Load the persisted snapshot through `gateway` and backfill layout
    /// variants on records that predate the variant field. A backfilled
    /// snapshot is re-stored immediately so the migration happens once.
    pub async fn from_gateway(gateway: PersistenceGateway) -> Self {
        let mut records = gateway.load().await;

        let mut backfilled = 0usize;
        for record in &mut records {
            if record.details.variant.is_none() {
                record.details.variant = Some(random_variant());
                backfilled += 1;
            }
        }
        if backfilled > 0 {
            log::info!("backfilled layout variants on {backfilled} legacy record(s)");
            gateway.save(&records).await;
        }

        let last_id = records.iter().map(|r| r.id).max().unwrap_or(0);

        Self {
            gateway,
            records,
            last_id,
        }
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn get(&self, id: i64) -> Option<&ImageRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add an image whose pixel dimensions are already known (the URL path:
    /// the caller preloaded the image and measured it).
    pub async fn add_image(&mut self, src: String, alt: String, width: u32, height: u32) -> AddedImage {
        let variant = assign_variant(width, height);
        let id = self.next_id();

        log::debug!("adding image {id} ({width}x{height}, {variant})");

        let record = ImageRecord::new(id, src, alt, width, height, variant);

        self.records.insert(0, record.clone());
        let persisted = self.gateway.save(&self.records).await;

        AddedImage {
            record,
            duplicate: false,
            persisted,
        }
    }

    /// Add an uploaded image from raw bytes: sniff the format, measure the
    /// pixel dimensions, and embed the payload as a base64 data URL.
    ///
    /// An undecodable payload is an image error, reported separately from
    /// storage degradation.
    pub async fn add_from_bytes(&mut self, alt: &str, data: &[u8]) -> anyhow::Result<AddedImage> {
        let decoded = image::load_from_memory(data).map_err(|e| {
            log::error!("failed to decode uploaded image: {e}");
            GalleryError::Image(e)
        })?;

        let (width, height) = decoded.dimensions();
        let src = format!("data:{};base64,{}", sniff_mime(data), BASE64.encode(data));

        // Same payload uploaded twice comes back as the existing record.
        let digest = src_digest(&src);
        if let Some(existing) = self.records.iter().find(|r| src_digest(&r.src) == digest) {
            log::info!("upload is a duplicate of record {}", existing.id);
            return Ok(AddedImage {
                record: existing.clone(),
                duplicate: true,
                persisted: true,
            });
        }

        let alt = if alt.is_empty() { DEFAULT_ALT } else { alt };
        Ok(self.add_image(src, alt.to_string(), width, height).await)
    }

    pub async fn add_from_file(&mut self, path: &Path) -> anyhow::Result<AddedImage> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            log::error!("failed to read {}: {e}", path.display());
            GalleryError::Io(e)
        })?;

        let alt = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_ALT)
            .to_string();

        self.add_from_bytes(&alt, &data).await
    }

    /// Remove a record by id. `None` when the id is not in the gallery,
    /// otherwise whether the shrunk snapshot was persisted.
    pub async fn delete_image(&mut self, id: i64) -> Option<bool> {
        let pos = self.records.iter().position(|r| r.id == id)?;
        self.records.remove(pos);

        log::debug!("deleted image {id}, {} record(s) remain", self.records.len());
        Some(self.gateway.save(&self.records).await)
    }

    pub async fn clear_all(&mut self) -> bool {
        self.records.clear();
        self.gateway.save(&self.records).await
    }

    // Creation-time ids, forced strictly increasing so two adds within the
    // same millisecond cannot collide.
    fn next_id(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }
}

fn sniff_mime(data: &[u8]) -> &'static str {
    match image::guess_format(data).unwrap_or(ImageFormat::Png) {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        _ => "image/png",
    }
}

fn src_digest(src: &str) -> String {
    hex::encode(Sha256::digest(src.as_bytes()))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use chrono::TimeZone;

    use crate::store::MemoryStore;
    use crate::types::ImageDetails;
    use crate::variant::Variant;

    use super::*;

    fn shared_gateway() -> (Arc<MemoryStore>, Arc<MemoryStore>, PersistenceGateway) {
        let primary = Arc::new(MemoryStore::new());
        let backup = Arc::new(MemoryStore::new());
        let gateway =
            PersistenceGateway::new(Box::new(primary.clone()), Box::new(backup.clone()));
        (primary, backup, gateway)
    }

    async fn empty_gallery() -> (Arc<MemoryStore>, Arc<MemoryStore>, Gallery) {
        let (primary, backup, gateway) = shared_gateway();
        let gallery = Gallery::from_gateway(gateway).await;
        (primary, backup, gallery)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::new(width, height);
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn new_records_are_prepended_with_increasing_ids() {
        let (_, _, mut gallery) = empty_gallery().await;

        let first = gallery.add_image("https://example.com/a.png".into(), "a".into(), 3000, 1000).await;
        let second = gallery.add_image("https://example.com/b.png".into(), "b".into(), 800, 800).await;

        assert!(second.record.id > first.record.id);
        let ids: Vec<i64> = gallery.images().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.record.id, first.record.id]);
    }

    #[tokio::test]
    async fn add_assigns_variant_from_dimensions() {
        let (_, _, mut gallery) = empty_gallery().await;

        let added = gallery.add_image("https://example.com/p.png".into(), "p".into(), 3000, 1000).await;
        assert_eq!(added.record.details.variant, Some(Variant::Panorama));
        assert_eq!(added.record.details.aspect_ratio, 3.0);

        let added = gallery.add_image("https://example.com/s.png".into(), "s".into(), 800, 800).await;
        let v = added.record.details.variant.unwrap();
        assert!(v == Variant::Small || v == Variant::Large);
    }

    #[tokio::test]
    async fn every_change_is_dual_written() {
        let (primary, backup, mut gallery) = empty_gallery().await;

        let added = gallery.add_image("https://example.com/a.png".into(), "a".into(), 100, 100).await;
        assert!(added.persisted);
        assert_eq!(primary.load_all().await.unwrap().len(), 1);
        assert_eq!(backup.load_all().await.unwrap().len(), 1);

        assert_eq!(gallery.delete_image(added.record.id).await, Some(true));
        assert!(primary.load_all().await.unwrap().is_empty());
        assert!(backup.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_id_is_a_no_op() {
        let (_, _, mut gallery) = empty_gallery().await;
        gallery.add_image("https://example.com/a.png".into(), "a".into(), 100, 100).await;

        assert_eq!(gallery.delete_image(12345).await, None);
        assert_eq!(gallery.len(), 1);
    }

    #[tokio::test]
    async fn failed_saves_leave_the_list_mutated_but_report_it() {
        let (primary, backup, mut gallery) = empty_gallery().await;
        primary.set_failing(true);
        backup.set_failing(true);

        let added = gallery.add_image("https://example.com/a.png".into(), "a".into(), 100, 100).await;
        assert!(!added.persisted);
        assert_eq!(gallery.len(), 1);
    }

    #[tokio::test]
    async fn legacy_records_get_a_variant_without_other_changes() {
        let (primary, _, gateway) = shared_gateway();

        let timestamp = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        let legacy = ImageRecord {
            id: 1,
            src: "https://example.com/old.jpg".into(),
            alt: "old".into(),
            details: ImageDetails {
                width: 640,
                height: 480,
                aspect_ratio: 640.0 / 480.0,
                timestamp,
                variant: None,
            },
        };
        primary.replace_all(&[legacy]).await.unwrap();

        let gallery = Gallery::from_gateway(gateway).await;
        let record = &gallery.images()[0];
        assert!(record.details.variant.is_some());
        assert_eq!(record.details.width, 640);
        assert_eq!(record.details.height, 480);
        assert_eq!(record.details.timestamp, timestamp);

        // The migrated snapshot was re-stored.
        let stored = primary.load_all().await.unwrap();
        assert!(stored[0].details.variant.is_some());
    }

    #[tokio::test]
    async fn upload_builds_a_data_url_and_measures_dimensions() {
        let (_, _, mut gallery) = empty_gallery().await;

        let added = gallery.add_from_bytes("shot.png", &png_bytes(4, 2)).await.unwrap();
        assert!(!added.duplicate);
        assert!(added.record.src.starts_with("data:image/png;base64,"));
        assert_eq!(added.record.details.width, 4);
        assert_eq!(added.record.details.height, 2);
        assert_eq!(added.record.details.variant, Some(Variant::Landscape));
    }

    #[tokio::test]
    async fn duplicate_upload_returns_the_existing_record() {
        let (_, _, mut gallery) = empty_gallery().await;
        let bytes = png_bytes(4, 2);

        let first = gallery.add_from_bytes("a.png", &bytes).await.unwrap();
        let second = gallery.add_from_bytes("b.png", &bytes).await.unwrap();

        assert!(second.duplicate);
        assert_eq!(second.record.id, first.record.id);
        assert_eq!(gallery.len(), 1);
    }

    #[tokio::test]
    async fn undecodable_upload_is_an_image_error() {
        let (_, _, mut gallery) = empty_gallery().await;

        let err = gallery.add_from_bytes("junk", b"definitely not an image").await.unwrap_err();
        assert!(err.downcast_ref::<GalleryError>().is_some());
        assert!(gallery.is_empty());
    }

    #[tokio::test]
    async fn clear_all_persists_the_empty_snapshot() {
        let (primary, _, mut gallery) = empty_gallery().await;
        gallery.add_image("https://example.com/a.png".into(), "a".into(), 100, 100).await;

        assert!(gallery.clear_all().await);
        assert!(gallery.is_empty());
        assert!(primary.load_all().await.unwrap().is_empty());
    }
}
