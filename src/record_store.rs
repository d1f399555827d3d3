use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::error::StoreError;
use crate::store::ImageStore;
use crate::types::{ImageDetails, ImageRecord};
use crate::variant::Variant;

const DB_FILE: &str = "imageGalleryDB.sqlite3";
const SCHEMA_VERSION: i32 = 1;

/// Structured store: one row per record in the `images` table, keyed by `id`.
/// Snapshot replacement runs as a single transaction.
pub struct RecordStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl RecordStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;

        Self::upgrade_schema(&conn)?;

        log::info!("record store opened at {}", db_path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    // Counterpart of a versioned-database upgrade hook: version 0 means a
    // fresh database, so create the images table and stamp the version.
    fn upgrade_schema(conn: &Connection) -> Result<(), StoreError> {
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < SCHEMA_VERSION {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS images (
                    id           INTEGER PRIMARY KEY,
                    src          TEXT NOT NULL,
                    alt          TEXT NOT NULL,
                    width        INTEGER NOT NULL,
                    height       INTEGER NOT NULL,
                    aspect_ratio REAL NOT NULL,
                    timestamp    TEXT NOT NULL,
                    variant      TEXT
                );
                PRAGMA user_version = 1;",
            )?;
            log::debug!("record store schema upgraded from version {version}");
        }

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn load_all_sync(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, src, alt, width, height, aspect_ratio, timestamp, variant
             FROM images ORDER BY id DESC",
        )?;

        // Raw rows first; timestamp/variant parsing is not a SQL concern.
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, src, alt, width, height, aspect_ratio, timestamp, variant) = row?;

            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| StoreError::Corrupt(format!("record {id}: bad timestamp: {e}")))?
                .with_timezone(&Utc);
            let variant = variant
                .map(|s| {
                    s.parse::<Variant>()
                        .map_err(|e| StoreError::Corrupt(format!("record {id}: {e}")))
                })
                .transpose()?;

            records.push(ImageRecord {
                id,
                src,
                alt,
                details: ImageDetails {
                    width: width as u32,
                    height: height as u32,
                    aspect_ratio,
                    timestamp,
                    variant,
                },
            });
        }

        Ok(records)
    }

    fn replace_all_sync(&self, records: &[ImageRecord]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM images", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO images (id, src, alt, width, height, aspect_ratio, timestamp, variant)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.id,
                    record.src,
                    record.alt,
                    record.details.width as i64,
                    record.details.height as i64,
                    record.details.aspect_ratio,
                    record.details.timestamp.to_rfc3339(),
                    record.details.variant.map(Variant::as_str),
                ])?;
            }
        }
        tx.commit()?;

        log::debug!("record store replaced snapshot with {} record(s)", records.len());
        Ok(())
    }

    fn clear_sync(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM images", [])?;
        Ok(())
    }
}

#[async_trait]
impl ImageStore for RecordStore {
    fn name(&self) -> &str {
        "record store"
    }

    async fn load_all(&self) -> Result<Vec<ImageRecord>, StoreError> {
        self.load_all_sync()
    }

    async fn replace_all(&self, records: &[ImageRecord]) -> Result<(), StoreError> {
        self.replace_all_sync(records)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.clear_sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, width: u32, height: u32, variant: Variant) -> ImageRecord {
        ImageRecord::new(
            id,
            format!("https://example.com/{id}.png"),
            "Gallery Image".into(),
            width,
            height,
            variant,
        )
    }

    #[tokio::test]
    async fn snapshot_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        let records = vec![
            record(2, 3000, 1000, Variant::Panorama),
            record(1, 800, 800, Variant::Small),
        ];
        store.replace_all(&records).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded, records);
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = RecordStore::open(dir.path()).unwrap();
            store.replace_all(&[record(5, 100, 200, Variant::Tall)]).await.unwrap();
        }

        let store = RecordStore::open(dir.path()).unwrap();
        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 5);
        assert_eq!(loaded[0].details.variant, Some(Variant::Tall));
    }

    #[tokio::test]
    async fn replace_discards_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        store
            .replace_all(&[record(1, 100, 100, Variant::Small), record(2, 100, 100, Variant::Small)])
            .await
            .unwrap();
        store.replace_all(&[record(3, 100, 100, Variant::Large)]).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 3);
    }

    #[tokio::test]
    async fn rows_come_back_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        // Stored order does not matter; id order does.
        store
            .replace_all(&[record(10, 100, 100, Variant::Small), record(30, 100, 100, Variant::Small), record(20, 100, 100, Variant::Small)])
            .await
            .unwrap();

        let ids: Vec<i64> = store.load_all().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![30, 20, 10]);
    }

    #[tokio::test]
    async fn legacy_row_without_variant_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO images (id, src, alt, width, height, aspect_ratio, timestamp, variant)
                 VALUES (1, 'https://example.com/old.jpg', 'old', 640, 480, 1.3333, '2023-06-01T12:00:00+00:00', NULL)",
                [],
            )
            .unwrap();
        }

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded[0].details.variant, None);
        assert_eq!(loaded[0].details.width, 640);
    }

    #[tokio::test]
    async fn schema_version_is_stamped() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        let version: i32 = store
            .conn
            .lock()
            .unwrap()
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
