//! Local persistence of photo records.
//!
//! The [`RecordStore`] trait is the single contract every local backend
//! implements. [`SqliteRecordStore`] is the durable variant; the
//! [`MemoryRecordStore`] keeps records in process memory and can be bounded,
//! in which case it refuses new records instead of evicting old ones.
//!
//! A tombstone remembers a deleted id until the remote confirms the delete.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params_from_iter, OptionalExtension, Row};
use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::models::{Photo, PhotoUpdate};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Record store is full ({capacity} records)")]
    CapacityExceeded { capacity: usize },
    #[error("Record store lock poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(DatabaseError::DbError(e))
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or overwrite by id.
    async fn put(&self, photo: &Photo) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Photo>, StoreError>;

    /// All records owned by `user_id`, newest first. Empty when there are none.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Photo>, StoreError>;

    /// Merge `update` into the record and advance its `updated_at`.
    /// Returns the merged record, or `None` when the id is absent.
    async fn update(&self, id: &str, update: &PhotoUpdate) -> Result<Option<Photo>, StoreError>;

    /// Remove the record. Returns false when it was already absent. With
    /// `tombstone` set, a removed id is remembered until [`clear_tombstone`].
    ///
    /// [`clear_tombstone`]: RecordStore::clear_tombstone
    async fn delete(&self, id: &str, tombstone: bool) -> Result<bool, StoreError>;

    async fn clear_tombstone(&self, id: &str) -> Result<(), StoreError>;

    /// The subset of `ids` that currently carry a tombstone.
    async fn tombstones(&self, ids: &[String]) -> Result<HashSet<String>, StoreError>;
}

pub type SharedStore = Arc<dyn RecordStore>;

/// Timestamps are stored as fixed-precision RFC 3339 so text order is time order.
pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The current time at storage precision.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Edit time for a record last touched at `previous`; always later than it.
fn touched(previous: DateTime<Utc>) -> DateTime<Utc> {
    now().max(previous + Duration::microseconds(1))
}

fn parse_timestamp(text: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn sort_newest_first(photos: &mut [Photo]) {
    photos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

pub struct SqliteRecordStore {
    db: Arc<Database>,
}

impl SqliteRecordStore {
    pub fn new(db: Arc<Database>) -> Self {
        SqliteRecordStore { db }
    }
}

const PHOTO_COLUMNS: &str = "id, user_id, image, caption, song, song_name, created_at, updated_at";

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    let created_at = parse_timestamp(&row.get::<_, String>(6)?, 6)?;
    let updated_at = match row.get::<_, Option<String>>(7)? {
        Some(text) => parse_timestamp(&text, 7)?,
        None => created_at,
    };
    Ok(Photo {
        id: row.get(0)?,
        user_id: row.get(1)?,
        image: row.get(2)?,
        caption: row.get(3)?,
        song: row.get(4)?,
        song_name: row.get(5)?,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn put(&self, photo: &Photo) -> Result<(), StoreError> {
        let conn = self.db.conn()?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO photos ({PHOTO_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            (
                &photo.id,
                &photo.user_id,
                &photo.image,
                &photo.caption,
                &photo.song,
                &photo.song_name,
                timestamp(&photo.created_at),
                timestamp(&photo.updated_at),
            ),
        )?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Photo>, StoreError> {
        let conn = self.db.conn()?;
        let photo = conn
            .query_row(
                &format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?1"),
                [id],
                photo_from_row,
            )
            .optional()?;
        Ok(photo)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Photo>, StoreError> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos
             WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
        ))?;
        let photos = stmt
            .query_map([user_id], photo_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    async fn update(&self, id: &str, update: &PhotoUpdate) -> Result<Option<Photo>, StoreError> {
        let Some(mut photo) = self.get(id).await? else {
            return Ok(None);
        };
        photo.apply(update);
        photo.updated_at = touched(photo.updated_at);

        let conn = self.db.conn()?;
        let changed = conn.execute(
            "UPDATE photos SET caption = ?1, song = ?2, song_name = ?3, updated_at = ?4
             WHERE id = ?5",
            (
                &photo.caption,
                &photo.song,
                &photo.song_name,
                timestamp(&photo.updated_at),
                id,
            ),
        )?;
        Ok((changed > 0).then_some(photo))
    }

    async fn delete(&self, id: &str, tombstone: bool) -> Result<bool, StoreError> {
        let mut conn = self.db.conn()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM photos WHERE id = ?1", [id])? > 0;
        if removed && tombstone {
            tx.execute(
                "INSERT OR REPLACE INTO deleted_photos (id, deleted_at) VALUES (?1, ?2)",
                (id, timestamp(&Utc::now())),
            )?;
        }
        tx.commit()?;
        Ok(removed)
    }

    async fn clear_tombstone(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.db.conn()?;
        conn.execute("DELETE FROM deleted_photos WHERE id = ?1", [id])?;
        Ok(())
    }

    async fn tombstones(&self, ids: &[String]) -> Result<HashSet<String>, StoreError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let conn = self.db.conn()?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT id FROM deleted_photos WHERE id IN ({placeholders})"
        ))?;
        let found = stmt
            .query_map(params_from_iter(ids.iter()), |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(found)
    }
}

#[derive(Default)]
struct MemoryInner {
    photos: HashMap<String, Photo>,
    deleted: HashSet<String>,
}

/// Process-local store owning its records. Tombstones count against the
/// capacity until they are cleared.
#[derive(Default)]
pub struct MemoryRecordStore {
    inner: Mutex<MemoryInner>,
    capacity: Option<usize>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        MemoryRecordStore {
            inner: Mutex::default(),
            capacity: Some(capacity),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, photo: &Photo) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if let Some(capacity) = self.capacity {
            let held = inner.photos.len() + inner.deleted.len();
            if !inner.photos.contains_key(&photo.id) && held >= capacity {
                tracing::warn!(capacity, id = %photo.id, "Memory store full, rejecting record");
                return Err(StoreError::CapacityExceeded { capacity });
            }
        }
        inner.photos.insert(photo.id.clone(), photo.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Photo>, StoreError> {
        Ok(self.lock()?.photos.get(id).cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Photo>, StoreError> {
        let mut photos: Vec<Photo> = self
            .lock()?
            .photos
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        sort_newest_first(&mut photos);
        Ok(photos)
    }

    async fn update(&self, id: &str, update: &PhotoUpdate) -> Result<Option<Photo>, StoreError> {
        let mut inner = self.lock()?;
        let Some(photo) = inner.photos.get_mut(id) else {
            return Ok(None);
        };
        photo.apply(update);
        photo.updated_at = touched(photo.updated_at);
        Ok(Some(photo.clone()))
    }

    async fn delete(&self, id: &str, tombstone: bool) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let removed = inner.photos.remove(id).is_some();
        if removed && tombstone {
            inner.deleted.insert(id.to_string());
        }
        Ok(removed)
    }

    async fn clear_tombstone(&self, id: &str) -> Result<(), StoreError> {
        self.lock()?.deleted.remove(id);
        Ok(())
    }

    async fn tombstones(&self, ids: &[String]) -> Result<HashSet<String>, StoreError> {
        let inner = self.lock()?;
        Ok(ids
            .iter()
            .filter(|id| inner.deleted.contains(*id))
            .cloned()
            .collect())
    }
}
