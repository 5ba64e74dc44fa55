use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::security;

pub const MEMORY_PATH: &str = ":memory:";

/// Current schema version, tracked in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 2;

const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS photos (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    image TEXT NOT NULL,
    caption TEXT NOT NULL DEFAULT '',
    song TEXT,
    song_name TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_photos_user_created ON photos(user_id, created_at);

CREATE TABLE IF NOT EXISTS deleted_photos (
    id TEXT PRIMARY KEY,
    deleted_at TEXT NOT NULL
);
"#;

/// Photos remember their last local edit for reconciliation with the remote.
const SCHEMA_V2: &str = r#"
ALTER TABLE photos ADD COLUMN updated_at TEXT;
UPDATE photos SET updated_at = created_at WHERE updated_at IS NULL;
"#;

/// Users present on every start. A `None` password marks a special user.
pub const SEED_USERS: &[(&str, Option<&str>)] =
    &[("shruti", None), ("gauransh", Some("gauransh@123"))];

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("Database error: {0}")]
    DbError(#[from] rusqlite::Error),
    #[error("Security error: {0}")]
    SecurityError(#[from] security::SecurityError),
    #[error("Database lock poisoned")]
    Poisoned,
    #[error("Database schema version {found} is newer than supported version {expected}")]
    UnsupportedSchemaVersion { found: i32, expected: i32 },
}

/// Single SQLite connection shared by the record store and the user directory.
pub struct Database {
    pub path: PathBuf,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open (creating if needed) the database at `path`; `:memory:` keeps
    /// everything in process memory.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = if path == Path::new(MEMORY_PATH) {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|source| DatabaseError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        if path != Path::new(MEMORY_PATH) {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
        }
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrate(&conn)?;

        tracing::info!(path = %path.display(), "Database ready");

        Ok(Database {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::open(Path::new(MEMORY_PATH))
    }

    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    /// Insert the seed users unless a user with the same name already exists.
    pub fn seed_users(&self, rounds: u32) -> Result<usize, DatabaseError> {
        let conn = self.conn()?;
        let mut inserted = 0;
        for (username, password) in SEED_USERS {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                [username],
                |row| row.get(0),
            )?;
            if exists {
                continue;
            }
            let hash = password
                .map(|p| security::hash_password(p, rounds))
                .transpose()?;
            inserted += conn.execute(
                "INSERT OR IGNORE INTO users (id, username, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (
                    uuid::Uuid::new_v4().to_string(),
                    username,
                    hash,
                    chrono::Utc::now().to_rfc3339(),
                ),
            )?;
        }
        if inserted > 0 {
            tracing::info!(count = inserted, "Seeded default users");
        }
        Ok(inserted)
    }
}

fn migrate(conn: &Connection) -> Result<(), DatabaseError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        return Err(DatabaseError::UnsupportedSchemaVersion {
            found: version,
            expected: SCHEMA_VERSION,
        });
    }

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
        tracing::debug!(version = 1, "Initialized database schema");
    }
    if version < 2 {
        conn.execute_batch(SCHEMA_V2)?;
        conn.pragma_update(None, "user_version", 2)?;
        tracing::debug!(version = 2, "Migrated database schema");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_users(db: &Database) -> i64 {
        db.conn()
            .unwrap()
            .query_row("SELECT count(*) FROM users", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn seeding_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.seed_users(1_000).unwrap(), 2);
        assert_eq!(db.seed_users(1_000).unwrap(), 0);
        assert_eq!(count_users(&db), 2);
    }

    #[test]
    fn special_user_has_no_password_hash() {
        let db = Database::open_in_memory().unwrap();
        db.seed_users(1_000).unwrap();
        let hash: Option<String> = db
            .conn()
            .unwrap()
            .query_row(
                "SELECT password_hash FROM users WHERE username = 'shruti'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(hash.is_none());
    }

    #[test]
    fn reopening_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.db");
        {
            let db = Database::open(&path).unwrap();
            db.seed_users(1_000).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(count_users(&db), 2);
        assert_eq!(db.seed_users(1_000).unwrap(), 0);
    }

    #[test]
    fn version_one_photos_gain_updated_at() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v1.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(SCHEMA_V1).unwrap();
            conn.pragma_update(None, "user_version", 1).unwrap();
            conn.execute(
                "INSERT INTO photos (id, user_id, image, created_at)
                 VALUES ('p1', 'u1', 'img', '2024-05-01T10:00:00.000000Z')",
                [],
            )
            .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let conn = db.conn().unwrap();
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
        let updated_at: String = conn
            .query_row("SELECT updated_at FROM photos WHERE id = 'p1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(updated_at, "2024-05-01T10:00:00.000000Z");
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
                .unwrap();
        }
        let err = Database::open(&path).unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::UnsupportedSchemaVersion { .. }
        ));
    }
}
