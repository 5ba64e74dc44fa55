use std::sync::Arc;

use rusqlite::OptionalExtension;
use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::models::{Identity, User};
use crate::security::{self, SecurityError};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User not found")]
    UnknownUser,
    #[error("Wrong password")]
    WrongPassword,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("{0}")]
    ValidationFailed(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Security error: {0}")]
    Security(#[from] SecurityError),
}

impl From<rusqlite::Error> for AuthError {
    fn from(e: rusqlite::Error) -> Self {
        AuthError::Database(DatabaseError::DbError(e))
    }
}

/// Checks credentials against the `users` table.
pub struct Authenticator {
    db: Arc<Database>,
    rounds: u32,
}

impl Authenticator {
    pub fn new(db: Arc<Database>, rounds: u32) -> Self {
        Authenticator { db, rounds }
    }

    fn find(&self, username: &str) -> Result<Option<User>, AuthError> {
        let conn = self.db.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
                [username],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password_hash: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// A user without a stored password is a special user and is let in
    /// whatever password is supplied.
    pub fn login(&self, username: &str, password: Option<&str>) -> Result<Identity, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::ValidationFailed("Username is required".into()));
        }

        let Some(user) = self.find(username)? else {
            tracing::info!(username, "Login for unknown user");
            return Err(AuthError::UnknownUser);
        };

        if let Some(hash) = &user.password_hash {
            if !security::verify_password(password.unwrap_or_default(), hash)? {
                tracing::info!(username, "Login with wrong password");
                return Err(AuthError::WrongPassword);
            }
        }

        tracing::info!(username, user_id = %user.id, "Login succeeded");
        Ok(Identity {
            user_id: user.id,
            username: user.username,
            is_special_user: user.password_hash.is_none(),
        })
    }

    pub fn signup(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::ValidationFailed("Username is required".into()));
        }
        if password.is_empty() {
            return Err(AuthError::ValidationFailed("Password is required".into()));
        }

        let hash = security::hash_password(password, self.rounds)?;
        let id = uuid::Uuid::new_v4().to_string();

        let conn = self.db.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (id, username, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            (&id, username, &hash, chrono::Utc::now().to_rfc3339()),
        )?;
        if inserted == 0 {
            return Err(AuthError::UsernameTaken);
        }

        tracing::info!(username, user_id = %id, "User signed up");
        Ok(Identity {
            user_id: id,
            username: username.to_string(),
            is_special_user: false,
        })
    }
}
