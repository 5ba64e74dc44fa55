//! Best-effort mirror of the record store to a remote REST backend.
//!
//! [`PostgrestClient`] talks the Supabase/PostgREST dialect: rows are
//! filtered with `column=eq.value` query parameters and authenticated with
//! both an `apikey` header and a bearer token carrying the same key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{Photo, PhotoUpdate};
use crate::store::timestamp;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote backend answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Invalid remote configuration: {0}")]
    Config(String),
}

#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn save(&self, photo: &Photo) -> Result<(), RemoteError>;

    async fn fetch(&self, user_id: &str) -> Result<Vec<Photo>, RemoteError>;

    /// Apply `update` to the remote row, stamping it with the local edit time.
    async fn update(
        &self,
        id: &str,
        update: &PhotoUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RemoteError>;

    async fn delete(&self, id: &str) -> Result<(), RemoteError>;
}

pub type SharedRemote = Arc<dyn RemoteBackend>;

/// Row layout of the remote `photos` resource.
#[derive(Debug, Serialize, Deserialize)]
struct PhotoRow {
    id: String,
    user_id: String,
    image: String,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    song: Option<String>,
    #[serde(default)]
    song_name: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<&Photo> for PhotoRow {
    fn from(photo: &Photo) -> Self {
        PhotoRow {
            id: photo.id.clone(),
            user_id: photo.user_id.clone(),
            image: photo.image.clone(),
            caption: Some(photo.caption.clone()),
            song: photo.song.clone(),
            song_name: photo.song_name.clone(),
            created_at: photo.created_at,
            updated_at: Some(photo.updated_at),
        }
    }
}

impl From<PhotoRow> for Photo {
    fn from(row: PhotoRow) -> Self {
        // The original web client wrote "" for a missing song.
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        Photo {
            id: row.id,
            user_id: row.user_id,
            image: row.image,
            caption: row.caption.unwrap_or_default(),
            song: non_empty(row.song),
            song_name: non_empty(row.song_name),
            created_at: row.created_at,
            updated_at: row.updated_at.unwrap_or(row.created_at),
        }
    }
}

fn patch_body(update: &PhotoUpdate, updated_at: DateTime<Utc>) -> Value {
    let mut body = Map::new();
    if let Some(caption) = &update.caption {
        body.insert("caption".into(), Value::from(caption.clone()));
    }
    if let Some(song) = &update.song {
        body.insert("song".into(), Value::from(song.clone()));
    }
    if let Some(song_name) = &update.song_name {
        body.insert("song_name".into(), Value::from(song_name.clone()));
    }
    body.insert("updated_at".into(), Value::from(timestamp(&updated_at)));
    Value::Object(body)
}

#[derive(Debug, Clone)]
pub struct PostgrestClient {
    http: Client,
    base_url: String,
    key: String,
}

impl PostgrestClient {
    pub fn new(base_url: &str, key: &str, timeout: Duration) -> Result<Self, RemoteError> {
        if base_url.is_empty() || key.is_empty() {
            return Err(RemoteError::Config("url and key are required".into()));
        }
        if base_url.contains("YOUR_") || key.contains("YOUR_") {
            return Err(RemoteError::Config("placeholder credentials".into()));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(PostgrestClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        })
    }

    fn request(&self, method: Method, query: &[(&str, String)]) -> RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/photos", self.base_url))
            .query(query)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status { status, body })
    }
}

#[async_trait]
impl RemoteBackend for PostgrestClient {
    async fn save(&self, photo: &Photo) -> Result<(), RemoteError> {
        let request = self
            .request(Method::POST, &[])
            .header("Prefer", "return=minimal")
            .json(&PhotoRow::from(photo));
        self.send(request).await?;
        tracing::debug!(id = %photo.id, "Photo saved remotely");
        Ok(())
    }

    async fn fetch(&self, user_id: &str) -> Result<Vec<Photo>, RemoteError> {
        let request = self.request(
            Method::GET,
            &[
                ("user_id", format!("eq.{user_id}")),
                ("order", "created_at.desc".to_string()),
            ],
        );
        let rows: Vec<PhotoRow> = self.send(request).await?.json().await?;
        tracing::debug!(user_id, count = rows.len(), "Fetched remote photos");
        Ok(rows.into_iter().map(Photo::from).collect())
    }

    async fn update(
        &self,
        id: &str,
        update: &PhotoUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RemoteError> {
        let request = self
            .request(Method::PATCH, &[("id", format!("eq.{id}"))])
            .json(&patch_body(update, updated_at));
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let request = self.request(Method::DELETE, &[("id", format!("eq.{id}"))]);
        self.send(request).await?;
        Ok(())
    }
}
