use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Longest caption accepted on save or update, in characters.
pub const MAX_CAPTION_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub user_id: String,
    pub image: String,
    pub caption: String,
    pub song: Option<String>,
    pub song_name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Time of the last local edit; equals `created_at` until then.
    pub updated_at: DateTime<Utc>,
}

impl Photo {
    /// Apply the fields present in `update`, leaving the rest untouched.
    pub fn apply(&mut self, update: &PhotoUpdate) {
        if let Some(caption) = &update.caption {
            self.caption = caption.clone();
        }
        if let Some(song) = &update.song {
            self.song = song.clone();
        }
        if let Some(song_name) = &update.song_name {
            self.song_name = song_name.clone();
        }
    }
}

/// Body of `POST /api/photos`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoto {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub song_name: Option<String>,
}

/// Partial update of a photo.
///
/// An outer `None` leaves the field alone. For the optional song fields an
/// explicit JSON `null` (`Some(None)`) clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpdate {
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub song: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub song_name: Option<Option<String>>,
}

impl PhotoUpdate {
    pub fn caption(caption: impl Into<String>) -> Self {
        PhotoUpdate {
            caption: Some(caption.into()),
            ..Default::default()
        }
    }

    /// An update carrying every editable field of `photo`.
    pub fn replacing(photo: &Photo) -> Self {
        PhotoUpdate {
            caption: Some(photo.caption.clone()),
            song: Some(photo.song.clone()),
            song_name: Some(photo.song_name.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.caption.is_none() && self.song.is_none() && self.song_name.is_none()
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub created_at: String,
}

/// Result of a successful login or signup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub is_special_user: bool,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}
