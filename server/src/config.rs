use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::security::DEFAULT_ROUNDS;

/// Default JSON body limit; photos arrive as base64 data URLs.
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// SQLite database at `--database`
    Sqlite,
    /// Process memory, lost on exit
    Memory,
}

#[derive(Parser, Clone)]
#[command(name = "photo-gallery", about = "Personal photo gallery server")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "GALLERY_BIND", default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    /// SQLite database file (users always live here; `:memory:` for a throwaway database)
    #[arg(long, env = "GALLERY_DATABASE", default_value = "gallery.db")]
    pub database: PathBuf,

    /// Local record store for photos
    #[arg(long, value_enum, env = "GALLERY_STORE", default_value = "sqlite")]
    pub store: StoreKind,

    /// Maximum number of photos held by the memory store
    #[arg(long, env = "GALLERY_MEMORY_CAPACITY")]
    pub memory_capacity: Option<usize>,

    /// Base URL of the remote REST backend
    #[arg(long, env = "SUPABASE_URL")]
    pub remote_url: Option<String>,

    /// API key of the remote REST backend
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub remote_key: Option<String>,

    /// Timeout for each remote request, in seconds
    #[arg(long, env = "GALLERY_REMOTE_TIMEOUT_SECS", default_value_t = 10)]
    pub remote_timeout_secs: u64,

    /// PBKDF2 rounds for stored passwords
    #[arg(long, env = "GALLERY_PASSWORD_ROUNDS", default_value_t = DEFAULT_ROUNDS)]
    pub password_rounds: u32,

    /// Largest accepted request body, in bytes
    #[arg(long, env = "GALLERY_BODY_LIMIT_BYTES", default_value_t = DEFAULT_BODY_LIMIT)]
    pub body_limit_bytes: usize,

    /// Directory with the built frontend, served for non-API paths
    #[arg(long, env = "GALLERY_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "GALLERY_LOG", default_value = "photo_gallery_server=info,tower_http=info")]
    pub log_level: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind", &self.bind)
            .field("database", &self.database)
            .field("store", &self.store)
            .field("memory_capacity", &self.memory_capacity)
            .field("remote_url", &self.remote_url)
            .field("remote_key", &self.remote_key.as_ref().map(|_| "<redacted>"))
            .field("static_dir", &self.static_dir)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// URL and key of the remote backend, when both are configured.
    pub fn remote(&self) -> Option<(&str, &str)> {
        match (self.remote_url.as_deref(), self.remote_key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some((url, key)),
            _ => None,
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_server() {
        let config = Config::try_parse_from(["photo-gallery"]).unwrap();
        assert_eq!(config.bind.port(), 5000);
        assert_eq!(config.store, StoreKind::Sqlite);
        assert_eq!(config.body_limit_bytes, DEFAULT_BODY_LIMIT);
        assert_eq!(config.password_rounds, DEFAULT_ROUNDS);
    }

    #[test]
    fn remote_needs_both_url_and_key() {
        let config = Config::try_parse_from([
            "photo-gallery",
            "--remote-url",
            "https://example.supabase.co",
        ])
        .unwrap();
        assert!(config.remote().is_none());

        let config = Config::try_parse_from([
            "photo-gallery",
            "--remote-url",
            "https://example.supabase.co",
            "--remote-key",
            "anon",
        ])
        .unwrap();
        assert_eq!(config.remote(), Some(("https://example.supabase.co", "anon")));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let config = Config::try_parse_from([
            "photo-gallery",
            "--remote-key",
            "super-secret",
            "--store",
            "memory",
        ])
        .unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("Memory"));
    }
}
