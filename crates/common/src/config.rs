//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Identity service configuration.
    pub identity: IdentityConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Listing limits and side-effect queue sizing.
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// External identity (auth) service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the auth API, e.g. `https://project.example.co`.
    pub url: String,
    /// Public API key sent as the `apikey` header.
    pub anon_key: String,
    /// Where OAuth and password-reset flows send the browser afterwards.
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory files are written beneath.
    #[serde(default = "default_storage_path")]
    pub base_path: PathBuf,
    /// Public bucket holding avatars and post images.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// URL prefix the bucket is served from. Defaults to the server URL.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Largest accepted upload.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_storage_path(),
            bucket: default_bucket(),
            public_url: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl StorageConfig {
    /// Route prefix the bucket is mounted at.
    #[must_use]
    pub fn mount_path(&self) -> String {
        format!("/storage/v1/object/public/{}", self.bucket)
    }

    /// Public base URL for objects in the bucket.
    #[must_use]
    pub fn bucket_url(&self, server_url: &str) -> String {
        let base = self.public_url.as_deref().unwrap_or(server_url);
        format!("{}{}", base.trim_end_matches('/'), self.mount_path())
    }
}

/// Listing limits.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Posts returned by feed and explore.
    #[serde(default = "default_page_limit")]
    pub page_limit: u64,
    /// Notifications returned by the notification list.
    #[serde(default = "default_notification_limit")]
    pub notification_limit: u64,
    /// Profiles returned by user search.
    #[serde(default = "default_page_limit")]
    pub search_limit: u64,
    /// Capacity of the best-effort notification queue.
    #[serde(default = "default_dispatch_capacity")]
    pub dispatch_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
            notification_limit: default_notification_limit(),
            search_limit: default_page_limit(),
            dispatch_capacity: default_dispatch_capacity(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./files")
}

fn default_bucket() -> String {
    "images".to_string()
}

const fn default_max_upload_bytes() -> usize {
    2 * 1024 * 1024
}

const fn default_page_limit() -> u64 {
    20
}

const fn default_notification_limit() -> u64 {
    50
}

const fn default_dispatch_capacity() -> usize {
    1024
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `ORBIT_ENV`)
    /// 3. Environment variables with `ORBIT_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("ORBIT_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("ORBIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("ORBIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                url = "http://localhost:3000"

                [database]
                url = "postgres://localhost/orbit"

                [identity]
                url = "http://localhost:9999"
                anon_key = "anon"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: Config = config.try_deserialize().unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.bucket, "images");
        assert_eq!(config.storage.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(config.feed.page_limit, 20);
        assert_eq!(config.feed.notification_limit, 50);
        assert!(config.identity.redirect_url.is_none());
    }

    #[test]
    fn test_bucket_url() {
        let storage = StorageConfig::default();
        assert_eq!(
            storage.bucket_url("http://localhost:3000/"),
            "http://localhost:3000/storage/v1/object/public/images"
        );
    }
}
