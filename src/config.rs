//! Configuration management for Estante Server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Custom endpoint for S3-compatible services; AWS when absent
    pub endpoint: Option<String>,
    pub bucket: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
    /// Upper bound for a single HEAD/GET/LIST call, in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Root directory of the local EPUB cache
    pub dir: PathBuf,
    /// Upper bound for parsing and extraction of one document, in seconds
    pub parse_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub github_api_url: String,
    pub token_ttl_secs: u64,
    pub request_timeout_secs: u64,
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CacheConfig {
    pub fn parse_timeout(&self) -> Duration {
        Duration::from_secs(self.parse_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            storage: StorageConfig {
                endpoint: None,
                bucket: "library".to_string(),
                access_key: None,
                secret_key: None,
                region: Some("us-east-1".to_string()),
                timeout_secs: 30,
            },
            cache: CacheConfig {
                dir: PathBuf::from("/tmp/epub_cache"),
                parse_timeout_secs: 30,
            },
            auth: AuthConfig {
                github_api_url: "https://api.github.com".to_string(),
                token_ttl_secs: 300,
                request_timeout_secs: 5,
            },
        }
    }
}

impl Config {
    /// Load configuration from the environment. Only `S3_BUCKET` is required.
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port),
            },
            storage: StorageConfig {
                endpoint: env::var("S3_ENDPOINT").ok(),
                bucket: env::var("S3_BUCKET")?,
                access_key: env::var("S3_ACCESS_KEY").ok(),
                secret_key: env::var("S3_SECRET_KEY").ok(),
                region: env::var("S3_REGION").ok().or(defaults.storage.region),
                timeout_secs: parse_var("STORE_TIMEOUT_SECS", defaults.storage.timeout_secs),
            },
            cache: CacheConfig {
                dir: env::var("EPUB_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.cache.dir),
                parse_timeout_secs: parse_var(
                    "PARSE_TIMEOUT_SECS",
                    defaults.cache.parse_timeout_secs,
                ),
            },
            auth: AuthConfig {
                github_api_url: env::var("GITHUB_API_URL").unwrap_or(defaults.auth.github_api_url),
                token_ttl_secs: parse_var("TOKEN_CACHE_TTL_SECS", defaults.auth.token_ttl_secs),
                request_timeout_secs: parse_var(
                    "GITHUB_TIMEOUT_SECS",
                    defaults.auth.request_timeout_secs,
                ),
            },
        })
    }
}

/// Read a numeric variable, falling back to `default` when unset or malformed
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
