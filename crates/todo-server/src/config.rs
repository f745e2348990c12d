//! Server configuration
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `todo-server.toml` in the working directory, or the file named by `TODO_CONFIG`
//! 3. environment variables such as `TODO__CACHE__URL=redis://cache:6379`

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use todo_core::{Result, TodoError};

const DEFAULT_CONFIG_FILE: &str = "todo-server.toml";
const CONFIG_PATH_ENV: &str = "TODO_CONFIG";
const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub request_timeout_secs: u64,
    /// Register the gRPC reflection service
    pub reflection: bool,
    pub log: LogConfig,
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:50051".to_string(),
            request_timeout_secs: 10,
            reflection: true,
            log: LogConfig::default(),
            store: StoreConfig::default(),
            cache: CacheConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "todo_server=info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite file, or `:memory:`
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: "data/todo.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub url: String,
    /// Expiry for every cache entry; 0 keeps entries until evicted
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            url: "redis://127.0.0.1:6379".to_string(),
            ttl_secs: 15 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: u64,
    /// Usernames that receive the admin role when they register.
    /// From the environment as a comma separated list.
    pub admin_usernames: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_hours: 24,
            admin_usernames: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Loads defaults, the config file and the environment, then validates.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(Some(&path))
    }

    /// Like [`ServerConfig::load`] with an explicit file. A missing file is skipped.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path.filter(|p| p.exists()) {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("TODO")
                .try_parsing(true)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("auth.admin_usernames"),
        );

        let config: ServerConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| TodoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bind_address.trim().is_empty() {
            return Err(TodoError::Config("bind_address must be set".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(TodoError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.auth.jwt_secret.is_empty() {
            return Err(TodoError::Config("auth.jwt_secret must be set".to_string()));
        }
        if self.auth.token_ttl_hours == 0 {
            return Err(TodoError::Config(
                "auth.token_ttl_hours must be greater than 0".to_string(),
            ));
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.path.trim().is_empty() {
            return Err(TodoError::Config("store.path must be set for sqlite".to_string()));
        }
        Ok(())
    }

    pub fn uses_default_secret(&self) -> bool {
        self.auth.jwt_secret == DEFAULT_JWT_SECRET
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("todo-server-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:50051");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(900)));
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert!(config.auth.admin_usernames.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let path = write_config(
            r#"
bind_address = "127.0.0.1:6000"
reflection = false

[log]
format = "json"

[store]
backend = "memory"

[cache]
backend = "memory"
ttl_secs = 0

[auth]
jwt_secret = "from-file"
admin_usernames = ["root", "ops"]
"#,
        );

        let config = ServerConfig::load_from(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:6000");
        assert!(!config.reflection);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.level, "todo_server=info");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.ttl(), None);
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert_eq!(config.auth.admin_usernames, vec!["root", "ops"]);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("todo-server-does-not-exist.toml");
        let config = ServerConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let path = write_config("request_timeout_secs = 0\n");
        let err = ServerConfig::load_from(Some(&path)).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, TodoError::Config(_)));

        let path = write_config("[store]\nbackend = \"postgres\"\n");
        let err = ServerConfig::load_from(Some(&path)).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, TodoError::Config(_)));

        let mut config = ServerConfig::default();
        config.auth.jwt_secret.clear();
        assert!(config.validate().is_err());
    }
}
