use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL clients reach this server under; used to build absolute media URLs.
    pub public_url: String,
    /// Development mode serves /media/* straight from the media root.
    pub development: bool,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub access_token_ttl_hours: i64,
    pub refresh_token_ttl_days: i64,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct MediaConfig {
    pub root: String,
    pub url_prefix: String,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: Option<String>,
    pub file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            media: MediaConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            public_url: "http://127.0.0.1:8000".to_string(),
            development: true,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://rewear.db".to_string(),
            max_connections: Some(10),
            min_connections: Some(1),
            acquire_timeout_seconds: Some(30),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            access_token_ttl_hours: 24,
            refresh_token_ttl_days: 30,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: "media".to_string(),
            url_prefix: "/media".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: Some("json".to_string()),
            file: None,
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| crate::error::RewearError::Config(format!("Failed to read config file: {}", e)))?;

        let config: AppConfig = toml::from_str(&config_str)
            .map_err(|e| crate::error::RewearError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    pub fn load_with_env_overrides<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;

        // Override with environment variables
        if let Ok(database_url) = std::env::var("REWEAR_DATABASE_URL") {
            config.database.url = database_url;
        }

        if let Ok(jwt_secret) = std::env::var("JWT_SECRET") {
            config.auth.jwt_secret = Some(jwt_secret);
        }

        if let Ok(media_root) = std::env::var("REWEAR_MEDIA_ROOT") {
            config.media.root = media_root;
        }

        if let Ok(public_url) = std::env::var("REWEAR_PUBLIC_URL") {
            config.server.public_url = public_url;
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            config.logging.level = log_level;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(crate::error::RewearError::Config("Server port cannot be 0".to_string()));
        }

        if self.server.public_url.is_empty() {
            return Err(crate::error::RewearError::Config("Public URL cannot be empty".to_string()));
        }

        if self.database.url.is_empty() {
            return Err(crate::error::RewearError::Config("Database URL cannot be empty".to_string()));
        }

        if self.media.root.is_empty() {
            return Err(crate::error::RewearError::Config("Media root cannot be empty".to_string()));
        }

        if self.auth.access_token_ttl_hours <= 0 || self.auth.refresh_token_ttl_days <= 0 {
            return Err(crate::error::RewearError::Config("Token lifetimes must be positive".to_string()));
        }

        Ok(())
    }

    pub fn get_database_url(&self) -> &str {
        &self.database.url
    }

    pub fn get_server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn get_jwt_secret(&self) -> Option<&str> {
        self.auth.jwt_secret.as_deref()
    }

    pub fn is_development(&self) -> bool {
        self.server.development
    }
}

pub fn create_default_config_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let default_config = AppConfig::default();
    let toml_str = toml::to_string_pretty(&default_config)
        .map_err(|e| crate::error::RewearError::Config(format!("Failed to serialize default config: {}", e)))?;

    std::fs::write(path, toml_str)
        .map_err(|e| crate::error::RewearError::Config(format!("Failed to write default config file: {}", e)))?;

    Ok(())
}
