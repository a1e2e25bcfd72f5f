use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub external: ExternalConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// YAML seed file. Always loaded for the catalog and pattern data; also
    /// seeds permissions when the backend is `Memory`.
    pub fixture_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalConfig {
    /// Header carrying the external identity, set by the fronting auth proxy.
    pub user_header: String,
    /// Header carrying the session identity for internal (non-proxied) callers.
    pub session_header: String,
    pub space_cookie: String,
    /// Cookie the entry page leaves with the external identity.
    pub user_cookie: String,
    pub default_time_zone: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        Self::for_environment(environment).with_env_overrides()
    }

    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("LOG_GATEWAY_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("SERVER_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }
        if let Ok(v) = env::var("SERVER_CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SERVER_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Storage overrides
        match env::var("STORAGE_BACKEND").as_deref() {
            Ok("postgres") | Ok("pg") => self.storage.backend = StorageBackend::Postgres,
            Ok("memory") => self.storage.backend = StorageBackend::Memory,
            _ => {}
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.storage.database_url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.storage.max_connections = v.parse().unwrap_or(self.storage.max_connections);
        }
        if let Ok(v) = env::var("FIXTURE_PATH") {
            self.storage.fixture_path = Some(v);
        }

        // External access overrides
        if let Ok(v) = env::var("EXTERNAL_USER_HEADER") {
            self.external.user_header = v.to_ascii_lowercase();
        }
        if let Ok(v) = env::var("EXTERNAL_SESSION_HEADER") {
            self.external.session_header = v.to_ascii_lowercase();
        }
        if let Ok(v) = env::var("EXTERNAL_SPACE_COOKIE") {
            self.external.space_cookie = v;
        }
        if let Ok(v) = env::var("EXTERNAL_USER_COOKIE") {
            self.external.user_cookie = v;
        }
        if let Ok(v) = env::var("EXTERNAL_DEFAULT_TIME_ZONE") {
            self.external.default_time_zone = v;
        }

        self
    }

    fn external_defaults() -> ExternalConfig {
        ExternalConfig {
            user_header: "user".to_string(),
            session_header: "x-username".to_string(),
            space_cookie: "space_uid".to_string(),
            user_cookie: "external_user".to_string(),
            default_time_zone: "Asia/Shanghai".to_string(),
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                database_url: None,
                max_connections: 10,
                fixture_path: Some("fixtures/dev.yaml".to_string()),
            },
            external: Self::external_defaults(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
                database_url: None,
                max_connections: 20,
                fixture_path: None,
            },
            external: Self::external_defaults(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
                database_url: None,
                max_connections: 50,
                fixture_path: None,
            },
            external: Self::external_defaults(),
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
