use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "production" | "prod" => Some(Environment::Production),
            "staging" | "stage" => Some(Environment::Staging),
            "development" | "dev" => Some(Environment::Development),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub dsn: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_idle_time_secs: u64,
    pub connection_timeout_secs: u64,
    pub query_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
    pub default_page_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_trusted_origins: Vec<String>,
    pub authentication_token_ttl_hours: i64,
    pub activation_token_ttl_hours: i64,
    /// Echo activation tokens in the registration response (no mailer is wired).
    pub expose_activation_tokens: bool,
}

const DEFAULT_DSN: &str = "postgres://postgres@localhost:5432/kkpop?sslmode=disable";

impl AppConfig {
    pub fn from_env() -> Self {
        Self::load(None)
    }

    /// Preset for `environment` (or `APP_ENV`, else development) with
    /// environment-variable overrides applied.
    pub fn load(environment: Option<Environment>) -> Self {
        let environment = environment
            .or_else(|| env::var("APP_ENV").ok().and_then(|v| Environment::parse(&v)))
            .unwrap_or(Environment::Development);

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
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.dsn = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_MIN_CONNECTIONS") {
            self.database.min_connections = v.parse().unwrap_or(self.database.min_connections);
        }
        if let Ok(v) = env::var("DATABASE_MAX_IDLE_TIME_SECS") {
            self.database.max_idle_time_secs = v.parse().unwrap_or(self.database.max_idle_time_secs);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout_secs = v.parse().unwrap_or(self.database.connection_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_QUERY_TIMEOUT") {
            self.database.query_timeout_secs = v.parse().unwrap_or(self.database.query_timeout_secs);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_TRUSTED_ORIGINS") {
            self.security.cors_trusted_origins = split_origins(&v);
        }
        if let Ok(v) = env::var("SECURITY_AUTH_TOKEN_TTL_HOURS") {
            self.security.authentication_token_ttl_hours =
                v.parse().unwrap_or(self.security.authentication_token_ttl_hours);
        }
        if let Ok(v) = env::var("SECURITY_ACTIVATION_TOKEN_TTL_HOURS") {
            self.security.activation_token_ttl_hours =
                v.parse().unwrap_or(self.security.activation_token_ttl_hours);
        }
        if let Ok(v) = env::var("SECURITY_EXPOSE_ACTIVATION_TOKENS") {
            self.security.expose_activation_tokens =
                v.parse().unwrap_or(self.security.expose_activation_tokens);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 8080,
                shutdown_grace_secs: 5,
            },
            database: DatabaseConfig {
                dsn: DEFAULT_DSN.to_string(),
                max_connections: 10,
                min_connections: 0,
                max_idle_time_secs: 15 * 60,
                connection_timeout_secs: 5,
                query_timeout_secs: 3,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024, // 1MB
                default_page_size: 30,
            },
            security: SecurityConfig {
                cors_trusted_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                authentication_token_ttl_hours: 24,
                activation_token_ttl_hours: 3 * 24,
                expose_activation_tokens: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 8080,
                shutdown_grace_secs: 10,
            },
            database: DatabaseConfig {
                dsn: DEFAULT_DSN.to_string(),
                max_connections: 20,
                min_connections: 2,
                max_idle_time_secs: 15 * 60,
                connection_timeout_secs: 5,
                query_timeout_secs: 3,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024,
                default_page_size: 30,
            },
            security: SecurityConfig {
                cors_trusted_origins: vec![],
                authentication_token_ttl_hours: 24,
                activation_token_ttl_hours: 3 * 24,
                expose_activation_tokens: false,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 8080,
                shutdown_grace_secs: 20,
            },
            database: DatabaseConfig {
                dsn: DEFAULT_DSN.to_string(),
                max_connections: 50,
                min_connections: 5,
                max_idle_time_secs: 15 * 60,
                connection_timeout_secs: 5,
                query_timeout_secs: 3,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 1024 * 1024,
                default_page_size: 30,
            },
            security: SecurityConfig {
                cors_trusted_origins: vec![],
                authentication_token_ttl_hours: 24,
                activation_token_ttl_hours: 3 * 24,
                expose_activation_tokens: false,
            },
        }
    }
}

pub(crate) fn split_origins(value: &str) -> Vec<String> {
    value
        .split([',', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
