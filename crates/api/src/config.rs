use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub jwt: JwtAuthConfig,
    pub analytics: AnalyticsConfig,
    pub absence: AbsenceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(c: &DatabaseConfig) -> Self {
        Self {
            url: c.url.clone(),
            max_connections: c.max_connections,
            min_connections: c.min_connections,
            connect_timeout_secs: c.connect_timeout_secs,
            idle_timeout_secs: c.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `json` or `pretty`
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Per user and minute. 0 turns the limiter off.
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// PEM-encoded RS256 key; wins over `secret` when both are set.
    #[serde(default)]
    pub public_key: String,
    /// HS256 shared secret, meant for local runs.
    #[serde(default)]
    pub secret: String,
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    pub site_cache_ttl_secs: u64,
    pub site_cache_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbsenceConfig {
    pub overlap_warning_limit: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("{0} is not configured")]
    Missing(&'static str),

    #[error("{0}")]
    Invalid(String),
}

/// Baseline layer compiled into the binary, so every key has a value even
/// when `config/default.toml` is absent at runtime.
const BASELINE: &str = include_str!("../../../config/default.toml");

fn baseline() -> config::ConfigBuilder<config::builder::DefaultState> {
    config::Config::builder().add_source(config::File::from_str(BASELINE, config::FileFormat::Toml))
}

impl Config {
    /// Layers, lowest precedence first: compiled-in baseline,
    /// `config/default.toml`, `config/local.toml`, then `CANTIERE__*`
    /// environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let layered = baseline()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("CANTIERE").separator("__"))
            .build()?;

        let cfg: Self = layered.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Baseline plus explicit key overrides; no files, no environment, no validation.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let builder = overrides
            .iter()
            .try_fold(baseline(), |b, (key, value)| b.set_override(*key, *value))?;
        builder.build()?.try_deserialize()
    }

    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigValidationError::Missing("CANTIERE__DATABASE__URL"));
        }
        if self.jwt.public_key.trim().is_empty() && self.jwt.secret.is_empty() {
            return Err(ConfigValidationError::Missing("jwt.public_key or jwt.secret"));
        }
        if self.server.port == 0 {
            return Err(ConfigValidationError::Invalid("server.port must be non-zero".into()));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::Invalid(format!(
                "database.min_connections ({}) exceeds database.max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        let raw = format!("{}:{}", self.server.host, self.server.port);
        raw.parse()
            .map_err(|_| ConfigValidationError::Invalid(format!("cannot listen on {raw}")))
    }
}
