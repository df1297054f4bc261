//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use bracket_engine::db::DatabaseConfig;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Where tournaments are stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process memory, lost on shutdown
    Memory,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageBackend::Postgres => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

/// Values given on the command line, which win over the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub storage: Option<StorageBackend>,
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP bind address
    pub bind: SocketAddr,
    pub storage: StorageBackend,
    pub database: DatabaseConfig,
    /// Prometheus listener, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, DatabaseConfig::from_env(), |key| {
            std::env::var(key).ok()
        })
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(
        overrides: CliOverrides,
        mut database: DatabaseConfig,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_var(&lookup, "SERVER_BIND")?.unwrap_or(default_bind()),
        };

        let storage = match overrides.storage {
            Some(storage) => storage,
            None => parse_var(&lookup, "BRACKET_STORAGE")?.unwrap_or_default(),
        };

        if let Some(url) = overrides.database_url {
            database.database_url = url;
        }

        let metrics_bind = parse_var(&lookup, "METRICS_BIND")?;

        Ok(ServerConfig {
            bind,
            storage,
            database,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage == StorageBackend::Postgres {
            if self.database.database_url.is_empty() {
                return Err(ConfigError::MissingRequired {
                    var: "DATABASE_URL".to_string(),
                    hint: "Set it, or run with --storage memory".to_string(),
                });
            }

            if self.database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed DB_MAX_CONNECTIONS ({})",
                        self.database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Parse an optional variable, rejecting values that are set but malformed
fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                var: key.to_string(),
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)], overrides: CliOverrides) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(overrides, DatabaseConfig::development(), |key| {
            vars.get(key).cloned()
        })
    }

    #[test]
    fn test_defaults() {
        let config = load(&[], CliOverrides::default()).unwrap();
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert!(config.metrics_bind.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_environment_values() {
        let config = load(
            &[
                ("SERVER_BIND", "0.0.0.0:9000"),
                ("BRACKET_STORAGE", "memory"),
                ("METRICS_BIND", "0.0.0.0:9100"),
            ],
            CliOverrides::default(),
        )
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.metrics_bind.map(|a| a.port()), Some(9100));
    }

    #[test]
    fn test_cli_overrides_win() {
        let overrides = CliOverrides {
            bind: Some("127.0.0.1:7000".parse().unwrap()),
            database_url: Some("postgres://cli@localhost/cli".to_string()),
            storage: Some(StorageBackend::Memory),
        };
        let config = load(
            &[("SERVER_BIND", "0.0.0.0:9000"), ("BRACKET_STORAGE", "postgres")],
            overrides,
        )
        .unwrap();
        assert_eq!(config.bind.port(), 7000);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.database.database_url, "postgres://cli@localhost/cli");
    }

    #[test]
    fn test_malformed_values_are_errors() {
        let err = load(&[("SERVER_BIND", "not-an-address")], CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "SERVER_BIND"));

        let err = load(&[("BRACKET_STORAGE", "redis")], CliOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("unknown storage backend 'redis'"));
    }

    #[test]
    fn test_validation() {
        let mut config = load(&[], CliOverrides::default()).unwrap();
        config.database.min_connections = config.database.max_connections + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        // pool settings do not matter without postgres
        config.storage = StorageBackend::Memory;
        config.validate().unwrap();

        config.metrics_bind = Some(config.bind);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "Use memory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(msg.contains("Use memory"));
    }
}
