use std::env;
use std::fmt::Display;
use std::str::FromStr;

use chrono::Duration;
use log::info;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    Postgres { database_url: String },
    Memory,
}

/// Session cookie and password hashing settings shared with the auth handlers.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub ttl: Duration,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
            cookie_secure: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: Storage,
    pub max_connections: u32,
    pub auth: AuthSettings,
    pub cors_origin: String,
    pub seed_data: bool,
    pub force_seed: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = lookup("APP_ENV").as_deref() == Some("production");

        let storage = match lookup("STORAGE").as_deref().unwrap_or("postgres") {
            "postgres" => Storage::Postgres {
                database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            "memory" => Storage::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE",
                    value: other.to_string(),
                    reason: "expected 'postgres' or 'memory'".to_string(),
                })
            }
        };

        let ttl_hours: i64 = try_load(&lookup, "SESSION_TTL_HOURS", "24")?;
        if ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_TTL_HOURS",
                value: ttl_hours.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let bcrypt_cost: u32 = try_load(&lookup, "BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
                reason: "must be between 4 and 31".to_string(),
            });
        }

        Ok(Self {
            host: try_load(&lookup, "HOST", "0.0.0.0")?,
            port: try_load(&lookup, "PORT", "5000")?,
            storage,
            max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", "5")?,
            auth: AuthSettings {
                ttl: Duration::hours(ttl_hours),
                bcrypt_cost,
                cookie_secure: try_load(
                    &lookup,
                    "COOKIE_SECURE",
                    if production { "true" } else { "false" },
                )?,
            },
            cors_origin: try_load(&lookup, "CORS_ORIGIN", "http://localhost:5173")?,
            seed_data: try_load(&lookup, "SEED_DATA", "false")?,
            force_seed: try_load(&lookup, "FORCE_SEED", "false")?,
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.clone(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_database_url() {
        let cfg = config(&[("DATABASE_URL", "postgres://localhost/drive_book")]).unwrap();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.max_connections, 5);
        assert_eq!(cfg.auth.ttl, Duration::hours(24));
        assert!(!cfg.auth.cookie_secure);
        assert_eq!(cfg.auth.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(!cfg.seed_data);
        assert_eq!(
            cfg.storage,
            Storage::Postgres {
                database_url: "postgres://localhost/drive_book".into()
            }
        );
    }

    #[test]
    fn postgres_requires_database_url() {
        assert_eq!(
            config(&[]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        assert_eq!(config(&[("STORAGE", "memory")]).unwrap().storage, Storage::Memory);
    }

    #[test]
    fn production_defaults_to_secure_cookies() {
        let cfg = config(&[("STORAGE", "memory"), ("APP_ENV", "production")]).unwrap();
        assert!(cfg.auth.cookie_secure);

        let cfg = config(&[
            ("STORAGE", "memory"),
            ("APP_ENV", "production"),
            ("COOKIE_SECURE", "false"),
        ])
        .unwrap();
        assert!(!cfg.auth.cookie_secure);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            config(&[("STORAGE", "memory"), ("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("STORAGE", "memory"), ("SESSION_TTL_HOURS", "0")]),
            Err(ConfigError::Invalid { key: "SESSION_TTL_HOURS", .. })
        ));
        assert!(matches!(
            config(&[("STORAGE", "memory"), ("BCRYPT_COST", "3")]),
            Err(ConfigError::Invalid { key: "BCRYPT_COST", .. })
        ));
        assert!(matches!(
            config(&[("STORAGE", "sqlite")]),
            Err(ConfigError::Invalid { key: "STORAGE", .. })
        ));
    }
}
