//! Server configuration
//!
//! Defaults, then an optional `lingo.toml`, then `LINGO_*` environment
//! variables (e.g. `LINGO_BIND_ADDRESS`, `LINGO_JWT_SECRET`).

use crate::services::CachePolicy;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";
const CONFIG_FILE: &str = "lingo";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind_address: String,
    pub data_dir: PathBuf,
    /// Overrides `<data_dir>/lingo.db`
    pub database_path: Option<String>,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub search_ttl_secs: u64,
    pub page_ttl_secs: u64,
    pub export_ttl_secs: u64,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Settings {
    /// Load from `lingo.toml` (if present) and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(
            Some(CONFIG_FILE),
            Environment::with_prefix("LINGO").try_parsing(true),
        )
    }

    pub fn load_from(file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("bind_address", "0.0.0.0:8000")?
            .set_default("data_dir", "data")?
            .set_default("jwt_secret", DEFAULT_JWT_SECRET)?
            .set_default("token_ttl_hours", 24_i64)?
            .set_default("search_ttl_secs", 60_i64)?
            .set_default("page_ttl_secs", 60_i64)?
            .set_default("export_ttl_secs", 86_400_i64)?
            .set_default("max_connections", 5_i64)?
            .set_default("busy_timeout_secs", 5_i64)?;

        if let Some(name) = file {
            builder = builder.add_source(File::with_name(name).required(false));
        }

        builder.add_source(env).build()?.try_deserialize()
    }

    pub fn database_path(&self) -> String {
        self.database_path.clone().unwrap_or_else(|| {
            self.data_dir
                .join("lingo.db")
                .to_string_lossy()
                .to_string()
        })
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            search_ttl: Duration::from_secs(self.search_ttl_secs),
            page_ttl: Duration::from_secs(self.page_ttl_secs),
            export_ttl: Duration::from_secs(self.export_ttl_secs),
        }
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours.max(1))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("LINGO")
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_from(None, env(&[])).unwrap();
        assert_eq!(settings.bind_address, "0.0.0.0:8000");
        assert_eq!(settings.export_ttl_secs, 86_400);
        assert!(settings.uses_default_secret());
        assert!(settings.database_path().ends_with("lingo.db"));
        assert_eq!(settings.cache_policy().search_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_environment_overrides() {
        let settings = Settings::load_from(
            None,
            env(&[
                ("LINGO_BIND_ADDRESS", "127.0.0.1:9000"),
                ("LINGO_JWT_SECRET", "s3cret"),
                ("LINGO_SEARCH_TTL_SECS", "5"),
                ("LINGO_DATABASE_PATH", "/tmp/custom.db"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.bind_address, "127.0.0.1:9000");
        assert!(!settings.uses_default_secret());
        assert_eq!(settings.search_ttl_secs, 5);
        assert_eq!(settings.database_path(), "/tmp/custom.db");
    }
}
