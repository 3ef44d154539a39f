use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const JWT_SECRET_ENV: &str = "FRAGHUB_JWT_SECRET";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub surveys: SurveysConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// In-flight request cap; 0 disables the limit.
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".into(),
            max_concurrent_requests: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://fraghub.db?mode=rwc".into(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub registration_enabled: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let app = fraghub_core::AppConfig::default();
        Self {
            jwt_secret: app.jwt_secret,
            jwt_expiry_seconds: app.jwt_expiry_seconds,
            registration_enabled: app.registration_enabled,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SurveysConfig {
    pub session_idle_seconds: u64,
}

impl Default for SurveysConfig {
    fn default() -> Self {
        Self {
            session_idle_seconds: fraghub_core::AppConfig::default().survey_session_idle_seconds,
        }
    }
}

impl Config {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            Self::parse(&raw).with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            tracing::info!("Config file {} not found, using defaults", path.display());
            Self::default()
        };
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            if !secret.is_empty() {
                config.auth.jwt_secret = secret;
            }
        }
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Fills in a random signing secret when none is configured.
    ///
    /// Returns true when a secret had to be generated; tokens issued with it
    /// stop validating after a restart.
    pub fn ensure_jwt_secret(&mut self) -> bool {
        if !self.auth.jwt_secret.trim().is_empty() {
            return false;
        }
        self.auth.jwt_secret = fraghub_core::auth::generate_secret();
        true
    }

    pub fn app_config(&self) -> fraghub_core::AppConfig {
        fraghub_core::AppConfig {
            jwt_secret: self.auth.jwt_secret.clone(),
            jwt_expiry_seconds: self.auth.jwt_expiry_seconds,
            registration_enabled: self.auth.registration_enabled,
            survey_session_idle_seconds: self.surveys.session_idle_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let config = Config::parse(
            r#"
            [server]
            bind_address = "0.0.0.0:8080"

            [surveys]
            session_idle_seconds = 120
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.server.max_concurrent_requests, 0);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.auth.registration_enabled);
        assert_eq!(config.app_config().survey_session_idle_seconds, 120);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8000");
        assert_eq!(config.database.url, "sqlite://fraghub.db?mode=rwc");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[server\nbind_address = 1").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn secret_is_generated_only_when_blank() {
        let mut config = Config::default();
        assert!(config.ensure_jwt_secret());
        assert_eq!(config.auth.jwt_secret.len(), 64);

        let kept = config.auth.jwt_secret.clone();
        assert!(!config.ensure_jwt_secret());
        assert_eq!(config.auth.jwt_secret, kept);
    }
}
