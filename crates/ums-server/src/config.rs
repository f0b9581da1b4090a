//! Configuration loading

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;
use ums_auth::{
    DEFAULT_PUBLIC_PATHS, MAX_PASSWORD_BYTES, MAX_TIMEOUT_MINUTES, MIN_PASSWORD_LENGTH,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Application identity, reported by `/hello1` and `/actuator/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,
    /// Inactivity timeout of a login session
    #[serde(default = "default_session_timeout_minutes")]
    pub session_timeout_minutes: i64,
    #[serde(default = "default_session_purge_interval_secs")]
    pub session_purge_interval_secs: u64,
    /// Mark the session cookie `Secure` (only sent over HTTPS)
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Ant-style patterns reachable without a login
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
    /// Account created when the user table is empty
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: default_session_cookie_name(),
            session_timeout_minutes: default_session_timeout_minutes(),
            session_purge_interval_secs: default_session_purge_interval_secs(),
            cookie_secure: false,
            bcrypt_cost: default_bcrypt_cost(),
            public_paths: default_public_paths(),
            admin_username: default_admin_username(),
            admin_password: default_admin_password(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/actuator/prometheus`
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_app_name() -> String {
    "usermgmt".to_string()
}

fn default_app_version() -> String {
    "V1".to_string()
}

fn default_db_path() -> String {
    "./data/usermgmt.db".to_string()
}

fn default_session_cookie_name() -> String {
    "UMS_SESSION".to_string()
}

fn default_session_timeout_minutes() -> i64 {
    30
}

fn default_session_purge_interval_secs() -> u64 {
    300
}

fn default_bcrypt_cost() -> u32 {
    ums_auth::password::DEFAULT_COST
}

fn default_public_paths() -> Vec<String> {
    DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect()
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "changeme".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when it is missing
    ///
    /// Runs before logging is set up, so it stays silent; see [`Config::describe_source`].
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {}", path))?;

            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path))?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Where [`Config::load`] took its settings from, for the startup log
    pub fn describe_source(path: &str) -> String {
        if Path::new(path).exists() {
            format!("Loaded configuration from {}", path)
        } else {
            format!("Config file not found at {}, using defaults", path)
        }
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.auth.session_cookie_name.is_empty()
            || !self
                .auth
                .session_cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!(
                "auth.session_cookie_name must be non-empty and contain only ASCII letters, digits, '_' or '-'"
            );
        }
        if !(1..=MAX_TIMEOUT_MINUTES).contains(&self.auth.session_timeout_minutes) {
            bail!(
                "auth.session_timeout_minutes must be between 1 and {}",
                MAX_TIMEOUT_MINUTES
            );
        }
        if self.auth.session_purge_interval_secs == 0 {
            bail!("auth.session_purge_interval_secs must be greater than 0");
        }
        if self.auth.admin_username.is_empty() {
            bail!("auth.admin_username cannot be empty");
        }
        let password_len = self.auth.admin_password.len();
        if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_BYTES).contains(&password_len) {
            bail!(
                "auth.admin_password must be {} to {} bytes long",
                MIN_PASSWORD_LENGTH,
                MAX_PASSWORD_BYTES
            );
        }
        Ok(())
    }

    /// Log warnings for settings that work but are unsafe
    pub fn warn_insecure(&self) {
        if self.auth.admin_password == default_admin_password() {
            warn!("Default admin password is in use; change auth.admin_password");
        }
        if !self.auth.cookie_secure {
            warn!("Session cookie is sent without the Secure attribute");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/usermgmt.toml").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.app.version, "V1");
        assert_eq!(config.auth.session_timeout_minutes, 30);
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert_eq!(config.auth.public_paths.len(), DEFAULT_PUBLIC_PATHS.len());
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
            [server]
            port = 9090

            [auth]
            cookie_secure = true
            public_paths = ["/health", "/docs/**"]

            [logging]
            format = "json"
            "#,
        );

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert!(config.auth.cookie_secure);
        assert_eq!(config.auth.public_paths, vec!["/health", "/docs/**"]);
        assert_eq!(config.auth.session_cookie_name, "UMS_SESSION");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.database.path, "./data/usermgmt.db");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = write_config("[auth]\nsession_timeout_minutes = 0\n");
        assert!(Config::load(file.path().to_str().unwrap()).is_err());

        let file = write_config("[auth]\nsession_cookie_name = \"bad name;\"\n");
        assert!(Config::load(file.path().to_str().unwrap()).is_err());

        let file = write_config("[logging]\nformat = \"xml\"\n");
        assert!(Config::load(file.path().to_str().unwrap()).is_err());

        let file = write_config("[auth]\nsession_timeout_minutes = 4611686018427387903\n");
        assert!(Config::load(file.path().to_str().unwrap()).is_err());

        let file = write_config("[auth]\nadmin_password = \"admin\"\n");
        assert!(Config::load(file.path().to_str().unwrap()).is_err());

        let file = write_config(&format!("[auth]\nadmin_password = \"{}\"\n", "p".repeat(73)));
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert!(config.auth.admin_password.len() >= MIN_PASSWORD_LENGTH);
    }

    #[test]
    fn test_describe_source() {
        assert_eq!(
            Config::describe_source("/nonexistent/usermgmt.toml"),
            "Config file not found at /nonexistent/usermgmt.toml, using defaults"
        );
        let file = write_config("");
        let path = file.path().to_str().unwrap();
        assert_eq!(Config::describe_source(path), format!("Loaded configuration from {}", path));
    }
}
