//! # Configuration Management
//!
//! Centralized configuration for the authentication client.
//!
//! Everything the legacy demo hardcoded is configuration here: account
//! credentials, the client build/version identity reported to the server,
//! and connection parameters.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-variable overrides via `from_env()`

use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Main client configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ClientConfig {
    /// Account credentials
    #[serde(default)]
    pub account: AccountConfig,

    /// Client identity reported in the logon challenge
    #[serde(default)]
    pub client_info: ClientInfo,

    /// Connection parameters
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| AuthError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| AuthError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| AuthError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("REALM_AUTH_ACCOUNT_NAME") {
            config.account.name = name;
        }

        if let Ok(password) = std::env::var("REALM_AUTH_ACCOUNT_PASSWORD") {
            config.account.password = password;
        }

        if let Ok(addr) = std::env::var("REALM_AUTH_SERVER_ADDRESS") {
            config.connection.address = addr;
        }

        if let Ok(timeout) = std::env::var("REALM_AUTH_CONNECT_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.connection.connect_timeout = Duration::from_millis(val);
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.account.validate());
        errors.extend(self.client_info.validate());
        errors.extend(self.connection.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AuthError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Account credentials used in the SRP6 exchange
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
    /// Account name; compared case-insensitively by the server
    pub name: String,

    /// Account password; never transmitted, only hashed into the verifier
    pub password: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            password: String::new(),
        }
    }
}

impl AccountConfig {
    /// Validate account configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.is_empty() {
            errors.push("Account name cannot be empty".to_string());
        } else if self.name.len() > 16 {
            errors.push(format!(
                "Account name too long: {} characters (maximum: 16)",
                self.name.len()
            ));
        }

        if self.password.is_empty() {
            errors.push("Account password cannot be empty".to_string());
        }

        errors
    }
}

/// Client identity fields reported in the logon-challenge request.
///
/// The server validates the build number against its realm list; the tag
/// fields are transmitted reversed on the wire, which the codec handles.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientInfo {
    /// Game name tag (transmitted NUL-terminated)
    pub game_name: String,

    /// Client version triple (major, minor, bugfix)
    pub version: [u8; 3],

    /// Client build number
    pub build: u16,

    /// Platform tag, e.g. "x86"
    pub platform: String,

    /// Operating system tag, e.g. "Win"
    pub os: String,

    /// Locale tag, e.g. "enGB"
    pub locale: String,

    /// Timezone offset in minutes
    pub timezone: u32,

    /// Client address reported to the server
    pub address: Ipv4Addr,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            game_name: String::from("WoW"),
            version: [1, 12, 1],
            build: 8606,
            platform: String::from("x86"),
            os: String::from("Win"),
            locale: String::from("enGB"),
            timezone: 0x3C,
            address: Ipv4Addr::LOCALHOST,
        }
    }
}

impl ClientInfo {
    /// Validate client identity configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.game_name.is_empty() || self.game_name.len() > 3 {
            errors.push(format!(
                "Game name tag must be 1-3 characters, got '{}'",
                self.game_name
            ));
        }

        if self.platform.len() != 3 {
            errors.push(format!(
                "Platform tag must be exactly 3 characters, got '{}'",
                self.platform
            ));
        }

        if self.os.len() != 3 {
            errors.push(format!(
                "OS tag must be exactly 3 characters, got '{}'",
                self.os
            ));
        }

        if self.locale.len() != 4 {
            errors.push(format!(
                "Locale tag must be exactly 4 characters, got '{}'",
                self.locale
            ));
        }

        if self.build == 0 {
            errors.push("Client build number cannot be 0".to_string());
        }

        errors
    }
}

/// Connection parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    /// Authentication server address (e.g., "127.0.0.1:3724")
    pub address: String,

    /// Timeout for the connection attempt
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:3724"),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ConnectionConfig {
    /// Validate connection configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '127.0.0.1:3724')",
                self.address
            ));
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        } else if self.connect_timeout.as_secs() > 300 {
            errors.push("Connect timeout too long (maximum: 300s)".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("realm-auth"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fail_only_on_empty_credentials() {
        let config = ClientConfig::default();
        let errors = config.validate();
        assert_eq!(errors.len(), 2, "expected name+password findings: {errors:?}");
    }

    #[test]
    fn toml_roundtrip() {
        let config = ClientConfig::default_with_overrides(|c| {
            c.account.name = "srp6".into();
            c.account.password = "aaa123".into();
        });
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed = ClientConfig::from_toml(&toml).unwrap();
        assert_eq!(parsed.account.name, "srp6");
        assert!(parsed.validate().is_empty());
    }

    #[test]
    fn rejects_bad_tags() {
        let config = ClientConfig::default_with_overrides(|c| {
            c.account.name = "a".into();
            c.account.password = "a".into();
            c.client_info.platform = "x8664".into();
            c.client_info.locale = "en".into();
        });
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("Platform tag")));
        assert!(errors.iter().any(|e| e.contains("Locale tag")));
    }

    #[test]
    fn rejects_bad_address() {
        let config = ClientConfig::default_with_overrides(|c| {
            c.account.name = "a".into();
            c.account.password = "a".into();
            c.connection.address = "not-an-address".into();
        });
        assert!(config.validate_strict().is_err());
    }
}
