//! Channel Relay configuration management

use crate::channels::ChatId;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main Channel Relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayAppConfig {
    /// Telegram transport configuration
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Buffer-and-flush relay configuration
    #[serde(default)]
    pub relay: RelayConfig,
}

impl RelayAppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Check that the configuration can drive a running relay
    pub fn validate(&self) -> Result<()> {
        self.relay.destination_chat_id()?;

        if self.relay.flush_interval_secs == 0 {
            return Err(Error::Config(
                "relay.flush_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.telegram.poll_timeout_secs == 0 {
            return Err(Error::Config(
                "telegram.poll_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.telegram.request_timeout_secs == 0 {
            return Err(Error::Config(
                "telegram.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.telegram.bot_token_ref.trim().is_empty() {
            return Err(Error::Config(
                "telegram.bot_token_ref must name an environment variable".to_string(),
            ));
        }

        Ok(())
    }
}

/// Telegram channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Name of the environment variable holding the bot token
    pub bot_token_ref: String,

    /// Bot API base URL
    pub api_base_url: String,

    /// Long-poll timeout for getUpdates, in seconds
    pub poll_timeout_secs: u64,

    /// Delay before polling again after a failed getUpdates, in seconds
    pub poll_retry_delay_secs: u64,

    /// Upper bound on any other Bot API request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token_ref: "RELAY_BOT_TOKEN".to_string(),
            api_base_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
            poll_retry_delay_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

impl TelegramConfig {
    /// Timeout applied to every Bot API call except long polling
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the bot token from the environment
    pub fn resolve_token(&self) -> Result<String> {
        let token = std::env::var(&self.bot_token_ref).map_err(|_| {
            Error::Config(format!(
                "Environment variable '{}' is not set",
                self.bot_token_ref
            ))
        })?;

        if token.trim().is_empty() {
            return Err(Error::Config(
                "Telegram bot token must not be empty".to_string(),
            ));
        }

        Ok(token)
    }
}

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Destination channel: `@username` or a numeric chat id
    pub destination: String,

    /// Seconds between flushes
    pub flush_interval_secs: u64,

    /// Keep items in the buffer after they were delivered
    pub retain_after_send: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            destination: String::new(),
            flush_interval_secs: 60,
            retain_after_send: false,
        }
    }
}

impl RelayConfig {
    /// Parsed destination chat
    pub fn destination_chat_id(&self) -> Result<ChatId> {
        if self.destination.trim().is_empty() {
            return Err(Error::Config(
                "relay.destination must be set (e.g. \"@my_channel\" or \"-1001234567890\")"
                    .to_string(),
            ));
        }
        self.destination.parse()
    }

    /// Flush period
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> RelayAppConfig {
        let mut config = RelayAppConfig::default();
        config.relay.destination = "@betting_zone".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = RelayAppConfig::default();
        assert_eq!(config.relay.flush_interval_secs, 60);
        assert_eq!(config.relay.flush_interval(), Duration::from_secs(60));
        assert!(!config.relay.retain_after_send);
        assert_eq!(config.telegram.bot_token_ref, "RELAY_BOT_TOKEN");
        assert_eq!(config.telegram.api_base_url, "https://api.telegram.org");
        assert_eq!(config.telegram.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_default_requires_destination() {
        let err = RelayAppConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("relay.destination"));
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = valid_config();
        config.relay.flush_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("flush_interval_secs"));
    }

    #[test]
    fn test_zero_poll_timeout_rejected() {
        let mut config = valid_config();
        config.telegram.poll_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let mut config = valid_config();
        config.telegram.request_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"));
    }

    #[test]
    fn test_destination_parsing() {
        let mut relay = RelayConfig::default();
        relay.destination = "-1001234567890".to_string();
        assert_eq!(relay.destination_chat_id().unwrap(), ChatId::Id(-1001234567890));

        relay.destination = "@betting_zone".to_string();
        assert_eq!(
            relay.destination_chat_id().unwrap(),
            ChatId::Username("@betting_zone".to_string())
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RelayAppConfig = toml::from_str(
            r#"
            [relay]
            destination = "@news"
            "#,
        )
        .unwrap();
        assert_eq!(config.relay.destination, "@news");
        assert_eq!(config.relay.flush_interval_secs, 60);
        assert_eq!(config.telegram.poll_timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [telegram]
            bot_token_ref = "MY_TOKEN"
            poll_timeout_secs = 10

            [relay]
            destination = "-100987"
            flush_interval_secs = 300
            retain_after_send = true
            "#
        )
        .unwrap();

        let config = RelayAppConfig::load(file.path()).unwrap();
        assert_eq!(config.telegram.bot_token_ref, "MY_TOKEN");
        assert_eq!(config.telegram.poll_timeout_secs, 10);
        assert_eq!(config.relay.flush_interval_secs, 300);
        assert!(config.relay.retain_after_send);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RelayAppConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[relay\ndestination = ").unwrap();
        let err = RelayAppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_resolve_token() {
        std::env::set_var("TEST_RELAY_TOKEN_OK", "123:ABC");
        let config = TelegramConfig {
            bot_token_ref: "TEST_RELAY_TOKEN_OK".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolve_token().unwrap(), "123:ABC");
        std::env::remove_var("TEST_RELAY_TOKEN_OK");
    }

    #[test]
    fn test_resolve_token_missing() {
        let config = TelegramConfig {
            bot_token_ref: "NONEXISTENT_RELAY_TOKEN_XYZ".to_string(),
            ..Default::default()
        };
        let err = config.resolve_token().unwrap_err();
        assert!(err.to_string().contains("NONEXISTENT_RELAY_TOKEN_XYZ"));
    }

    #[test]
    fn test_resolve_token_empty() {
        std::env::set_var("TEST_RELAY_TOKEN_EMPTY", "  ");
        let config = TelegramConfig {
            bot_token_ref: "TEST_RELAY_TOKEN_EMPTY".to_string(),
            ..Default::default()
        };
        let err = config.resolve_token().unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
        std::env::remove_var("TEST_RELAY_TOKEN_EMPTY");
    }
}
