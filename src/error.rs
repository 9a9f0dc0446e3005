//! Channel Relay error types

use thiserror::Error;

/// Channel Relay error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inbound content matched none of text, photo or video
    #[error("Unsupported content type")]
    UnsupportedContent,

    /// `/store` was issued without any text to store
    #[error("No content supplied to store")]
    EmptyInput,

    /// Channel adapter error
    #[error("Channel error: {0}")]
    Channel(String),

    /// Telegram Bot API rejected a request
    #[error("Telegram API error: {0}")]
    Telegram(String),

    /// Telegram Bot API asked us to back off
    #[error("Rate limited by Telegram, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Scheduler error
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Gateway lifecycle error
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether this error came from talking to the chat platform.
    ///
    /// Transport faults are isolated to the item or update that caused them
    /// and are never fatal to the process.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Channel(_) | Error::Telegram(_) | Error::RateLimited { .. } | Error::Http(_)
        )
    }
}

/// Result type alias for Channel Relay operations
pub type Result<T> = std::result::Result<T, Error>;
