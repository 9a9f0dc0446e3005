//! Channel Relay - buffer content sent to a bot and republish it to a channel
//!
//! Users send text, photos or videos to the bot in a private chat. Each item
//! is acknowledged and buffered in memory; on a fixed timer the buffer is
//! republished, in arrival order, to a single destination channel.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Channel Relay Gateway                       │
//! │                                                                  │
//! │   ┌──────────────────┐  ChannelEvent  ┌──────────────────────┐   │
//! │   │ TelegramAdapter  │───────────────▶│    IngestHandler     │   │
//! │   │  getUpdates      │                │  classify + ack      │   │
//! │   │  sendMessage     │◀─── reply ─────│  /store  /restore    │   │
//! │   │  sendPhoto/Video │                └──────────┬───────────┘   │
//! │   └────────▲─────────┘                           │ append/clear  │
//! │            │                          ┌──────────▼───────────┐   │
//! │            │                          │     ContentStore     │   │
//! │            │                          └──────────┬───────────┘   │
//! │            │ send to destination                 │ snapshot      │
//! │   ┌────────┴─────────┐   every tick   ┌──────────▼───────────┐   │
//! │   │ FlushDispatcher  │◀───────────────│  IntervalScheduler   │   │
//! │   └──────────────────┘                └──────────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`gateway`]: process-level owner of the buffer and lifecycle
//! - [`relay`]: content buffer, ingestion and flushing
//! - [`scheduler`]: fixed-interval job runner
//! - [`channels`]: chat platform adapters (Telegram)
//! - [`config`]: configuration management

pub mod channels;
pub mod config;
pub mod error;
pub mod gateway;
pub mod relay;
pub mod scheduler;

pub use config::RelayAppConfig;
pub use error::{Error, Result};
