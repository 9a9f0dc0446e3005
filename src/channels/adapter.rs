//! Channel adapter trait and shared adapter state

use super::message::{InboundMessage, OutboundMessage};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::mpsc;

/// Events emitted by a channel adapter
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A message arrived
    Message(InboundMessage),
    /// The adapter connected to its platform
    Connected { channel: String },
    /// The adapter disconnected
    Disconnected { channel: String, reason: String },
    /// A non-fatal adapter error
    Error { channel: String, error: String },
}

/// Chat platform client used by the relay.
///
/// `start` begins receiving messages and forwards them through `event_tx`;
/// `send_message` delivers one outbound message and returns the platform's
/// message id.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Adapter name (e.g. "telegram")
    fn name(&self) -> &str;

    /// Start receiving messages
    async fn start(&self, event_tx: mpsc::Sender<ChannelEvent>) -> Result<()>;

    /// Stop receiving messages
    async fn stop(&self) -> Result<()>;

    /// Send a text, photo or video message
    async fn send_message(&self, message: OutboundMessage) -> Result<String>;

    /// Whether the adapter is running
    fn is_connected(&self) -> bool;
}

/// Adapter lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdapterStatus {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl AdapterStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => AdapterStatus::Starting,
            2 => AdapterStatus::Running,
            3 => AdapterStatus::Stopping,
            _ => AdapterStatus::Stopped,
        }
    }
}

/// Name and status bookkeeping shared by adapters
#[derive(Debug)]
pub struct AdapterBase {
    name: String,
    status: AtomicU8,
}

impl AdapterBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: AtomicU8::new(AdapterStatus::Stopped as u8),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> AdapterStatus {
        AdapterStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn set_status(&self, status: AdapterStatus) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.status() == AdapterStatus::Running
    }
}
