//! In-memory adapter for exercising the relay without a network

use super::adapter::{AdapterBase, AdapterStatus, ChannelAdapter, ChannelEvent};
use super::message::{InboundMessage, OutboundContent, OutboundMessage};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Records every send and fails the ones matching `fail_when`.
pub struct RecordingAdapter {
    base: AdapterBase,
    sent: Mutex<Vec<OutboundMessage>>,
    fail_when: Box<dyn Fn(&OutboundMessage) -> bool + Send + Sync>,
    send_delay: Option<Duration>,
    fail_next_start: AtomicBool,
    event_tx: Mutex<Option<mpsc::Sender<ChannelEvent>>>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self {
            base: AdapterBase::new("recording"),
            sent: Mutex::new(Vec::new()),
            fail_when: Box::new(|_| false),
            send_delay: None,
            fail_next_start: AtomicBool::new(false),
            event_tx: Mutex::new(None),
        }
    }

    /// Fail sends whose message matches `predicate`
    pub fn failing(predicate: impl Fn(&OutboundMessage) -> bool + Send + Sync + 'static) -> Self {
        Self {
            fail_when: Box::new(predicate),
            ..Self::new()
        }
    }

    /// Fail every photo send
    pub fn failing_photos() -> Self {
        Self::failing(|m| matches!(m.content, OutboundContent::Photo(_)))
    }

    /// Sleep before completing each send
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    /// Refuse the first `start` call
    pub fn fail_first_start(self) -> Self {
        self.fail_next_start.store(true, Ordering::SeqCst);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Everything sent so far, failures included
    pub async fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Text of every text message sent so far
    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|m| match &m.content {
                OutboundContent::Text(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    /// Feed an inbound message as if the platform delivered it
    pub async fn inject(&self, message: InboundMessage) -> Result<()> {
        let tx = self
            .event_tx
            .lock()
            .await
            .clone()
            .ok_or_else(|| Error::Channel("Recording adapter not started".to_string()))?;
        tx.send(ChannelEvent::Message(message))
            .await
            .map_err(|e| Error::Channel(format!("Event channel closed: {}", e)))
    }
}

#[async_trait]
impl ChannelAdapter for RecordingAdapter {
    fn name(&self) -> &str {
        self.base.name()
    }

    async fn start(&self, event_tx: mpsc::Sender<ChannelEvent>) -> Result<()> {
        if self.fail_next_start.swap(false, Ordering::SeqCst) {
            return Err(Error::Channel("Unauthorized".to_string()));
        }
        *self.event_tx.lock().await = Some(event_tx);
        self.base.set_status(AdapterStatus::Running);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if let Some(event_tx) = self.event_tx.lock().await.take() {
            let _ = event_tx.try_send(ChannelEvent::Disconnected {
                channel: "recording".to_string(),
                reason: "Adapter stopped".to_string(),
            });
        }
        self.base.set_status(AdapterStatus::Stopped);
        Ok(())
    }

    async fn send_message(&self, message: OutboundMessage) -> Result<String> {
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        let failed = (self.fail_when)(&message);
        let mut sent = self.sent.lock().await;
        sent.push(message);
        if failed {
            return Err(Error::Telegram("Bad Request: wrong file identifier".to_string()));
        }
        Ok(sent.len().to_string())
    }

    fn is_connected(&self) -> bool {
        self.base.is_running()
    }
}
