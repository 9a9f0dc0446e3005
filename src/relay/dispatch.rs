//! Flushing buffered content to the destination channel

use super::store::ContentStore;
use crate::channels::{ChannelAdapter, ChatId, OutboundMessage};
use crate::error::Result;
use crate::scheduler::ScheduledJob;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Counts from one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Send calls made
    pub attempted: usize,
    /// Sends that succeeded
    pub delivered: usize,
    /// Sends that failed
    pub failed: usize,
    /// The flush did not run because another one was in flight
    pub skipped: bool,
}

impl FlushReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }
}

/// Republishes the buffer to a single destination.
///
/// Each item gets exactly one send attempt per flush, in buffer order. A
/// failed send is logged and the flush moves on. Delivered items are dropped
/// from the buffer unless `retain_after_send` is set; failed ones stay for
/// the next flush.
pub struct FlushDispatcher {
    store: Arc<ContentStore>,
    adapter: Arc<dyn ChannelAdapter>,
    destination: ChatId,
    retain_after_send: bool,
    in_flight: Mutex<()>,
}

impl FlushDispatcher {
    pub fn new(
        store: Arc<ContentStore>,
        adapter: Arc<dyn ChannelAdapter>,
        destination: ChatId,
    ) -> Self {
        Self {
            store,
            adapter,
            destination,
            retain_after_send: false,
            in_flight: Mutex::new(()),
        }
    }

    /// Keep delivered items in the buffer (they are resent every flush)
    pub fn retain_after_send(mut self, retain: bool) -> Self {
        self.retain_after_send = retain;
        self
    }

    pub fn destination(&self) -> &ChatId {
        &self.destination
    }

    /// Send every buffered item to the destination
    pub async fn flush(&self) -> FlushReport {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::warn!("Previous send still in progress, skipping this run");
            return FlushReport::skipped();
        };

        let snapshot = self.store.snapshot().await;
        if snapshot.is_empty() {
            tracing::info!("No content to send.");
            return FlushReport::default();
        }

        let now = Utc::now();
        let mut report = FlushReport::default();
        for stored in snapshot {
            let kind = stored.kind();
            let message = OutboundMessage::from_item(self.destination.clone(), stored.item());
            report.attempted += 1;

            match self.adapter.send_message(message).await {
                Ok(_) => {
                    report.delivered += 1;
                    tracing::info!(
                        destination = %self.destination,
                        payload = stored.item().payload(),
                        buffered_secs = stored.buffered_for(now).num_seconds(),
                        "Sent {} to the channel",
                        kind
                    );
                    if !self.retain_after_send {
                        self.store.remove(stored.seq()).await;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(seq = stored.seq(), error = %e, "Error sending {}", kind);
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "Flush complete"
        );
        report
    }
}

#[async_trait]
impl ScheduledJob for FlushDispatcher {
    fn name(&self) -> &str {
        "flush"
    }

    async fn run(&self) -> Result<()> {
        self.flush().await;
        Ok(())
    }
}
