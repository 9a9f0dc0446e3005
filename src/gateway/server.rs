//! Gateway server implementation

use crate::channels::{ChannelAdapter, ChannelEvent, TelegramAdapter};
use crate::config::RelayAppConfig;
use crate::error::{Error, Result};
use crate::relay::{ContentStore, FlushDispatcher, IngestHandler};
use crate::scheduler::IntervalScheduler;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Gateway lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    /// Built, not started yet
    Idle,
    /// Receiving messages and flushing on schedule
    Running,
    /// Shut down; a stopped gateway is not restarted
    Stopped,
}

/// Channel Relay gateway
pub struct Gateway {
    config: RelayAppConfig,
    state: Arc<RwLock<GatewayState>>,
    store: Arc<ContentStore>,
    adapter: Arc<dyn ChannelAdapter>,
    ingest: Arc<IngestHandler>,
    dispatcher: Arc<FlushDispatcher>,
    scheduler: IntervalScheduler,
    event_tx: mpsc::Sender<ChannelEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<ChannelEvent>>>,
    processor: Mutex<Option<JoinHandle<()>>>,
}

impl Gateway {
    /// Create a gateway that talks to the platform through `adapter`
    pub fn new(config: RelayAppConfig, adapter: Arc<dyn ChannelAdapter>) -> Result<Self> {
        config.validate()?;
        let destination = config.relay.destination_chat_id()?;
        let (event_tx, event_rx) = mpsc::channel(1000);

        let store = Arc::new(ContentStore::new());
        let ingest = Arc::new(IngestHandler::new(store.clone(), adapter.clone()));
        let dispatcher = Arc::new(
            FlushDispatcher::new(store.clone(), adapter.clone(), destination)
                .retain_after_send(config.relay.retain_after_send),
        );
        let scheduler = IntervalScheduler::new(dispatcher.clone(), config.relay.flush_interval());

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(GatewayState::Idle)),
            store,
            adapter,
            ingest,
            dispatcher,
            scheduler,
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            processor: Mutex::new(None),
        })
    }

    /// Get current state
    pub async fn state(&self) -> GatewayState {
        *self.state.read().await
    }

    /// Start polling for messages and flushing on schedule
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if *state != GatewayState::Idle {
            return Err(Error::Gateway(format!(
                "Gateway cannot start from state {:?}",
                *state
            )));
        }

        tracing::info!(
            channel = self.adapter.name(),
            destination = %self.dispatcher.destination(),
            interval_secs = self.config.relay.flush_interval_secs,
            "Starting Channel Relay"
        );

        // events queue in the channel until the processor takes the receiver,
        // so a failed start leaves the gateway retryable from Idle
        self.adapter.start(self.event_tx.clone()).await?;
        if let Err(e) = self.scheduler.start().await {
            if let Err(stop_err) = self.adapter.stop().await {
                tracing::warn!("Failed to stop channel {}: {}", self.adapter.name(), stop_err);
            }
            return Err(e);
        }
        self.start_event_processor().await;

        *state = GatewayState::Running;
        tracing::info!("Bot is running.");

        Ok(())
    }

    /// Stop the gateway. In-flight work is abandoned.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if *state != GatewayState::Running {
            return Ok(());
        }

        tracing::info!("Stopping Channel Relay");

        self.scheduler.stop().await;

        if let Err(e) = self.adapter.stop().await {
            tracing::warn!("Failed to stop channel {}: {}", self.adapter.name(), e);
        }

        if let Some(processor) = self.processor.lock().await.take() {
            processor.abort();
            let _ = processor.await;
        }

        *state = GatewayState::Stopped;
        let unsent = self.store.len().await;
        tracing::info!(unsent, "Channel Relay stopped");

        Ok(())
    }

    /// Start the event processor
    async fn start_event_processor(&self) {
        let event_rx = self.event_rx.lock().await.take();
        if let Some(mut rx) = event_rx {
            let ingest = self.ingest.clone();

            let task = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    Self::handle_event(event, &ingest).await;
                }
            });
            *self.processor.lock().await = Some(task);
        }
    }

    /// Handle a channel event
    async fn handle_event(event: ChannelEvent, ingest: &IngestHandler) {
        match event {
            ChannelEvent::Message(message) => {
                tracing::debug!(
                    chat_id = %message.chat_id,
                    message_id = message.message_id,
                    sender_id = ?message.sender_id,
                    "Received message"
                );
                ingest.process(&message).await;
            }
            ChannelEvent::Connected { channel } => {
                tracing::info!("Channel {} connected", channel);
            }
            ChannelEvent::Disconnected { channel, reason } => {
                tracing::warn!("Channel {} disconnected: {}", channel, reason);
            }
            ChannelEvent::Error { channel, error } => {
                tracing::error!("Channel {} error: {}", channel, error);
            }
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RelayAppConfig {
        &self.config
    }

    /// Get the content buffer
    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    /// Get the flush dispatcher
    pub fn dispatcher(&self) -> &Arc<FlushDispatcher> {
        &self.dispatcher
    }

    /// Get the flush scheduler
    pub fn scheduler(&self) -> &IntervalScheduler {
        &self.scheduler
    }

    /// Get the channel adapter
    pub fn adapter(&self) -> &Arc<dyn ChannelAdapter> {
        &self.adapter
    }
}

/// Builder for creating a gateway
pub struct GatewayBuilder {
    config: RelayAppConfig,
    adapter: Option<Arc<dyn ChannelAdapter>>,
}

impl GatewayBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RelayAppConfig::default(),
            adapter: None,
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: RelayAppConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the destination channel
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.config.relay.destination = destination.into();
        self
    }

    /// Set the flush interval
    pub fn flush_interval_secs(mut self, secs: u64) -> Self {
        self.config.relay.flush_interval_secs = secs;
        self
    }

    /// Keep delivered items in the buffer
    pub fn retain_after_send(mut self, retain: bool) -> Self {
        self.config.relay.retain_after_send = retain;
        self
    }

    /// Use a specific channel adapter instead of Telegram
    pub fn adapter(mut self, adapter: Arc<dyn ChannelAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Build the gateway
    pub fn build(self) -> Result<Gateway> {
        let adapter = match self.adapter {
            Some(adapter) => adapter,
            None => Arc::new(TelegramAdapter::new(self.config.telegram.clone())),
        };
        Gateway::new(self.config, adapter)
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
