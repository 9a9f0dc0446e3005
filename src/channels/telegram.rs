//! Telegram channel adapter
//!
//! Receives private-chat messages through `getUpdates` long polling and
//! delivers text, photos and videos through the Bot API send methods.

use super::adapter::{AdapterBase, AdapterStatus, ChannelAdapter, ChannelEvent};
use super::message::{
    ChatId, FileRef, InboundMessage, OutboundContent, OutboundMessage, PhotoVariant,
};
use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Retry delay used when Telegram rate limits without saying for how long
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Thin Bot API client
#[derive(Clone)]
pub struct BotApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl BotApi {
    /// Create a client whose requests give up after `request_timeout`
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn from_config(config: &TelegramConfig, token: impl Into<String>) -> Result<Self> {
        Self::new(config.api_base_url.clone(), token, config.request_timeout())
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let mut request = self.client.post(self.method_url(method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // reqwest errors carry the request URL, which embeds the token
        let response = request.send().await.map_err(|e| Error::Http(e.without_url()))?;
        let status = response.status();
        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;

        if body.ok {
            return body
                .result
                .ok_or_else(|| Error::Telegram(format!("{} returned no result", method)));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = body
                .parameters
                .and_then(|p| p.retry_after)
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(Error::RateLimited { retry_after_secs });
        }

        Err(Error::Telegram(
            body.description
                .unwrap_or_else(|| format!("{} failed with HTTP {}", method, status)),
        ))
    }

    /// Identity of the bot owning the token
    pub async fn get_me(&self) -> Result<BotUser> {
        self.call("getMe", &serde_json::json!({}), None).await
    }

    /// Long-poll for new updates
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut body = serde_json::json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = serde_json::json!(offset);
        }
        // overrides the client timeout; leave the server room to answer
        let timeout = Duration::from_secs(timeout_secs + 10);
        self.call("getUpdates", &body, Some(timeout)).await
    }

    /// Send one message, returning its Telegram message id
    pub async fn send(&self, message: &OutboundMessage) -> Result<i64> {
        let (method, body) = send_request(message);
        let sent: SentMessage = self.call(method, &body, None).await?;
        Ok(sent.message_id)
    }
}

/// Bot API method and JSON body for an outbound message
fn send_request(message: &OutboundMessage) -> (&'static str, serde_json::Value) {
    let mut body = serde_json::json!({ "chat_id": message.chat_id });
    let method = match &message.content {
        OutboundContent::Text(text) => {
            body["text"] = serde_json::json!(text);
            "sendMessage"
        }
        OutboundContent::Photo(file_id) => {
            body["photo"] = serde_json::json!(file_id);
            "sendPhoto"
        }
        OutboundContent::Video(file_id) => {
            body["video"] = serde_json::json!(file_id);
            "sendVideo"
        }
    };
    if let Some(reply_to) = message.reply_to {
        body["reply_parameters"] = serde_json::json!({ "message_id": reply_to });
    }
    (method, body)
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Bot identity returned by `getMe`
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

/// One `getUpdates` entry
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    #[serde(default)]
    date: i64,
    chat: TgChat,
    from: Option<TgUser>,
    text: Option<String>,
    photo: Option<Vec<TgPhotoSize>>,
    video: Option<TgVideo>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgPhotoSize {
    file_id: String,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct TgVideo {
    file_id: String,
}

impl From<TgMessage> for InboundMessage {
    fn from(msg: TgMessage) -> Self {
        Self {
            chat_id: ChatId::Id(msg.chat.id),
            message_id: msg.message_id,
            sender_id: msg.from.map(|u| u.id),
            text: msg.text,
            photo: msg
                .photo
                .unwrap_or_default()
                .into_iter()
                .map(|p| PhotoVariant::new(p.file_id, p.width, p.height))
                .collect(),
            video: msg.video.map(|v| FileRef::new(v.file_id)),
            timestamp: msg.date,
        }
    }
}

/// Offset that acknowledges every update in `updates`
fn next_offset(updates: &[Update]) -> Option<i64> {
    updates.iter().map(|u| u.update_id + 1).max()
}

/// Log a failed poll and decide how long to wait before the next one
fn poll_backoff(error: &Error, retry_delay: Duration) -> Duration {
    match error {
        Error::Http(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
            tracing::warn!(error = %e, "Network issue occurred. Retrying...");
            retry_delay
        }
        Error::RateLimited { retry_after_secs } => {
            tracing::warn!(retry_after_secs, "Telegram rate limit hit while polling");
            Duration::from_secs(*retry_after_secs)
        }
        Error::Telegram(description) => {
            tracing::error!("Telegram API error: {}", description);
            retry_delay
        }
        other => {
            tracing::error!("Unexpected error: {}", other);
            retry_delay
        }
    }
}

/// Fetch updates until cancelled, forwarding messages to `event_tx`
async fn poll_loop(
    api: BotApi,
    timeout_secs: u64,
    retry_delay: Duration,
    event_tx: mpsc::Sender<ChannelEvent>,
    cancel: CancellationToken,
) {
    let mut offset: Option<i64> = None;

    loop {
        let polled = tokio::select! {
            _ = cancel.cancelled() => break,
            polled = api.get_updates(offset, timeout_secs) => polled,
        };

        match polled {
            Ok(updates) => {
                if let Some(next) = next_offset(&updates) {
                    offset = Some(next);
                }
                for update in updates {
                    let Some(message) = update.message else {
                        tracing::debug!(
                            update_id = update.update_id,
                            "Ignoring non-message update"
                        );
                        continue;
                    };
                    if event_tx
                        .send(ChannelEvent::Message(message.into()))
                        .await
                        .is_err()
                    {
                        tracing::debug!("Event receiver dropped, ending Telegram poll loop");
                        return;
                    }
                }
            }
            Err(e) => {
                let delay = poll_backoff(&e, retry_delay);
                let _ = event_tx
                    .send(ChannelEvent::Error {
                        channel: "telegram".to_string(),
                        error: e.to_string(),
                    })
                    .await;
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    tracing::debug!("Telegram poll loop stopped");
}

/// Telegram channel adapter
pub struct TelegramAdapter {
    config: TelegramConfig,
    base: AdapterBase,
    api: RwLock<Option<BotApi>>,
    event_tx: Mutex<Option<mpsc::Sender<ChannelEvent>>>,
    cancel: Mutex<Option<CancellationToken>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramAdapter {
    /// Create a new Telegram adapter. The token is resolved on `start`.
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            base: AdapterBase::new("telegram"),
            api: RwLock::new(None),
            event_tx: Mutex::new(None),
            cancel: Mutex::new(None),
            poll_task: Mutex::new(None),
        }
    }

    /// Create an adapter with an already-resolved token
    pub fn with_token(config: TelegramConfig, token: impl Into<String>) -> Result<Self> {
        let api = BotApi::from_config(&config, token)?;
        Ok(Self {
            api: RwLock::new(Some(api)),
            ..Self::new(config)
        })
    }

    async fn api(&self) -> Result<BotApi> {
        if let Some(api) = self.api.read().await.as_ref() {
            return Ok(api.clone());
        }
        let token = self.config.resolve_token()?;
        let api = BotApi::from_config(&self.config, token)?;
        *self.api.write().await = Some(api.clone());
        Ok(api)
    }

    /// Look up the bot identity (used by `doctor`)
    pub async fn get_me(&self) -> Result<BotUser> {
        self.api().await?.get_me().await
    }
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn name(&self) -> &str {
        self.base.name()
    }

    async fn start(&self, event_tx: mpsc::Sender<ChannelEvent>) -> Result<()> {
        if self.base.status() != AdapterStatus::Stopped {
            return Err(Error::Channel("Telegram adapter already started".to_string()));
        }
        self.base.set_status(AdapterStatus::Starting);

        let api = match self.api().await {
            Ok(api) => api,
            Err(e) => {
                self.base.set_status(AdapterStatus::Stopped);
                return Err(e);
            }
        };

        match api.get_me().await {
            Ok(me) => tracing::info!(
                bot_id = me.id,
                username = me.username.as_deref().unwrap_or(&me.first_name),
                "Telegram adapter starting"
            ),
            Err(e) => tracing::warn!(error = %e, "Could not verify bot identity, polling anyway"),
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_loop(
            api,
            self.config.poll_timeout_secs,
            Duration::from_secs(self.config.poll_retry_delay_secs),
            event_tx.clone(),
            cancel.clone(),
        ));
        *self.cancel.lock().await = Some(cancel);
        *self.poll_task.lock().await = Some(task);
        *self.event_tx.lock().await = Some(event_tx.clone());

        let _ = event_tx
            .send(ChannelEvent::Connected {
                channel: "telegram".to_string(),
            })
            .await;

        self.base.set_status(AdapterStatus::Running);

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.base.status() == AdapterStatus::Stopped {
            return Ok(());
        }
        self.base.set_status(AdapterStatus::Stopping);

        if let Some(event_tx) = self.event_tx.lock().await.take() {
            let _ = event_tx
                .send(ChannelEvent::Disconnected {
                    channel: "telegram".to_string(),
                    reason: "Adapter stopped".to_string(),
                })
                .await;
        }

        if let Some(cancel) = self.cancel.lock().await.take() {
            cancel.cancel();
        }
        if let Some(task) = self.poll_task.lock().await.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Telegram poll task ended abnormally");
            }
        }

        self.base.set_status(AdapterStatus::Stopped);

        tracing::info!("Telegram adapter stopped");

        Ok(())
    }

    async fn send_message(&self, message: OutboundMessage) -> Result<String> {
        if !self.base.is_running() {
            return Err(Error::Channel("Telegram adapter not running".to_string()));
        }

        tracing::debug!(chat_id = %message.chat_id, "Sending message to Telegram");

        let api = self.api().await?;
        let message_id = api.send(&message).await?;
        Ok(message_id.to_string())
    }

    fn is_connected(&self) -> bool {
        self.base.is_running()
    }
}
