//! Inbound content handling
//!
//! Classifies each inbound message, buffers it, and answers the sender with
//! exactly one acknowledgement.

use super::command::Command;
use super::store::{ContentItem, ContentKind, ContentStore};
use crate::channels::{ChannelAdapter, InboundMessage, OutboundMessage};
use crate::error::Error;
use std::sync::Arc;

/// Outcome of one ingest call, sent back to the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// An item of this kind was buffered
    Stored(ContentKind),
    /// Nothing the relay can republish
    Unsupported,
    /// `/store` without text
    EmptyInput,
    /// The buffer was reset
    Cleared,
}

impl Acknowledgement {
    /// Reply shown to the sender
    pub fn reply_text(&self) -> &'static str {
        match self {
            Acknowledgement::Stored(ContentKind::Photo) => "Photo stored successfully!",
            Acknowledgement::Stored(ContentKind::Video) => "Video stored successfully!",
            Acknowledgement::Stored(ContentKind::Text) => "Message stored successfully!",
            Acknowledgement::Unsupported => "Unsupported content type.",
            Acknowledgement::EmptyInput => "Please provide a message to store after the command.",
            Acknowledgement::Cleared => "All stored messages have been removed.",
        }
    }

    /// The user-facing failure this acknowledgement reports, if any
    pub fn as_error(&self) -> Option<Error> {
        match self {
            Acknowledgement::Unsupported => Some(Error::UnsupportedContent),
            Acknowledgement::EmptyInput => Some(Error::EmptyInput),
            _ => None,
        }
    }
}

/// Pick what to buffer from a message: photo, then video, then text.
fn classify(message: &InboundMessage) -> Option<ContentItem> {
    if let Some(photo) = message.largest_photo() {
        return Some(ContentItem::Photo(photo.file_id.clone()));
    }
    if let Some(video) = &message.video {
        return Some(ContentItem::Video(video.clone()));
    }
    message.text.clone().map(ContentItem::Text)
}

/// Buffers inbound content and acknowledges it
pub struct IngestHandler {
    store: Arc<ContentStore>,
    adapter: Arc<dyn ChannelAdapter>,
}

impl IngestHandler {
    pub fn new(store: Arc<ContentStore>, adapter: Arc<dyn ChannelAdapter>) -> Self {
        Self { store, adapter }
    }

    /// Buffer the content of an ordinary message
    pub async fn handle_message(&self, message: &InboundMessage) -> Acknowledgement {
        let Some(item) = classify(message) else {
            tracing::info!(
                message_id = message.message_id,
                "Unsupported content type received"
            );
            return Acknowledgement::Unsupported;
        };

        let kind = item.kind();
        let seq = self.store.append(item).await;
        match kind {
            ContentKind::Photo => tracing::info!(seq, "Photo stored successfully."),
            ContentKind::Video => tracing::info!(seq, "Video stored successfully."),
            ContentKind::Text => tracing::info!(seq, "Text message stored successfully."),
        }
        Acknowledgement::Stored(kind)
    }

    /// `/store <text>`: buffer operator-supplied text
    pub async fn handle_store_command(&self, args: &str) -> Acknowledgement {
        let text = args.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return Acknowledgement::EmptyInput;
        }

        let seq = self.store.append(ContentItem::Text(text)).await;
        tracing::info!(seq, "Manual message stored successfully.");
        Acknowledgement::Stored(ContentKind::Text)
    }

    /// `/restore`: drop everything buffered
    pub async fn reset_all(&self) -> Acknowledgement {
        let removed = self.store.clear().await;
        tracing::info!(removed, "All stored messages cleared.");
        Acknowledgement::Cleared
    }

    /// Handle one inbound update end to end: route, buffer, reply.
    pub async fn process(&self, message: &InboundMessage) -> Acknowledgement {
        let command = message.text.as_deref().and_then(Command::parse);
        let ack = match command {
            Some(Command::Store(args)) => self.handle_store_command(&args).await,
            Some(Command::Restore) => self.reset_all().await,
            None => self.handle_message(message).await,
        };

        if let Some(condition) = ack.as_error() {
            tracing::debug!(message_id = message.message_id, "{}", condition);
        }
        self.reply(message, ack).await;
        ack
    }

    async fn reply(&self, message: &InboundMessage, ack: Acknowledgement) {
        let reply = OutboundMessage::text(message.chat_id.clone(), ack.reply_text())
            .reply_to(message.message_id);
        if let Err(e) = self.adapter.send_message(reply).await {
            tracing::error!(
                chat_id = %message.chat_id,
                error = %e,
                "Failed to send acknowledgement"
            );
        }
    }
}
