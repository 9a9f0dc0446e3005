//! Message types shared by channel adapters and the relay

use crate::error::{Error, Result};
use crate::relay::ContentItem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A chat the bot can talk to.
///
/// Telegram accepts either the numeric id or, for public channels, the
/// `@username`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Username(String),
}

impl FromStr for ChatId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(id) = s.parse::<i64>() {
            return Ok(ChatId::Id(id));
        }
        if s.len() > 1 && s.starts_with('@') && !s.contains(char::is_whitespace) {
            return Ok(ChatId::Username(s.to_string()));
        }
        Err(Error::Config(format!(
            "Invalid chat id '{}': expected a number or @username",
            s
        )))
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{}", id),
            ChatId::Username(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId::Id(id)
    }
}

/// Opaque media handle issued by the chat platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRef(String);

impl FileRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One resolution of an inbound photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoVariant {
    pub file_id: FileRef,
    pub width: u32,
    pub height: u32,
}

impl PhotoVariant {
    pub fn new(file_id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            file_id: FileRef::new(file_id),
            width,
            height,
        }
    }

    fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Message received from a channel
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Chat the message arrived in (replies go here)
    pub chat_id: ChatId,
    /// Platform message id
    pub message_id: i64,
    /// Sender user id, absent for anonymous channel posts
    pub sender_id: Option<i64>,
    /// Text body
    pub text: Option<String>,
    /// Photo variants in the order the platform listed them
    pub photo: Vec<PhotoVariant>,
    /// Video handle
    pub video: Option<FileRef>,
    /// Unix timestamp in seconds
    pub timestamp: i64,
}

impl InboundMessage {
    /// Create an empty message in the chat with numeric id `chat_id`
    pub fn new(chat_id: i64, message_id: i64) -> Self {
        Self {
            chat_id: ChatId::Id(chat_id),
            message_id,
            sender_id: None,
            text: None,
            photo: Vec::new(),
            video: None,
            timestamp: 0,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_photo(mut self, photo: Vec<PhotoVariant>) -> Self {
        self.photo = photo;
        self
    }

    pub fn with_video(mut self, file_id: impl Into<String>) -> Self {
        self.video = Some(FileRef::new(file_id));
        self
    }

    /// Highest-resolution photo variant. Ties go to the later entry.
    pub fn largest_photo(&self) -> Option<&PhotoVariant> {
        self.photo.iter().max_by_key(|p| p.pixels())
    }
}

/// Payload of an outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundContent {
    Text(String),
    Photo(FileRef),
    Video(FileRef),
}

/// Message to send to a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub content: OutboundContent,
    /// Message id to thread the reply under
    pub reply_to: Option<i64>,
}

impl OutboundMessage {
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self::with_content(chat_id, OutboundContent::Text(text.into()))
    }

    pub fn photo(chat_id: ChatId, file_id: FileRef) -> Self {
        Self::with_content(chat_id, OutboundContent::Photo(file_id))
    }

    pub fn video(chat_id: ChatId, file_id: FileRef) -> Self {
        Self::with_content(chat_id, OutboundContent::Video(file_id))
    }

    /// Republish a buffered item
    pub fn from_item(chat_id: ChatId, item: &ContentItem) -> Self {
        match item {
            ContentItem::Text(text) => Self::text(chat_id, text.clone()),
            ContentItem::Photo(file_id) => Self::photo(chat_id, file_id.clone()),
            ContentItem::Video(file_id) => Self::video(chat_id, file_id.clone()),
        }
    }

    /// Thread this message as a reply
    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    fn with_content(chat_id: ChatId, content: OutboundContent) -> Self {
        Self {
            chat_id,
            content,
            reply_to: None,
        }
    }
}
