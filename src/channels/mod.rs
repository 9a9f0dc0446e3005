//! Chat platform adapters
//!
//! The relay only talks to its chat platform through [`ChannelAdapter`]:
//! inbound messages arrive as [`ChannelEvent`]s and every outbound send,
//! channel post or acknowledgement reply, is an [`OutboundMessage`].

mod adapter;
mod message;
mod telegram;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{AdapterBase, AdapterStatus, ChannelAdapter, ChannelEvent};
pub use message::{
    ChatId, FileRef, InboundMessage, OutboundContent, OutboundMessage, PhotoVariant,
};
pub use telegram::{BotApi, BotUser, TelegramAdapter, Update};
