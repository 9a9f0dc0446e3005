//! Buffer-and-flush relay
//!
//! [`IngestHandler`] appends inbound content to a shared [`ContentStore`];
//! [`FlushDispatcher`] periodically republishes the buffer to the
//! destination channel.

mod command;
mod dispatch;
mod ingest;
mod store;

pub use command::Command;
pub use dispatch::{FlushDispatcher, FlushReport};
pub use ingest::{Acknowledgement, IngestHandler};
pub use store::{ContentItem, ContentKind, ContentStore, Snapshot, StoredItem};
