//! In-memory content buffer
//!
//! Holds content waiting to be republished, in the order it arrived. The
//! store is shared between ingestion and dispatch through an `Arc`; every
//! operation takes the lock once, so appends, clears and snapshots never
//! interleave.

use crate::channels::FileRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::RwLock;

/// Kind of buffered content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Photo,
    Video,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentKind::Text => "text",
            ContentKind::Photo => "photo",
            ContentKind::Video => "video",
        })
    }
}

/// One piece of content to republish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    /// Raw message text
    Text(String),
    /// Platform handle of the photo
    Photo(FileRef),
    /// Platform handle of the video
    Video(FileRef),
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentItem::Text(_) => ContentKind::Text,
            ContentItem::Photo(_) => ContentKind::Photo,
            ContentItem::Video(_) => ContentKind::Video,
        }
    }

    /// The text, or the media handle
    pub fn payload(&self) -> &str {
        match self {
            ContentItem::Text(text) => text,
            ContentItem::Photo(file_id) | ContentItem::Video(file_id) => file_id.as_str(),
        }
    }
}

/// An item as held by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    seq: u64,
    item: ContentItem,
    stored_at: DateTime<Utc>,
}

impl StoredItem {
    /// Store-assigned sequence number, increasing in append order
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn item(&self) -> &ContentItem {
        &self.item
    }

    pub fn kind(&self) -> ContentKind {
        self.item.kind()
    }

    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    /// How long the item had been buffered at `now`
    pub fn buffered_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.stored_at).max(chrono::Duration::zero())
    }
}

/// Point-in-time copy of the store contents, oldest first
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    items: Vec<StoredItem>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StoredItem> {
        self.items.iter()
    }
}

impl IntoIterator for Snapshot {
    type Item = StoredItem;
    type IntoIter = std::vec::IntoIter<StoredItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a StoredItem;
    type IntoIter = std::slice::Iter<'a, StoredItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

struct StoreInner {
    items: VecDeque<StoredItem>,
    next_seq: u64,
}

/// Ordered, unbounded content buffer
pub struct ContentStore {
    inner: RwLock<StoreInner>,
}

impl ContentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                items: VecDeque::new(),
                next_seq: 0,
            }),
        }
    }

    /// Append an item at the back, returning its sequence number
    pub async fn append(&self, item: ContentItem) -> u64 {
        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.items.push_back(StoredItem {
            seq,
            item,
            stored_at: Utc::now(),
        });
        seq
    }

    /// Copy of the current contents in insertion order
    pub async fn snapshot(&self) -> Snapshot {
        let inner = self.inner.read().await;
        Snapshot {
            items: inner.items.iter().cloned().collect(),
        }
    }

    /// Remove everything, returning how many items were dropped
    pub async fn clear(&self) -> usize {
        let mut inner = self.inner.write().await;
        let removed = inner.items.len();
        inner.items.clear();
        removed
    }

    /// Remove a single item by sequence number.
    ///
    /// Returns `false` if the item is no longer buffered (already removed
    /// or cleared).
    pub async fn remove(&self, seq: u64) -> bool {
        let mut inner = self.inner.write().await;
        // sequence numbers are pushed in increasing order, so the deque stays sorted
        match inner.items.binary_search_by_key(&seq, |i| i.seq) {
            Ok(index) => inner.items.remove(index).is_some(),
            Err(_) => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.items.is_empty()
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ContentItem {
        ContentItem::Text(s.to_string())
    }

    #[test]
    fn test_item_kind_and_payload() {
        assert_eq!(text("hi").kind(), ContentKind::Text);
        assert_eq!(text("hi").payload(), "hi");
        let photo = ContentItem::Photo(FileRef::new("p1"));
        assert_eq!(photo.kind(), ContentKind::Photo);
        assert_eq!(photo.payload(), "p1");
        assert_eq!(ContentItem::Video(FileRef::new("v1")).kind().to_string(), "video");
    }

    #[tokio::test]
    async fn test_snapshot_preserves_append_order() {
        let store = ContentStore::new();
        let items: Vec<ContentItem> = (0..25)
            .map(|i| match i % 3 {
                0 => text(&format!("t{i}")),
                1 => ContentItem::Photo(FileRef::new(format!("p{i}"))),
                _ => ContentItem::Video(FileRef::new(format!("v{i}"))),
            })
            .collect();
        for item in &items {
            store.append(item.clone()).await;
        }

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), items.len());
        let seen: Vec<ContentItem> = snapshot.into_iter().map(|s| s.item().clone()).collect();
        assert_eq!(seen, items);
    }

    #[tokio::test]
    async fn test_buffered_age() {
        let store = ContentStore::new();
        store.append(ContentItem::Text("a".to_string())).await;
        let stored = store.snapshot().await.into_iter().next().unwrap();

        let later = stored.stored_at() + chrono::Duration::seconds(90);
        assert_eq!(stored.buffered_for(later).num_seconds(), 90);

        // clock skew never yields a negative age
        let earlier = stored.stored_at() - chrono::Duration::seconds(5);
        assert_eq!(stored.buffered_for(earlier), chrono::Duration::zero());
    }

    #[tokio::test]
    async fn test_sequence_numbers_increase() {
        let store = ContentStore::new();
        let a = store.append(text("a")).await;
        let b = store.append(text("b")).await;
        store.clear().await;
        let c = store.append(text("c")).await;
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn test_clear_empties_store() {
        let store = ContentStore::new();
        store.append(text("a")).await;
        store.append(ContentItem::Photo(FileRef::new("p"))).await;

        assert_eq!(store.clear().await, 2);
        assert!(store.snapshot().await.is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_on_empty_store() {
        let store = ContentStore::new();
        assert_eq!(store.clear().await, 0);
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_is_isolated_from_later_mutation() {
        let store = ContentStore::new();
        store.append(text("a")).await;
        let snapshot = store.snapshot().await;

        store.append(text("b")).await;
        store.clear().await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.iter().next().unwrap().item(), &text("a"));
    }

    #[tokio::test]
    async fn test_remove_by_sequence() {
        let store = ContentStore::new();
        let a = store.append(text("a")).await;
        let b = store.append(text("b")).await;
        let c = store.append(text("c")).await;

        assert!(store.remove(b).await);
        assert!(!store.remove(b).await);

        let remaining: Vec<u64> = store.snapshot().await.iter().map(|s| s.seq()).collect();
        assert_eq!(remaining, vec![a, c]);
    }

    #[tokio::test]
    async fn test_remove_after_clear_is_noop() {
        let store = ContentStore::new();
        let a = store.append(text("a")).await;
        store.clear().await;
        assert!(!store.remove(a).await);
        assert_eq!(store.len().await, 0);
    }
}
