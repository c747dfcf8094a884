//! Bounded FIFO deduplication cache.
//!
//! Remembers which message ids have already been displayed so that a poll
//! returning overlapping results never shows a line twice. Capacity is fixed;
//! inserting past it evicts the oldest-inserted entry regardless of how often
//! entries are read.
//!
//! Insertion order lives in a `VecDeque` next to the `HashMap` lookup table,
//! so eviction never depends on hash map iteration order.

use std::collections::{HashMap, VecDeque};

use crate::{Message, MessageId};

/// Default number of messages remembered per session.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Bounded insertion-ordered map from message id to message.
#[derive(Debug, Clone)]
pub struct DedupCache {
    capacity: usize,
    /// Ids in insertion order. Front is the oldest.
    order: VecDeque<MessageId>,
    entries: HashMap<MessageId, Message>,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DedupCache {
    /// Create an empty cache. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, order: VecDeque::with_capacity(capacity), entries: HashMap::new() }
    }

    /// Whether `id` is currently held.
    pub fn has(&self, id: &MessageId) -> bool {
        self.entries.contains_key(id)
    }

    /// Cached message for `id`.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.entries.get(id)
    }

    /// Insert a message keyed by its id.
    ///
    /// Returns `false` and leaves the cache untouched if the id is already
    /// present. Otherwise inserts and, if the cache is over capacity, evicts
    /// the oldest-inserted entry.
    pub fn insert(&mut self, message: Message) -> bool {
        if self.entries.contains_key(&message.id) {
            return false;
        }

        self.order.push_back(message.id.clone());
        self.entries.insert(message.id.clone(), message);

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }

        debug_assert_eq!(self.order.len(), self.entries.len());
        true
    }

    /// Number of held entries. Never exceeds [`Self::capacity`].
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest-inserted id, the next eviction candidate.
    pub fn oldest(&self) -> Option<&MessageId> {
        self.order.front()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}
