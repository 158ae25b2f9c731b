//! In-memory acquisition session store
//!
//! Bridges the search step and the later selection tap: up to five ranked
//! choices are stored per conversation, keyed by `(conversation, ordinal)`,
//! and consumed at most once. The store is capacity-bounded; when full, the
//! oldest stored entry is evicted so abandoned searches cannot grow the map
//! for the process lifetime.

use crate::error::{Error, Result};
use crate::types::{ConversationId, SelectionEntry};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type SelectionKey = (ConversationId, u8);

#[derive(Default)]
struct Inner {
    entries: HashMap<SelectionKey, SelectionEntry>,
    // Insertion order, oldest first. May contain keys already taken;
    // eviction skips those.
    order: VecDeque<SelectionKey>,
}

/// Keyed store of pending selections with at-most-once consumption
pub struct SelectionStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl SelectionStore {
    /// Create a store bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Store an entry under `(conversation, ordinal)`, replacing any
    /// previous entry at that key and evicting the oldest entry if the
    /// capacity bound is exceeded. A re-inserted key counts as newly
    /// stored for eviction purposes.
    pub fn put(&self, conversation: ConversationId, ordinal: u8, entry: SelectionEntry) {
        let key = (conversation, ordinal);
        let mut inner = self.lock();
        inner.entries.insert(key, entry);
        // Repeat searches reuse ordinals 0..4, so the key may already sit
        // near the front of the queue (live or left over from a take).
        // Purge it, or eviction would drop the newest entry first.
        inner.order.retain(|k| k != &key);
        inner.order.push_back(key);
        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            if inner.entries.remove(&oldest).is_some() {
                tracing::debug!(
                    conversation = oldest.0,
                    ordinal = oldest.1,
                    "evicted oldest pending selection"
                );
            }
        }
    }

    /// Atomically retrieve and remove the entry at `(conversation, ordinal)`.
    ///
    /// A missing key — never stored, already consumed, or evicted — is a
    /// session error, which also absorbs duplicate taps on the same choice.
    pub fn take(&self, conversation: ConversationId, ordinal: u8) -> Result<SelectionEntry> {
        let mut inner = self.lock();
        inner
            .entries
            .remove(&(conversation, ordinal))
            .ok_or_else(|| Error::Session {
                reason: format!("entry not found for conversation {conversation}, ordinal {ordinal}"),
            })
    }

    /// Number of pending entries currently stored.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the store currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned store mutex means a panic mid-put/take; the map itself
        // is still structurally sound, so keep serving.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
