//! Per-conversation ordered message log.

use std::collections::HashMap;

use metrics::counter;
use tokio::sync::RwLock;
use tracing::debug;

use charla_core::{ConversationKey, Message};

/// Session-scoped message log, keyed by conversation.
///
/// The visible order of each log is arrival order: history-load order,
/// then channel-push order, then fallback-append order. No timestamp
/// re-sort is performed.
///
/// All mutation is atomic per key; readers never observe a partial
/// `load_history` or a half-applied append.
pub struct MessageStore {
    logs: RwLock<HashMap<ConversationKey, Vec<Message>>>,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            logs: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the entire log for `key` with the server-provided history.
    ///
    /// Full replace, not merge: a reload discards any interim state.
    pub async fn load_history(&self, key: ConversationKey, messages: Vec<Message>) {
        let mut logs = self.logs.write().await;
        debug!(%key, count = messages.len(), "history loaded into store");
        let _ = logs.insert(key, messages);
    }

    /// Append one message at the tail of `key`'s log.
    ///
    /// Idempotent on server-assigned IDs: if the message carries an `id`
    /// already present in the log, the call is a no-op (covers relay
    /// replays and the channel echo of a fallback-sent message). Messages
    /// without an `id` are always appended.
    ///
    /// Returns `true` if the message was stored.
    pub async fn append(&self, key: ConversationKey, message: Message) -> bool {
        let mut logs = self.logs.write().await;
        let log = logs.entry(key).or_default();
        if let Some(id) = &message.id
            && log.iter().any(|m| m.id.as_ref() == Some(id))
        {
            counter!("charla_store_duplicates_total").increment(1);
            debug!(%key, %id, "duplicate message suppressed");
            return false;
        }
        counter!("charla_store_appends_total").increment(1);
        log.push(message);
        true
    }

    /// Snapshot of the log for `key`, in visible order.
    pub async fn log(&self, key: ConversationKey) -> Vec<Message> {
        let logs = self.logs.read().await;
        logs.get(&key).cloned().unwrap_or_default()
    }

    /// Number of messages stored for `key`.
    pub async fn len(&self, key: ConversationKey) -> usize {
        let logs = self.logs.read().await;
        logs.get(&key).map_or(0, Vec::len)
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
