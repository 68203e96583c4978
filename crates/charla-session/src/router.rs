//! Push-or-fallback delivery for outgoing messages.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use charla_api::PersistenceApi;
use charla_core::{ChatError, ConversationKey, Envelope, Result, Role};

use crate::connection::ConnectionManager;
use crate::store::MessageStore;

/// Routes each outgoing message over the live channel when one is open for
/// the target conversation, and over request/response otherwise.
pub struct DeliveryRouter {
    manager: Arc<ConnectionManager>,
    api: Arc<dyn PersistenceApi>,
    store: Arc<MessageStore>,
}

impl DeliveryRouter {
    /// Build a router over the given connection manager, API, and store.
    pub fn new(
        manager: Arc<ConnectionManager>,
        api: Arc<dyn PersistenceApi>,
        store: Arc<MessageStore>,
    ) -> Self {
        Self {
            manager,
            api,
            store,
        }
    }

    /// Send `content` to the conversation `key` as `sender`.
    ///
    /// Channel path: the envelope goes out fire-and-forget and nothing is
    /// appended locally; the relay echoes the message back as an inbound
    /// push, ids included. Fallback path: one request/response call; on
    /// success the canonical message is appended; on failure the error is
    /// surfaced and the message is neither retried nor queued.
    pub async fn send(&self, key: ConversationKey, content: &str, sender: Role) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyContent);
        }
        let envelope = Envelope::new(key, content, sender);

        if let Some(tx) = self.manager.frame_sender(key).await {
            let frame = serde_json::to_string(&envelope)
                .map_err(|e| ChatError::Send(format!("encode: {e}")))?;
            counter!("charla_channel_sends_total").increment(1);
            if let Err(e) = tx.try_send(frame) {
                // Fire-and-forget: a full or just-closed channel drops the
                // frame; the transport-loss path flips state to Closed and
                // future sends take the fallback.
                warn!(%key, error = %e, "channel send dropped");
            }
            debug!(%key, "message sent over channel");
            return Ok(());
        }

        counter!("charla_fallback_sends_total").increment(1);
        let canonical = self.api.send(&envelope).await?;
        let _ = self.store.append(key, canonical).await;
        debug!(%key, "message sent over fallback");
        Ok(())
    }
}
