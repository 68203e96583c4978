//! The [`PersistenceApi`] trait, the request/response seam.

use async_trait::async_trait;

use charla_core::{Conversation, ConversationKey, Envelope, Message, Result, Role};

/// The request/response operations the messaging core consumes.
///
/// Implemented by [`crate::HttpPersistence`] for the real backend and by
/// in-memory fakes in the session crate's tests.
#[async_trait]
pub trait PersistenceApi: Send + Sync {
    /// Fetch all conversations where the authenticated viewer is a
    /// participant, in server order.
    async fn conversations(&self) -> Result<Vec<Conversation>>;

    /// Fetch the ordered message history for one conversation.
    async fn history(&self, key: ConversationKey) -> Result<Vec<Message>>;

    /// Fallback send: persist `envelope` over request/response and return
    /// the canonical message with its server-assigned id and timestamp.
    async fn send(&self, envelope: &Envelope) -> Result<Message>;

    /// Clear the viewer's unread counter for one conversation.
    async fn mark_read(&self, key: ConversationKey, viewer: Role) -> Result<()>;
}
