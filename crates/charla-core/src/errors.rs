//! The `ChatError` hierarchy.
//!
//! One variant per failure class in the core's contract. List-fetch and
//! send failures are recovered by the user acting again, never by automatic
//! retry; auth failures propagate unchanged from every network call.

use thiserror::Error;

/// Errors surfaced by the messaging core.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Fetching the conversation directory failed.
    #[error("failed to load conversations: {0}")]
    DirectoryLoad(String),

    /// Fetching a conversation's message history failed.
    #[error("failed to load history: {0}")]
    HistoryLoad(String),

    /// The real-time channel failed to open or closed unexpectedly.
    /// Sends fall back to request/response while in this state.
    #[error("connection error: {0}")]
    Connection(String),

    /// The fallback request/response send failed. The message is not
    /// retried or queued; the typed content stays with the caller.
    #[error("send failed: {0}")]
    Send(String),

    /// Clearing the viewer's read marker failed. Logged and tolerated by
    /// the session; the unread counter simply survives until the next
    /// directory load.
    #[error("mark-read failed: {0}")]
    MarkRead(String),

    /// Bearer credential missing, expired, or rejected.
    #[error("authorization failed: {0}")]
    Auth(String),

    /// An inbound frame could not be parsed into a `Message`. Quarantined,
    /// never appended.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Outgoing content was empty or whitespace-only.
    #[error("message content is empty")]
    EmptyContent,
}

/// Convenience alias used throughout the charla crates.
pub type Result<T> = std::result::Result<T, ChatError>;
