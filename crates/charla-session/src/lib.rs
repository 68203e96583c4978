//! # charla-session
//!
//! The real-time messaging core: one live channel per client session,
//! push-or-fallback delivery, a per-conversation ordered message log, and
//! read-state tracking.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `store` | Ordered, append-only, per-conversation log with duplicate suppression |
//! | `transport` | The connect seam; `WsTransport` is the tokio-tungstenite implementation |
//! | `connection` | Idle/Connecting/Open/Closed state machine owning at most one live channel |
//! | `router` | Push over the open channel, or fall back to request/response |
//! | `directory` | The viewer's conversation list |
//! | `read_marker` | Fires the mark-read call once per selection |
//! | `chat` | [`ChatSession`]: orchestrates `select()` across all of the above |
//!
//! ## Crate Position
//!
//! Top of the stack. Depends on charla-core, charla-settings, charla-api.

#![deny(unsafe_code)]

pub mod chat;
pub mod connection;
pub mod directory;
pub mod read_marker;
pub mod router;
pub mod store;
pub mod transport;

pub use chat::ChatSession;
pub use connection::{ChannelState, ConnectionManager};
pub use directory::ConversationDirectory;
pub use read_marker::ReadReceiptTracker;
pub use router::DeliveryRouter;
pub use store::MessageStore;
pub use transport::{FrameSink, FrameStream, Transport, WsTransport};
