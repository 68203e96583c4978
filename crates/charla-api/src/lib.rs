//! # charla-api
//!
//! Persistence-service client for the charla messaging core.
//!
//! The four request/response operations (directory fetch, history fetch,
//! fallback send, mark-read) live behind the [`PersistenceApi`] trait so
//! the session crate can run against in-memory fakes; [`HttpPersistence`]
//! is the `reqwest` implementation against the real backend. The
//! [`endpoint`] module builds the connectable address for the real-time
//! channel.
//!
//! Every call carries the bearer credential from the session context;
//! 401/403 responses map to [`charla_core::ChatError::Auth`] for all
//! operations alike.

#![deny(unsafe_code)]

pub mod api;
pub mod endpoint;
pub mod http;

pub use api::PersistenceApi;
pub use endpoint::channel_url;
pub use http::HttpPersistence;
