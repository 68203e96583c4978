//! # charla-core
//!
//! Foundation types, branded IDs, and errors for the charla messaging core.
//!
//! This crate provides the shared vocabulary that all other charla crates
//! depend on:
//!
//! - **Branded IDs**: [`ids::PatientId`], [`ids::ClinicianId`],
//!   [`ids::MessageId`], and the [`ids::ConversationKey`] pair
//! - **Records**: [`types::Message`], [`types::Conversation`],
//!   [`types::Envelope`], [`types::Role`]
//! - **Errors**: [`errors::ChatError`] hierarchy via `thiserror`
//! - **Session**: [`session::SessionContext`], the caller's identity and
//!   bearer credential, passed explicitly into every component
//! - **Logging**: [`logging::init_tracing`] for subscriber setup
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other charla crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod session;
pub mod types;

pub use errors::{ChatError, Result};
pub use ids::{ClinicianId, ConversationKey, MessageId, PatientId};
pub use session::SessionContext;
pub use types::{Conversation, Envelope, Message, Role};
