//! The caller's identity and credential.
//!
//! The session context is constructed once (from whatever authentication
//! flow the host application runs) and passed explicitly into every
//! component; there is no ambient global auth store.

use crate::types::Role;

/// Identity and bearer credential of the current viewer.
#[derive(Clone, Debug)]
pub struct SessionContext {
    /// Viewer role.
    pub role: Role,
    /// Numeric ID of the viewer (patient or clinician ID space per role).
    pub user_id: i64,
    /// Display name, used as `sender_name` on locally composed messages.
    pub display_name: String,
    /// Bearer credential attached to every network call.
    token: String,
}

impl SessionContext {
    /// Build a session context.
    pub fn new(role: Role, user_id: i64, display_name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            role,
            user_id,
            display_name: display_name.into(),
            token: token.into(),
        }
    }

    /// The raw bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}
