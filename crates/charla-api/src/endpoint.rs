//! Transport address builder.
//!
//! Given the two participant IDs, yields the connectable address for the
//! conversation's bidirectional real-time channel. The bearer token rides
//! as a query parameter because browser-style WebSocket clients cannot set
//! headers, and the backend authenticates the upgrade from the query.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use charla_core::ConversationKey;

/// Build the WebSocket URL for `key`.
pub fn channel_url(ws_base: &str, key: ConversationKey, token: &str) -> String {
    let token = utf8_percent_encode(token, NON_ALPHANUMERIC);
    format!(
        "{}/mensajes/{}/{}?token={}",
        ws_base.trim_end_matches('/'),
        key.patient,
        key.clinician,
        token
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_expected_url() {
        let url = channel_url("ws://localhost:8000", ConversationKey::new(7, 3), "tok123");
        assert_eq!(url, "ws://localhost:8000/mensajes/7/3?token=tok123");
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let url = channel_url("wss://salud.example/", ConversationKey::new(1, 2), "t");
        assert_eq!(url, "wss://salud.example/mensajes/1/2?token=t");
    }

    #[test]
    fn token_is_percent_encoded() {
        let url = channel_url("ws://h", ConversationKey::new(1, 2), "a+b/c");
        assert!(url.ends_with("?token=a%2Bb%2Fc"));
    }
}
