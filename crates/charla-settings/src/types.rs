//! Settings types with compiled defaults.

use serde::{Deserialize, Serialize};

/// Top-level settings for the messaging core.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CharlaSettings {
    /// Endpoints and HTTP behavior of the persistence service.
    pub api: ApiSettings,
    /// Channel-loss reconnect policy.
    pub reconnect: ReconnectSettings,
}

/// Persistence-service endpoints and HTTP client behavior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiSettings {
    /// Base URL for request/response calls.
    pub base_url: String,
    /// Base URL for the real-time channel (ws/wss scheme).
    pub ws_base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            ws_base_url: "ws://localhost:8000".into(),
            timeout_ms: 30_000,
        }
    }
}

/// Bounded exponential backoff for re-opening a dropped channel.
///
/// Applies only to abnormal loss of the currently selected conversation's
/// channel; explicit unbinds and conversation switches never reconnect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconnectSettings {
    /// Whether to retry a dropped channel at all.
    pub enabled: bool,
    /// Maximum number of attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the first attempt, in milliseconds. Doubles per attempt.
    pub base_delay_ms: u64,
    /// Upper bound on the per-attempt delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = CharlaSettings::default();
        assert_eq!(s.api.base_url, "http://localhost:8000");
        assert_eq!(s.api.ws_base_url, "ws://localhost:8000");
        assert_eq!(s.api.timeout_ms, 30_000);
        assert!(s.reconnect.enabled);
        assert_eq!(s.reconnect.max_attempts, 5);
        assert_eq!(s.reconnect.base_delay_ms, 500);
        assert_eq!(s.reconnect.max_delay_ms, 10_000);
    }

    #[test]
    fn partial_json_fills_from_defaults() {
        let s: CharlaSettings =
            serde_json::from_str(r#"{"api": {"baseUrl": "https://salud.example"}}"#).unwrap();
        assert_eq!(s.api.base_url, "https://salud.example");
        assert_eq!(s.api.timeout_ms, 30_000);
        assert!(s.reconnect.enabled);
    }
}
