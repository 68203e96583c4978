//! # charla-settings
//!
//! Configuration management with layered sources for the charla messaging
//! core.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CharlaSettings::default()`]
//! 2. **File**: a JSON file deep-merged over defaults
//! 3. **Environment variables**: `CHARLA_*` overrides (highest priority)
//!
//! There is no global singleton: the host constructs a [`CharlaSettings`]
//! once and passes it into the components that need it, the same way the
//! session context is passed.

#![deny(unsafe_code)]

pub mod errors;
pub mod types;

pub use errors::{Result, SettingsError};
pub use types::{ApiSettings, CharlaSettings, ReconnectSettings};

use std::path::Path;

use serde_json::Value;

/// Deep-merge `overlay` onto `base`.
///
/// Objects merge recursively; any other value in `overlay` replaces the
/// corresponding `base` value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (k, v) in overlay_map {
                let merged = match base_map.remove(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => v,
                };
                let _ = base_map.insert(k, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from an optional file path, then apply env overrides.
///
/// A missing file is not an error; defaults are used. A present but
/// malformed file is an error: silently ignoring a typo'd config hides
/// misrouted traffic.
pub fn load_settings(path: Option<&Path>) -> Result<CharlaSettings> {
    let defaults = serde_json::to_value(CharlaSettings::default())?;
    let merged = match path {
        Some(p) if p.exists() => {
            let raw = std::fs::read_to_string(p)?;
            let file: Value = serde_json::from_str(&raw)?;
            tracing::debug!(path = %p.display(), "settings file loaded");
            deep_merge(defaults, file)
        }
        Some(p) => {
            tracing::debug!(path = %p.display(), "settings file absent, using defaults");
            defaults
        }
        None => defaults,
    };
    let mut settings: CharlaSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

/// Apply `CHARLA_*` overrides read through `lookup`.
///
/// Split out from [`load_settings`] so the override logic is testable
/// without mutating process environment.
fn apply_overrides(settings: &mut CharlaSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("CHARLA_API_URL") {
        settings.api.base_url = v;
    }
    if let Some(v) = lookup("CHARLA_WS_URL") {
        settings.api.ws_base_url = v;
    }
    if let Some(v) = lookup("CHARLA_HTTP_TIMEOUT_MS")
        && let Ok(ms) = v.parse()
    {
        settings.api.timeout_ms = ms;
    }
    if let Some(v) = lookup("CHARLA_RECONNECT_ENABLED")
        && let Ok(b) = v.parse()
    {
        settings.reconnect.enabled = b;
    }
    if let Some(v) = lookup("CHARLA_RECONNECT_MAX_ATTEMPTS")
        && let Ok(n) = v.parse()
    {
        settings.reconnect.max_attempts = n;
    }
}
