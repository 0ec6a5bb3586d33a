//! Gateway configuration
//!
//! Defaults are the compiled-in contract; overriding the key or debounce
//! window is meant for hosts that run more than one document per origin, and
//! for tests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Storage key owned exclusively by the gateway
pub const STORAGE_KEY: &str = "fieldv1.state";
/// Quiet period before a pending save is written
pub const SAVE_DEBOUNCE_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Key the envelope is stored under
    pub key: String,
    /// Debounce window in milliseconds
    pub debounce_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            key: STORAGE_KEY.to_string(),
            debounce_ms: SAVE_DEBOUNCE_MS,
        }
    }
}

impl GatewayConfig {
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = debounce.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
