use serde::{Deserialize, Serialize};
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Developer gateway connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "d_gw_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Fixed session key. A random one is generated per client when unset.
    #[serde(default)]
    pub session_key: Option<String>,
    /// Per HTTP request timeout.
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
    /// Delay between polls that returned no events.
    #[serde(default = "d_1000")]
    pub poll_interval_ms: u64,
    /// Upper bound on how long a call waits for its result event.
    /// `None` waits forever.
    #[serde(default)]
    pub response_timeout_ms: Option<u64>,
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: d_gw_url(),
            api_key: None,
            session_key: None,
            timeout_ms: 30_000,
            poll_interval_ms: 1000,
            response_timeout_ms: None,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_gw_url() -> String {
    "http://localhost:1234".into()
}
fn d_30000() -> u64 {
    30_000
}
fn d_1000() -> u64 {
    1000
}
