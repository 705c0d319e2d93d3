use serde::Serialize;

/// Structured trace events emitted across all devgate crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    GatewayRequest {
        api: String,
        status: u16,
        duration_ms: u64,
    },
    PollCompleted {
        url: String,
        queue_id: Option<u64>,
        offset: u64,
        events: usize,
        resolved: usize,
        pending: usize,
    },
    PollFailed {
        url: String,
        queue_id: Option<u64>,
        offset: u64,
        failed_requests: usize,
        reason: String,
    },
    CallSubmitted {
        method: String,
        id: u64,
        payload_bytes: usize,
    },
    CallResolved {
        method: String,
        id: u64,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "dg_event");
    }
}
