//! Developer gateway API: endpoint paths and JSON payloads.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Endpoints
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const SERVICE_EXECUTE_API: &str = "v0/api/service/execute";
pub const DEPLOY_API: &str = "v0/api/service/deploy";
pub const PUBLIC_KEY_API: &str = "v0/api/service/getPublicKey";
pub const SERVICE_POLL_API: &str = "v0/api/service/poll";
pub const SUBSCRIBE_API: &str = "v0/api/event/subscribe";
pub const SUBSCRIBE_POLL_API: &str = "v0/api/event/poll";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Requests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Execute a call on a deployed service. `data` is `0x`-hex.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteServiceRequest {
    pub address: String,
    pub data: String,
}

/// Deploy a service. `data` is `0x`-hex of header + code + constructor args.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeployServiceRequest {
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetPublicKeyRequest {
    pub address: String,
}

/// Open a subscription queue for log events matching `filter`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscribeRequest {
    pub events: Vec<String>,
    pub filter: String,
}

impl SubscribeRequest {
    /// Logs emitted by `address` with the given topic (hex).
    pub fn logs(address: &str, topic: &str) -> Self {
        Self {
            events: vec!["logs".into()],
            filter: format!("address={address}&topics={topic}"),
        }
    }
}

/// Body of a poll on either the service queue or a subscription queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PollRequest {
    pub offset: u64,
    pub discard_previous: bool,
    /// Subscription queue id; absent for the service queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Responses
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Returned by execute, deploy, getPublicKey (correlation id) and
/// subscribe (queue id).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdResponse {
    pub id: u64,
}

/// One page of a poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollServiceResponse {
    /// Cursor for the next poll.
    pub offset: u64,
    #[serde(default)]
    pub events: Option<Vec<Event>>,
}

impl PollServiceResponse {
    /// Events of this page; `None` and `[]` both mean "nothing yet".
    pub fn into_events(self) -> Vec<Event> {
        self.events.unwrap_or_default()
    }
}

/// An item on a poll queue.
///
/// Variant order matters for untagged decoding: the error and log shapes
/// have a required field the service shape lacks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Event {
    Error(ErrorEvent),
    Log(LogEvent),
    Service(ServiceEvent),
}

impl Event {
    /// Correlation id assigned by the gateway when the request was accepted.
    pub fn id(&self) -> u64 {
        match self {
            Event::Error(e) => e.id,
            Event::Log(e) => e.id,
            Event::Service(e) => e.id,
        }
    }
}

/// Outcome of an execute, deploy or getPublicKey request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEvent {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// `0x`-hex of the encoded return value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// A subscription item; `data` is hex of a JSON log record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEvent {
    pub id: u64,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEvent {
    pub id: u64,
    pub cause: ErrorCause,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCause {
    pub error_code: i64,
    pub description: String,
}

/// The JSON record carried (hex-encoded) in [`LogEvent::data`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    /// `0x`-hex of the CBOR-encoded event.
    pub data: String,
}
