use crate::value::{args_json, Value};

/// Shared error type used across all devgate crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    /// The injected transport failed. Fatal to every request pending on the
    /// affected polling instance.
    #[error("transport: {0}")]
    Transport(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// The interface description could not be turned into a schema.
    #[error("schema: {0}")]
    Schema(String),

    /// A generated method was called with the wrong number of arguments.
    /// Carries the rejected arguments so callers can see what they sent.
    #[error("Invalid arguments {}", args_json(.args))]
    ArgumentCount { args: Vec<Value> },

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// Malformed call or result bytes.
    #[error("decode: {0}")]
    Decode(String),

    /// Malformed framing (confidential envelope, deploy header, hex).
    #[error("format: {0}")]
    Format(String),

    /// The gateway answered a call with an error event.
    #[error("gateway error {code}: {description}")]
    Gateway { code: i64, description: String },

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
