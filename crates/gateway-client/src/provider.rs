//! The submission primitive the service facade is written against.

use async_trait::async_trait;

use dg_domain::error::{Error, Result};

use crate::api::Event;
use crate::polling::Subscription;

/// Transaction data to submit. No address means deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub data: Vec<u8>,
    pub address: Option<String>,
}

/// Receipt for an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    /// Correlation id of the eventual response event.
    pub id: u64,
}

/// Abstraction over whatever accepts calls and later reports their outcome.
///
/// Implementations may talk to the developer gateway or be a test double.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Submit transaction data and return its correlation id.
    async fn send(&self, req: SendRequest) -> Result<Submission>;

    /// Wait for the event carrying `id`.
    async fn response(&self, id: u64) -> Result<Event>;

    /// Public key of the service at `address`. `None` when the service is
    /// not confidential.
    async fn public_key(&self, address: &str) -> Result<Option<Vec<u8>>> {
        Err(Error::Other(format!("public key lookup unsupported for {address}")))
    }

    /// Stream log events matching `topic` emitted by `address`.
    async fn subscribe(&self, address: &str, topic: &str) -> Result<Subscription> {
        let _ = topic;
        Err(Error::Other(format!("subscriptions unsupported for {address}")))
    }
}
