//! `dg-gateway` — developer gateway client.
//!
//! Provides the [`Http`] transport trait with a `reqwest` implementation
//! ([`HttpSession`]), the gateway's JSON [`api`], the offset-based
//! [`polling`] engine that correlates asynchronous results with their
//! callers, and [`DeveloperGateway`], the [`Provider`] the service facade
//! submits calls through.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use dg_domain::config::GatewayConfig;
//! use dg_gateway::{DeveloperGateway, Provider, SendRequest};
//!
//! # async fn example() -> dg_domain::error::Result<()> {
//! let gateway = DeveloperGateway::new(&GatewayConfig::default())?;
//! let submission = gateway
//!     .send(SendRequest {
//!         data: vec![0xd0, 0x9d, 0xe0, 0x8a, 0x80],
//!         address: Some("0x5c7b...".into()),
//!     })
//!     .await?;
//! let event = gateway.response(submission.id).await?;
//! println!("{event:?}");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod developer;
pub mod http;
pub mod polling;
pub mod provider;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use api::{ErrorEvent, Event, LogEvent, LogRecord, PollServiceResponse, ServiceEvent};
pub use developer::DeveloperGateway;
pub use http::{from_reqwest, Http, HttpSession};
pub use polling::{
    LoopState, PollingConfig, PollingKey, PollingRegistry, PollingService, Subscription,
};
pub use provider::{Provider, SendRequest, Submission};
