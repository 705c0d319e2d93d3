//! `dg-service` — call services described by an IDL.
//!
//! A [`Service`] turns every function of an interface description into an
//! [`Rpc`]. Calls are encoded with a [`Coder`](dg_codec::Coder), submitted
//! through a [`Provider`], and resolved when the correlated event arrives.
//! [`deploy`] creates a new service; [`Service::subscribe`] streams its logs.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use dg_domain::config::Config;
//! use dg_domain::value::Value;
//! use dg_gateway::DeveloperGateway;
//! use dg_service::{Service, ServiceOptions};
//!
//! # async fn example(idl: serde_json::Value) -> dg_domain::error::Result<()> {
//! let config = Config::load("devgate.toml")?;
//! let gateway = DeveloperGateway::new(&config.gateway)?;
//! let counter = Service::new(&idl, Some("0x5c7b..."), ServiceOptions::new(Arc::new(gateway)))?;
//!
//! let count = counter.call("increment", vec![]).await?;
//! let total = counter.call("add", vec![Value::Integer(2.into())]).await?;
//! println!("{count:?} {total:?}");
//! # Ok(())
//! # }
//! ```

pub mod deploy;
pub mod service;
pub mod subscribe;

pub use dg_gateway::provider;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use deploy::{deploy, deploy_data, DeployRequest};
pub use provider::{Provider, SendRequest, Submission};
pub use service::{ConfidentialOptions, Rpc, Service, ServiceOptions};
pub use subscribe::topic;
