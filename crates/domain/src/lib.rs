//! `dg-domain` — shared types for the devgate workspace.
//!
//! Everything the other crates agree on lives here: the shared
//! [`error::Error`], the gateway [`config`], structured [`trace`] events and
//! the dynamic [`value::Value`] used for call arguments and results.

pub mod config;
pub mod error;
pub mod stream;
pub mod trace;
pub mod value;

pub use error::{Error, Result};
pub use value::Value;
