//! `dg-codec` — interface descriptions and call payload encoding.
//!
//! This crate provides:
//! - [`idl`]: parse an interface description into a checked [`Schema`].
//! - [`selector`]: 4-byte method selectors (`keccak256("<name>()")[..4]`).
//! - [`wire`]: `selector || cbor(args)` call payloads and CBOR results.
//! - [`envelope`]: the `nonce || public_key || ciphertext` confidential frame.
//! - [`deploy_header`]: the header prepended to deployed bytecode.
//! - [`coder`]: plaintext and confidential [`Coder`]s used by services.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dg_codec::{build_schema, wire};
//!
//! let schema = build_schema(&idl_json)?;
//! let the = schema.get("the").unwrap();
//! let data = wire::encode_call(the, the.selector, &args)?;
//! let call = wire::decode_call(&data)?;
//! assert_eq!(call.selector.to_hex(), "ddefa4ab");
//! ```

pub mod coder;
pub mod deploy_header;
pub mod envelope;
pub mod idl;
pub mod selector;
pub mod wire;

// Re-exports for convenience.
pub use coder::{Coder, ConfidentialCoder, PlaintextCoder};
pub use deploy_header::{DeployHeader, DeployHeaderBody};
pub use envelope::{Aead, AeadKeys, Nonce, PrivateKey, PublicKey};
pub use idl::{build_schema, Idl, MethodSignature, Schema, Type};
pub use selector::{keccak256, Selector, SELECTOR_LEN};
pub use wire::{decode_call, encode_call, DecodedCall};
