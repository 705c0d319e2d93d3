//! Method selectors: the 4-byte prefix that tells the service which method
//! an encoded call targets.

use std::fmt;

use sha3::{Digest, Keccak256};

use dg_domain::error::{Error, Result};

/// Width of a selector on the wire.
pub const SELECTOR_LEN: usize = 4;

/// Keccak-256 (the pre-standard SHA-3 padding, as used by the gateway).
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    hasher.finalize().into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selector([u8; SELECTOR_LEN]);

impl Selector {
    pub const fn new(bytes: [u8; SELECTOR_LEN]) -> Self {
        Self(bytes)
    }

    /// Selector for a method: `keccak256("<name>()")[..4]`.
    ///
    /// Only the name takes part; argument types are checked by the schema
    /// but do not change the selector.
    pub fn for_method(name: &str) -> Self {
        let digest = keccak256(format!("{name}()"));
        let mut out = [0u8; SELECTOR_LEN];
        out.copy_from_slice(&digest[..SELECTOR_LEN]);
        Self(out)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; SELECTOR_LEN] = bytes.try_into().map_err(|_| {
            Error::Decode(format!(
                "selector must be {SELECTOR_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_slice(&dg_domain::value::from_hex(s)?)
    }

    pub fn as_bytes(&self) -> &[u8; SELECTOR_LEN] {
        &self.0
    }

    /// Lowercase hex without prefix, e.g. `ddefa4ab`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}
