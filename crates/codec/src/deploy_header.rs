//! Deploy header prepended to service bytecode.
//!
//! Layout: `0x00 's' 'i' 's' || version (u16 BE) || body length (u16 BE) || JSON body`.
//! Code without the prefix is treated as header-less.

use serde::{Deserialize, Serialize};

use dg_domain::error::{Error, Result};

pub const DEPLOY_HEADER_PREFIX: [u8; 4] = [0x00, b's', b'i', b's'];
pub const DEPLOY_HEADER_VERSION: u16 = 1;

const FIXED_LEN: usize = DEPLOY_HEADER_PREFIX.len() + 2 + 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployHeaderBody {
    /// Unix timestamp after which the service expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidential: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployHeader {
    pub version: u16,
    pub body: DeployHeaderBody,
}

impl DeployHeader {
    pub fn new(body: DeployHeaderBody) -> Self {
        Self {
            version: DEPLOY_HEADER_VERSION,
            body,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(&self.body)?;
        let len = u16::try_from(body.len())
            .map_err(|_| Error::Format(format!("deploy header body too large: {} bytes", body.len())))?;

        let mut out = Vec::with_capacity(FIXED_LEN + body.len());
        out.extend_from_slice(&DEPLOY_HEADER_PREFIX);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Prepend this header to `code`. Any header already on `code` is
    /// replaced.
    pub fn write(&self, code: &[u8]) -> Result<Vec<u8>> {
        let mut out = self.to_bytes()?;
        out.extend_from_slice(Self::strip(code)?);
        Ok(out)
    }

    /// Read the header at the front of `code`, if there is one.
    pub fn read(code: &[u8]) -> Result<Option<Self>> {
        Ok(Self::split(code)?.map(|(header, _)| header))
    }

    /// `code` with any header removed.
    pub fn strip(code: &[u8]) -> Result<&[u8]> {
        Ok(match Self::split(code)? {
            Some((_, rest)) => rest,
            None => code,
        })
    }

    fn split(code: &[u8]) -> Result<Option<(Self, &[u8])>> {
        if !code.starts_with(&DEPLOY_HEADER_PREFIX) {
            return Ok(None);
        }
        if code.len() < FIXED_LEN {
            return Err(Error::Format(format!(
                "deploy header truncated: {} bytes",
                code.len()
            )));
        }
        let version = u16::from_be_bytes([code[4], code[5]]);
        let len = u16::from_be_bytes([code[6], code[7]]) as usize;
        let end = FIXED_LEN + len;
        if code.len() < end {
            return Err(Error::Format(format!(
                "deploy header body needs {len} bytes, only {} present",
                code.len() - FIXED_LEN
            )));
        }
        let body: DeployHeaderBody = serde_json::from_slice(&code[FIXED_LEN..end])
            .map_err(|e| Error::Format(format!("deploy header body: {e}")))?;
        Ok(Some((Self { version, body }, &code[end..])))
    }
}
