//! Coders turn method calls into transaction data and result bytes back
//! into values. The plaintext coder is the wire codec as-is; the
//! confidential coder wraps both directions in an envelope.

use std::sync::Arc;

use dg_domain::error::Result;
use dg_domain::value::Value;

use crate::envelope::{self, Aead, AeadKeys, Nonce};
use crate::idl::MethodSignature;
use crate::wire::{self, DecodedCall};

pub trait Coder: Send + Sync {
    /// Encode a call, checking arity first.
    fn encode(&self, signature: &MethodSignature, args: &[Value]) -> Result<Vec<u8>>;

    /// Decode the output bytes of a call.
    fn decode_output(&self, output: &[u8]) -> Result<Value>;

    /// Decode call data produced by [`Coder::encode`].
    fn decode_call(&self, data: &[u8]) -> Result<DecodedCall>;

    fn is_confidential(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextCoder;

impl Coder for PlaintextCoder {
    fn encode(&self, signature: &MethodSignature, args: &[Value]) -> Result<Vec<u8>> {
        wire::encode_call(signature, signature.selector, args)
    }

    fn decode_output(&self, output: &[u8]) -> Result<Value> {
        wire::decode_value(output)
    }

    fn decode_call(&self, data: &[u8]) -> Result<DecodedCall> {
        wire::decode_call(data)
    }
}

/// Encrypts calls to the service's public key and opens its results.
#[derive(Clone)]
pub struct ConfidentialCoder {
    aead: Arc<dyn Aead>,
    keys: AeadKeys,
}

impl ConfidentialCoder {
    pub fn new(aead: Arc<dyn Aead>, keys: AeadKeys) -> Self {
        Self { aead, keys }
    }

    pub fn keys(&self) -> &AeadKeys {
        &self.keys
    }
}

impl Coder for ConfidentialCoder {
    fn encode(&self, signature: &MethodSignature, args: &[Value]) -> Result<Vec<u8>> {
        let plaintext = wire::encode_call(signature, signature.selector, args)?;
        envelope::encrypt(
            self.aead.as_ref(),
            &Nonce::random(),
            &plaintext,
            &self.keys.peer_public_key,
            &self.keys.public_key,
            &self.keys.private_key,
        )
    }

    fn decode_output(&self, output: &[u8]) -> Result<Value> {
        if output.is_empty() {
            return Ok(Value::Null);
        }
        let opened = envelope::decrypt(self.aead.as_ref(), output, &self.keys.private_key)?;
        wire::decode_value(&opened.plaintext)
    }

    fn decode_call(&self, data: &[u8]) -> Result<DecodedCall> {
        let opened = envelope::decrypt(self.aead.as_ref(), data, &self.keys.private_key)?;
        wire::decode_call(&opened.plaintext)
    }

    fn is_confidential(&self) -> bool {
        true
    }
}
