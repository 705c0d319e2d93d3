//! Call payload encoding: `selector (4 bytes) || cbor([arg0, arg1, ...])`.
//!
//! Arguments are only checked for arity. Their structure is trusted to match
//! the declared types; a mismatch shows up when the service decodes or runs
//! the call, never here.

use dg_domain::error::{Error, Result};
use dg_domain::value::Value;

use crate::idl::MethodSignature;
use crate::selector::{Selector, SELECTOR_LEN};

/// A call pulled back apart by [`decode_call`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCall {
    pub selector: Selector,
    pub args: Vec<Value>,
}

/// Reject a call whose argument count does not match the signature.
pub fn check_arity(signature: &MethodSignature, args: &[Value]) -> Result<()> {
    if args.len() != signature.arity() {
        return Err(Error::ArgumentCount {
            args: args.to_vec(),
        });
    }
    Ok(())
}

/// Encode a call to `signature` with the given arguments.
pub fn encode_call(signature: &MethodSignature, selector: Selector, args: &[Value]) -> Result<Vec<u8>> {
    check_arity(signature, args)?;

    let mut out = Vec::with_capacity(SELECTOR_LEN + 16 * args.len());
    out.extend_from_slice(selector.as_bytes());
    ciborium::ser::into_writer(&Value::Array(args.to_vec()), &mut out)
        .map_err(|e| Error::Decode(format!("cbor encode failed: {e}")))?;
    Ok(out)
}

/// Split a payload into its selector and argument list.
pub fn decode_call(bytes: &[u8]) -> Result<DecodedCall> {
    if bytes.len() < SELECTOR_LEN {
        return Err(Error::Decode(format!(
            "call payload is {} bytes, shorter than the {SELECTOR_LEN}-byte selector",
            bytes.len()
        )));
    }
    let (head, body) = bytes.split_at(SELECTOR_LEN);
    let selector = Selector::from_slice(head)?;

    match decode_value(body)? {
        Value::Array(args) => Ok(DecodedCall { selector, args }),
        other => Err(Error::Decode(format!(
            "call arguments must be a cbor array, got {}",
            dg_domain::value::to_json(&other)
        ))),
    }
}

/// CBOR-encode a single value (constructor arguments, return values).
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out)
        .map_err(|e| Error::Decode(format!("cbor encode failed: {e}")))?;
    Ok(out)
}

/// Decode one CBOR value. An empty input decodes to `Null` (a method with
/// no return value produces no output bytes).
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    ciborium::de::from_reader(bytes).map_err(|e| Error::Decode(format!("cbor decode failed: {e}")))
}
