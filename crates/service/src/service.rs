//! The dynamic service facade.
//!
//! A [`Service`] is built from an IDL and exposes one [`Rpc`] per declared
//! function. Each rpc encodes its arguments, submits them through the
//! [`Provider`], waits for the correlated event and decodes the result.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::BoxFuture;
use serde_json::Value as Json;

use dg_codec::{
    build_schema, Aead, AeadKeys, Coder, ConfidentialCoder, MethodSignature, PlaintextCoder,
    PrivateKey, PublicKey, Schema,
};
use dg_domain::error::{Error, Result};
use dg_domain::trace::TraceEvent;
use dg_domain::value::{from_hex, Value};
use dg_gateway::{Event, Provider, SendRequest};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Options
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Key material for calling a confidential service.
#[derive(Clone)]
pub struct ConfidentialOptions {
    pub aead: Arc<dyn Aead>,
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
    /// The service's key. Fetched from the provider when unset.
    pub peer_public_key: Option<PublicKey>,
}

/// How a [`Service`] reaches its backend and encodes calls.
#[derive(Clone)]
pub struct ServiceOptions {
    pub provider: Arc<dyn Provider>,
    /// Overrides the coder chosen from `confidential`.
    pub coder: Option<Arc<dyn Coder>>,
    pub confidential: Option<ConfidentialOptions>,
}

impl ServiceOptions {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            coder: None,
            confidential: None,
        }
    }

    pub fn coder(mut self, coder: Arc<dyn Coder>) -> Self {
        self.coder = Some(coder);
        self
    }

    pub fn confidential(mut self, confidential: ConfidentialOptions) -> Self {
        self.confidential = Some(confidential);
        self
    }

    fn build_coder(&self) -> Result<Arc<dyn Coder>> {
        if let Some(ref coder) = self.coder {
            return Ok(Arc::clone(coder));
        }
        match self.confidential {
            None => Ok(Arc::new(PlaintextCoder)),
            Some(ref c) => {
                let peer_public_key = c.peer_public_key.ok_or_else(|| {
                    Error::Config("confidential service needs the peer public key; use Service::connect".into())
                })?;
                Ok(Arc::new(ConfidentialCoder::new(
                    Arc::clone(&c.aead),
                    AeadKeys {
                        peer_public_key,
                        public_key: c.public_key,
                        private_key: c.private_key.clone(),
                    },
                )))
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rpc
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

type RpcHandler = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// One callable method of a service.
#[derive(Clone)]
pub struct Rpc {
    signature: Arc<MethodSignature>,
    handler: RpcHandler,
}

impl Rpc {
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// Invoke the method. Fails before any I/O when the argument count is
    /// wrong.
    pub async fn call(&self, args: Vec<Value>) -> Result<Value> {
        (self.handler)(args).await
    }
}

impl std::fmt::Debug for Rpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rpc")
            .field("signature", &self.signature.canonical())
            .finish()
    }
}

/// State shared by every rpc of one service.
pub(crate) struct CallContext {
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) coder: Arc<dyn Coder>,
    pub(crate) address: Option<String>,
}

impl CallContext {
    async fn call(&self, signature: &MethodSignature, args: Vec<Value>) -> Result<Value> {
        let data = self.coder.encode(signature, &args)?;
        let payload_bytes = data.len();
        let start = Instant::now();

        let submission = self
            .provider
            .send(SendRequest {
                data,
                address: self.address.clone(),
            })
            .await?;
        TraceEvent::CallSubmitted {
            method: signature.name.clone(),
            id: submission.id,
            payload_bytes,
        }
        .emit();

        let event = self.provider.response(submission.id).await?;
        let value = self.decode_event(submission.id, event)?;

        TraceEvent::CallResolved {
            method: signature.name.clone(),
            id: submission.id,
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();
        Ok(value)
    }

    fn decode_event(&self, id: u64, event: Event) -> Result<Value> {
        match event {
            Event::Service(event) => match event.output {
                Some(ref output) => self.coder.decode_output(&from_hex(output)?),
                None => Ok(Value::Null),
            },
            Event::Error(event) => Err(Error::Gateway {
                code: event.cause.error_code,
                description: event.cause.description,
            }),
            Event::Log(_) => Err(Error::Decode(format!("request {id} was answered by a log event"))),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Service {
    schema: Arc<Schema>,
    rpcs: BTreeMap<String, Rpc>,
    pub(crate) ctx: Arc<CallContext>,
}

impl Service {
    /// Build the rpc surface for `idl`. Without an address the provider
    /// receives address-less submissions.
    pub fn new(idl: &Json, address: Option<&str>, options: ServiceOptions) -> Result<Self> {
        let schema = Arc::new(build_schema(idl)?);
        let ctx = Arc::new(CallContext {
            provider: Arc::clone(&options.provider),
            coder: options.build_coder()?,
            address: address.map(str::to_owned),
        });

        let rpcs = schema
            .methods
            .values()
            .map(|signature| {
                let signature = Arc::new(signature.clone());
                let handler: RpcHandler = {
                    let ctx = Arc::clone(&ctx);
                    let signature = Arc::clone(&signature);
                    Arc::new(move |args: Vec<Value>| -> BoxFuture<'static, Result<Value>> {
                        let ctx = Arc::clone(&ctx);
                        let signature = Arc::clone(&signature);
                        Box::pin(async move { ctx.call(&signature, args).await })
                    })
                };
                (signature.name.clone(), Rpc { signature, handler })
            })
            .collect();

        tracing::debug!(
            service = %schema.name,
            address = ?address,
            confidential = ctx.coder.is_confidential(),
            "service built"
        );
        Ok(Self { schema, rpcs, ctx })
    }

    /// Like [`Service::new`], first fetching the service's public key when
    /// confidential options leave it unset.
    pub async fn connect(idl: &Json, address: &str, mut options: ServiceOptions) -> Result<Self> {
        if let Some(ref mut c) = options.confidential {
            if c.peer_public_key.is_none() {
                let key = options
                    .provider
                    .public_key(address)
                    .await?
                    .ok_or_else(|| Error::Config(format!("service {address} has no public key")))?;
                c.peer_public_key = Some(PublicKey::from_slice(&key)?);
            }
        }
        Self::new(idl, Some(address), options)
    }

    pub fn address(&self) -> Option<&str> {
        self.ctx.address.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_confidential(&self) -> bool {
        self.ctx.coder.is_confidential()
    }

    pub fn rpc(&self, name: &str) -> Option<&Rpc> {
        self.rpcs.get(name)
    }

    pub fn rpcs(&self) -> &BTreeMap<String, Rpc> {
        &self.rpcs
    }

    pub fn names(&self) -> Vec<&str> {
        self.rpcs.keys().map(String::as_str).collect()
    }

    /// Call the method `name`.
    pub async fn call(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        let rpc = self
            .rpcs
            .get(name)
            .ok_or_else(|| Error::UnknownMethod(name.to_owned()))?;
        rpc.call(args).await
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.schema.name)
            .field("address", &self.ctx.address)
            .field("rpcs", &self.names())
            .finish()
    }
}
