//! Shared fixtures: the test IDL, an in-memory developer gateway, and a
//! provider that only captures transaction data.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::{json, Value as Json};

use dg_codec::envelope::{self, Aead, Nonce, PrivateKey, PublicKey, KEY_LEN, NONCE_LEN};
use dg_codec::wire::encode_value;
use dg_domain::config::GatewayConfig;
use dg_domain::error::{Error, Result};
use dg_domain::value::{to_hex, Value};
use dg_gateway::api::{SERVICE_POLL_API, SUBSCRIBE_API, SUBSCRIBE_POLL_API};
use dg_gateway::{DeveloperGateway, Event, Http, PollingRegistry, Provider, SendRequest, ServiceEvent, Submission};

pub fn idl() -> Json {
    serde_json::from_str(include_str!("../fixtures/test_contract.json")).unwrap()
}

/// A `DefTy` value.
pub fn def_ty() -> Value {
    let word = |last: u8| {
        let mut b = vec![0u8; 32];
        b[31] = last;
        Value::Bytes(b)
    };
    let mut short = vec![0u8; 20];
    short[19] = 3;
    Value::Map(vec![
        (Value::Text("f1".into()), Value::Integer(1.into())),
        (
            Value::Text("f3".into()),
            Value::Map(vec![(Value::Text("test".into()), Value::Integer(0.into()))]),
        ),
        (
            Value::Text("f4".into()),
            Value::Array(vec![word(1), word(2), Value::Bytes(short)]),
        ),
    ])
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Capturing provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Records every submission and answers each with an empty service event.
#[derive(Default)]
pub struct TxDataProvider {
    pub sent: Mutex<Vec<SendRequest>>,
}

#[async_trait]
impl Provider for TxDataProvider {
    async fn send(&self, req: SendRequest) -> Result<Submission> {
        let mut sent = self.sent.lock();
        sent.push(req);
        Ok(Submission {
            id: sent.len() as u64 - 1,
        })
    }

    async fn response(&self, id: u64) -> Result<Event> {
        Ok(Event::Service(ServiceEvent {
            id,
            ..Default::default()
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory gateway
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Builds a [`DeveloperGateway`] whose HTTP layer answers from scripts.
///
/// Every submission (execute, deploy, getPublicKey) takes the next id, and
/// the service event at that position answers it.
#[derive(Default)]
pub struct GatewayBuilder {
    service_events: Vec<Json>,
    log_events: Vec<Json>,
    close_logs: bool,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deploy(mut self, address: &str) -> Self {
        self.service_events.push(json!({ "address": address }));
        self
    }

    pub fn public_key(mut self, key: Option<&[u8]>) -> Self {
        self.service_events.push(match key {
            Some(key) => json!({ "publicKey": to_hex(key) }),
            None => json!({}),
        });
        self
    }

    pub fn rpc(self, output: &Value) -> Self {
        let raw = encode_value(output).unwrap();
        self.rpc_raw(&raw)
    }

    pub fn rpc_raw(mut self, output: &[u8]) -> Self {
        self.service_events.push(json!({ "output": to_hex(output) }));
        self
    }

    pub fn error(mut self, code: i64, description: &str) -> Self {
        self.service_events
            .push(json!({ "cause": { "errorCode": code, "description": description } }));
        self
    }

    pub fn subscribe(mut self, event: &Value) -> Self {
        let record = json!({ "data": to_hex(&encode_value(event).unwrap()) });
        self.log_events
            .push(json!({ "data": hex::encode(record.to_string()) }));
        self
    }

    /// Fail log polls once the scripted logs are used up.
    pub fn close_logs(mut self) -> Self {
        self.close_logs = true;
        self
    }

    pub fn gateway(self) -> (Arc<DeveloperGateway>, Arc<MockHttp>) {
        let http = Arc::new(MockHttp {
            service_events: self.service_events,
            log_events: self.log_events,
            close_logs: self.close_logs,
            next_id: AtomicU64::new(0),
            requests: Mutex::new(Vec::new()),
        });
        let cfg = GatewayConfig {
            url: "http://gateway.test".into(),
            poll_interval_ms: 100,
            ..Default::default()
        };
        let gateway = DeveloperGateway::with_http(&cfg, http.clone(), Arc::new(PollingRegistry::new()));
        (Arc::new(gateway), http)
    }
}

pub struct MockHttp {
    service_events: Vec<Json>,
    log_events: Vec<Json>,
    close_logs: bool,
    next_id: AtomicU64,
    pub requests: Mutex<Vec<(String, Json)>>,
}

impl MockHttp {
    fn page(events: &[Json], body: &Json) -> Json {
        let offset = body["offset"].as_u64().unwrap_or(0);
        match events.get(offset as usize) {
            Some(event) => {
                let mut event = event.clone();
                event["id"] = json!(offset);
                json!({ "offset": offset, "events": [event] })
            }
            None => json!({ "offset": offset, "events": null }),
        }
    }

    pub fn requests_to(&self, api: &str) -> Vec<Json> {
        self.requests
            .lock()
            .iter()
            .filter(|(a, _)| a == api)
            .map(|(_, b)| b.clone())
            .collect()
    }
}

#[async_trait]
impl Http for MockHttp {
    async fn request(&self, _method: Method, api: &str, body: Json) -> Result<Json> {
        self.requests.lock().push((api.to_owned(), body.clone()));
        let offset = body["offset"].as_u64().unwrap_or(0) as usize;
        if api == SUBSCRIBE_POLL_API && self.close_logs && offset >= self.log_events.len() {
            return Err(Error::Http("subscription queue closed".into()));
        }
        Ok(match api {
            SERVICE_POLL_API => Self::page(&self.service_events, &body),
            SUBSCRIBE_POLL_API => Self::page(&self.log_events, &body),
            SUBSCRIBE_API => json!({ "id": 0 }),
            _ => json!({ "id": self.next_id.fetch_add(1, Ordering::SeqCst) }),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Confidential fixtures
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// XOR "cipher" keyed on the nonce. Symmetric, so either side can open.
pub struct XorAead;

impl Aead for XorAead {
    fn seal(
        &self,
        nonce: &Nonce,
        plaintext: &[u8],
        _ad: &[u8],
        _peer: &PublicKey,
        _sk: &PrivateKey,
    ) -> Result<Vec<u8>> {
        Ok(plaintext
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ nonce.0[i % NONCE_LEN])
            .collect())
    }

    fn open(
        &self,
        nonce: &Nonce,
        ciphertext: &[u8],
        ad: &[u8],
        peer: &PublicKey,
        sk: &PrivateKey,
    ) -> Result<Vec<u8>> {
        self.seal(nonce, ciphertext, ad, peer, sk)
    }
}

pub const CLIENT_PUBLIC_KEY: PublicKey = PublicKey([1; KEY_LEN]);
pub const SERVICE_PUBLIC_KEY: PublicKey = PublicKey([2; KEY_LEN]);

pub fn client_private_key() -> PrivateKey {
    PrivateKey([9; KEY_LEN])
}

/// What a confidential service would return for `value`.
pub fn sealed_output(value: &Value) -> Vec<u8> {
    envelope::encrypt(
        &XorAead,
        &Nonce([5; NONCE_LEN]),
        &encode_value(value).unwrap(),
        &CLIENT_PUBLIC_KEY,
        &SERVICE_PUBLIC_KEY,
        &PrivateKey([7; KEY_LEN]),
    )
    .unwrap()
}
