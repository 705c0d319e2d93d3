//! Integration tests for the developer gateway provider, with the HTTP
//! layer replaced by an in-memory gateway.
//!
//! Each scripted service event gets the id of its position in the script,
//! and submissions are handed ids in order, so the n-th submission is
//! answered by the n-th scripted event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::{json, Value};

use dg_domain::config::GatewayConfig;
use dg_domain::error::{Error, Result};
use dg_gateway::api::{
    DEPLOY_API, PUBLIC_KEY_API, SERVICE_EXECUTE_API, SERVICE_POLL_API, SUBSCRIBE_API,
    SUBSCRIBE_POLL_API,
};
use dg_gateway::{DeveloperGateway, Event, Http, PollingRegistry, Provider, SendRequest};

#[derive(Default)]
struct MockGateway {
    service_events: Vec<Value>,
    log_events: Vec<Value>,
    next_id: AtomicU64,
    requests: Mutex<Vec<(String, Value)>>,
}

impl MockGateway {
    fn page(events: &[Value], body: &Value) -> Value {
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

    fn requests_to(&self, api: &str) -> Vec<Value> {
        self.requests
            .lock()
            .iter()
            .filter(|(a, _)| a == api)
            .map(|(_, b)| b.clone())
            .collect()
    }
}

#[async_trait]
impl Http for MockGateway {
    async fn request(&self, _method: Method, api: &str, body: Value) -> Result<Value> {
        self.requests.lock().push((api.to_owned(), body.clone()));
        Ok(match api {
            SERVICE_POLL_API => Self::page(&self.service_events, &body),
            SUBSCRIBE_POLL_API => Self::page(&self.log_events, &body),
            SUBSCRIBE_API => json!({ "id": 0 }),
            _ => json!({ "id": self.next_id.fetch_add(1, Ordering::SeqCst) }),
        })
    }
}

fn config() -> GatewayConfig {
    GatewayConfig {
        url: "http://gateway.test".into(),
        poll_interval_ms: 100,
        ..Default::default()
    }
}

fn gateway(mock: MockGateway) -> (DeveloperGateway, Arc<MockGateway>) {
    gateway_with(mock, config())
}

fn gateway_with(mock: MockGateway, cfg: GatewayConfig) -> (DeveloperGateway, Arc<MockGateway>) {
    let mock = Arc::new(mock);
    let gw = DeveloperGateway::with_http(&cfg, mock.clone(), Arc::new(PollingRegistry::new()));
    (gw, mock)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Submission and correlation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn execute_resolves_through_service_queue() {
    let (gw, mock) = gateway(MockGateway {
        service_events: vec![
            json!({ "address": "0xabc", "output": "0x01" }),
            json!({ "address": "0xabc", "output": "0x02" }),
        ],
        ..Default::default()
    });

    for expected in ["0x01", "0x02"] {
        let submission = gw
            .send(SendRequest {
                data: vec![1, 2],
                address: Some("0xabc".into()),
            })
            .await
            .unwrap();
        match gw.response(submission.id).await.unwrap() {
            Event::Service(event) => assert_eq!(event.output.as_deref(), Some(expected)),
            other => panic!("unexpected event {other:?}"),
        }
    }

    let executes = mock.requests_to(SERVICE_EXECUTE_API);
    assert_eq!(executes.len(), 2);
    assert_eq!(executes[0], json!({ "address": "0xabc", "data": "0x0102" }));

    let polls = mock.requests_to(SERVICE_POLL_API);
    assert_eq!(polls[0], json!({ "offset": 0, "discardPrevious": true }));
    assert_eq!(polls.last().unwrap()["offset"], json!(1));
}

#[tokio::test(start_paused = true)]
async fn send_without_address_deploys() {
    let (gw, mock) = gateway(MockGateway {
        service_events: vec![json!({ "address": "0xdeployed" })],
        ..Default::default()
    });

    let submission = gw
        .send(SendRequest {
            data: vec![0xaa],
            address: None,
        })
        .await
        .unwrap();
    assert_eq!(submission.id, 0);
    assert_eq!(mock.requests_to(DEPLOY_API), vec![json!({ "data": "0xaa" })]);

    match gw.response(0).await.unwrap() {
        Event::Service(event) => assert_eq!(event.address.as_deref(), Some("0xdeployed")),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn response_timeout_from_config() {
    let cfg = GatewayConfig {
        response_timeout_ms: Some(500),
        ..config()
    };
    let (gw, _mock) = gateway_with(MockGateway::default(), cfg);

    let err = gw.response(0).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert_eq!(gw.polling().pending_len(), 1);
}

/// Forwards to a shared gateway and logs which session sent each request.
struct TaggedHttp {
    tag: &'static str,
    gateway: Arc<MockGateway>,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Http for TaggedHttp {
    async fn request(&self, method: Method, api: &str, body: Value) -> Result<Value> {
        self.log.lock().push(format!("{}:{api}", self.tag));
        self.gateway.request(method, api, body).await
    }
}

#[tokio::test(start_paused = true)]
async fn gateways_on_one_url_share_a_session() {
    let mock = Arc::new(MockGateway {
        service_events: vec![json!({ "address": "0xabc", "output": "0x07" })],
        ..Default::default()
    });
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(PollingRegistry::new());
    let session = |tag| -> Arc<dyn Http> {
        Arc::new(TaggedHttp {
            tag,
            gateway: mock.clone(),
            log: log.clone(),
        })
    };
    let a = DeveloperGateway::with_http(&config(), session("A"), registry.clone());
    let b = DeveloperGateway::with_http(&config(), session("B"), registry);
    assert!(Arc::ptr_eq(a.polling(), b.polling()));

    let submission = b
        .send(SendRequest {
            data: vec![7],
            address: Some("0xabc".into()),
        })
        .await
        .unwrap();
    match b.response(submission.id).await.unwrap() {
        Event::Service(event) => assert_eq!(event.output.as_deref(), Some("0x07")),
        other => panic!("unexpected event {other:?}"),
    }

    let log = log.lock();
    assert_eq!(log[0], format!("A:{SERVICE_EXECUTE_API}"));
    assert!(log.iter().all(|entry| entry.starts_with("A:")), "{log:?}");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public keys
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn public_key_present_and_absent() {
    let key = format!("0x{}", "ab".repeat(32));
    let (gw, mock) = gateway(MockGateway {
        service_events: vec![json!({ "address": "0xabc", "publicKey": key }), json!({})],
        ..Default::default()
    });

    assert_eq!(gw.public_key("0xabc").await.unwrap(), Some(vec![0xab; 32]));
    assert_eq!(gw.public_key("0xdef").await.unwrap(), None);
    assert_eq!(
        mock.requests_to(PUBLIC_KEY_API),
        vec![json!({ "address": "0xabc" }), json!({ "address": "0xdef" })]
    );
}

#[tokio::test(start_paused = true)]
async fn error_event_becomes_gateway_error() {
    let (gw, _mock) = gateway(MockGateway {
        service_events: vec![json!({ "cause": { "errorCode": 3, "description": "no such service" } })],
        ..Default::default()
    });

    match gw.public_key("0xabc").await {
        Err(Error::Gateway { code, description }) => {
            assert_eq!(code, 3);
            assert_eq!(description, "no such service");
        }
        other => panic!("expected gateway error, got {other:?}"),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Subscriptions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn subscription_polls_its_own_queue() {
    let (gw, mock) = gateway(MockGateway {
        log_events: vec![json!({ "data": "7b7d" }), json!({ "data": "5b5d" })],
        ..Default::default()
    });

    let mut sub = gw.subscribe("0xabc", "0x01").await.unwrap();
    assert_eq!(gw.active_queue(), Some(0));

    let first = sub.next().await.unwrap().unwrap();
    let second = sub.next().await.unwrap().unwrap();
    assert!(matches!(first, Event::Log(ref e) if e.data == "7b7d"));
    assert!(matches!(second, Event::Log(ref e) if e.data == "5b5d"));

    assert_eq!(
        mock.requests_to(SUBSCRIBE_API),
        vec![json!({ "events": ["logs"], "filter": "address=0xabc&topics=0x01" })]
    );
    let polls = mock.requests_to(SUBSCRIBE_POLL_API);
    assert_eq!(polls[0], json!({ "offset": 0, "discardPrevious": true, "id": 0 }));
    assert!(mock.requests_to(SERVICE_POLL_API).is_empty());

    // no more logs: the loop keeps waiting on the open subscription
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(mock.requests_to(SUBSCRIBE_POLL_API).len() >= 4);
}
