//! [`Provider`] backed by the developer gateway.
//!
//! Submissions are plain request/response calls that return an id; their
//! outcomes arrive on the service poll queue. Log subscriptions get a queue
//! of their own, each with its own polling instance.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use dg_domain::config::GatewayConfig;
use dg_domain::error::{Error, Result};
use dg_domain::value::{from_hex, to_hex};

use crate::api::{
    DeployServiceRequest, Event, ExecuteServiceRequest, GetPublicKeyRequest, IdResponse,
    SubscribeRequest, DEPLOY_API, PUBLIC_KEY_API, SERVICE_EXECUTE_API, SUBSCRIBE_API,
};
use crate::http::{Http, HttpSession};
use crate::polling::{PollingConfig, PollingRegistry, PollingService, Subscription};
use crate::provider::{Provider, SendRequest, Submission};

pub struct DeveloperGateway {
    url: String,
    http: Arc<dyn Http>,
    interval: Duration,
    response_timeout: Option<Duration>,
    registry: Arc<PollingRegistry>,
    polling: Arc<PollingService>,
    /// Queue id of the most recent subscription.
    active_queue: Mutex<Option<u64>>,
}

impl DeveloperGateway {
    /// Connect over HTTP, sharing polling instances process-wide.
    pub fn new(cfg: &GatewayConfig) -> Result<Self> {
        let http: Arc<dyn Http> = Arc::new(HttpSession::new(cfg)?);
        Ok(Self::with_http(cfg, http, PollingRegistry::global()))
    }

    /// Use a custom transport and registry.
    ///
    /// The gateway routes outcomes by session, so submissions must go out on
    /// the session that polls for them. When `registry` already polls this
    /// URL, its session is adopted and `http` is unused.
    pub fn with_http(cfg: &GatewayConfig, http: Arc<dyn Http>, registry: Arc<PollingRegistry>) -> Self {
        let url = cfg.url.trim_end_matches('/').to_owned();
        let interval = cfg.poll_interval();
        let polling = registry.instance(PollingConfig {
            url: url.clone(),
            session: http,
            interval,
            queue_id: None,
        });
        let http = Arc::clone(polling.session());
        Self {
            url,
            http,
            interval,
            response_timeout: cfg.response_timeout(),
            registry,
            polling,
            active_queue: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Polling instance of the service queue.
    pub fn polling(&self) -> &Arc<PollingService> {
        &self.polling
    }

    pub fn active_queue(&self) -> Option<u64> {
        *self.active_queue.lock()
    }

    /// Submit a call to the service at `address`.
    pub async fn execute(&self, address: &str, data: &[u8]) -> Result<Submission> {
        let req = ExecuteServiceRequest {
            address: address.to_owned(),
            data: to_hex(data),
        };
        let id = self.post_for_id(SERVICE_EXECUTE_API, &req).await?;
        tracing::debug!(id, address, bytes = data.len(), "execute submitted");
        Ok(Submission { id })
    }

    /// Submit deploy data (header, code and constructor arguments).
    pub async fn deploy(&self, data: &[u8]) -> Result<Submission> {
        let req = DeployServiceRequest { data: to_hex(data) };
        let id = self.post_for_id(DEPLOY_API, &req).await?;
        tracing::debug!(id, bytes = data.len(), "deploy submitted");
        Ok(Submission { id })
    }

    /// Wait for the outcome of submission `id` on the service queue.
    pub async fn wait(&self, id: u64) -> Result<Event> {
        match self.response_timeout {
            Some(timeout) => self.polling.response_timeout(id, timeout).await,
            None => self.polling.response(id).await,
        }
    }

    async fn post_for_id<T: Serialize>(&self, api: &str, req: &T) -> Result<u64> {
        let body = serde_json::to_value(req)?;
        let raw = self.http.post(api, body).await?;
        let resp: IdResponse = serde_json::from_value(raw)
            .map_err(|e| Error::Http(format!("failed to parse {api} response: {e}")))?;
        Ok(resp.id)
    }
}

#[async_trait]
impl Provider for DeveloperGateway {
    async fn send(&self, req: SendRequest) -> Result<Submission> {
        match req.address {
            Some(ref address) => self.execute(address, &req.data).await,
            None => self.deploy(&req.data).await,
        }
    }

    async fn response(&self, id: u64) -> Result<Event> {
        self.wait(id).await
    }

    async fn public_key(&self, address: &str) -> Result<Option<Vec<u8>>> {
        let req = GetPublicKeyRequest {
            address: address.to_owned(),
        };
        let id = self.post_for_id(PUBLIC_KEY_API, &req).await?;
        match self.wait(id).await? {
            Event::Service(event) => event.public_key.as_deref().map(from_hex).transpose(),
            Event::Error(event) => Err(Error::Gateway {
                code: event.cause.error_code,
                description: event.cause.description,
            }),
            Event::Log(_) => Err(Error::Decode(format!(
                "unexpected log event for public key request {id}"
            ))),
        }
    }

    async fn subscribe(&self, address: &str, topic: &str) -> Result<Subscription> {
        let queue_id = self
            .post_for_id(SUBSCRIBE_API, &SubscribeRequest::logs(address, topic))
            .await?;

        let previous = self.active_queue.lock().replace(queue_id);
        if let Some(previous) = previous.filter(|q| *q != queue_id) {
            tracing::warn!(previous, queue_id, "replacing active subscription queue");
        }

        let polling = self.registry.instance(PollingConfig {
            url: self.url.clone(),
            session: Arc::clone(&self.http),
            interval: self.interval,
            queue_id: Some(queue_id),
        });
        tracing::debug!(queue_id, address, topic, "subscribed to logs");
        Ok(polling.subscribe())
    }
}
