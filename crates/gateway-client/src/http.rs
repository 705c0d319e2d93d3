//! HTTP transport to the developer gateway.
//!
//! Everything above this module talks to the gateway through the [`Http`]
//! trait, so tests (and alternative transports) can stand in for the real
//! network. [`HttpSession`] is the production implementation on `reqwest`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use uuid::Uuid;

use dg_domain::config::GatewayConfig;
use dg_domain::error::{Error, Result};
use dg_domain::trace::TraceEvent;

/// Request/response transport against a gateway.
#[async_trait]
pub trait Http: Send + Sync {
    /// Issue `method` against `api` (a path relative to the gateway URL)
    /// with a JSON body and return the decoded JSON response.
    async fn request(&self, method: Method, api: &str, body: Value) -> Result<Value>;

    async fn post(&self, api: &str, body: Value) -> Result<Value> {
        self.request(Method::POST, api, body).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// reqwest session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A gateway session over HTTP.
///
/// Every request carries the session key, so the gateway can attribute
/// polled events to this client. Requests are never retried here; the
/// polling loop and callers decide what a failure means.
#[derive(Debug, Clone)]
pub struct HttpSession {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    session_key: String,
    timeout: Duration,
}

impl HttpSession {
    pub fn new(cfg: &GatewayConfig) -> Result<Self> {
        let timeout = cfg.timeout();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.url.trim_end_matches('/').to_owned(),
            api_key: cfg.api_key.clone(),
            session_key: cfg
                .session_key
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, api: &str) -> String {
        format!("{}/{}", self.base_url, api.trim_start_matches('/'))
    }

    /// Decorate a `RequestBuilder` with the standard devgate headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let mut rb = rb
            .header("X-Client-Type", "devgate")
            .header("X-Session-Key", &self.session_key)
            .header("X-Trace-Id", Uuid::new_v4().to_string());
        if let Some(ref key) = self.api_key {
            rb = rb.header("X-Api-Key", key);
        }
        rb
    }
}

#[async_trait]
impl Http for HttpSession {
    async fn request(&self, method: Method, api: &str, body: Value) -> Result<Value> {
        let url = self.url(api);
        let start = Instant::now();
        let rb = self.decorate(self.http.request(method, &url));
        let rb = if body.is_null() { rb } else { rb.json(&body) };

        let result = rb.send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                TraceEvent::GatewayRequest {
                    api: api.to_owned(),
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    duration_ms,
                }
                .emit();
                return Err(from_reqwest(e));
            }
        };

        let status = resp.status();
        TraceEvent::GatewayRequest {
            api: api.to_owned(),
            status: status.as_u16(),
            duration_ms,
        }
        .emit();

        let text = resp.text().await.map_err(from_reqwest)?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Http(format!("{api} auth failed ({status}): {text}")));
        }
        if !status.is_success() {
            return Err(Error::Http(format!("{api} returned {status}: {text}")));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::Http(format!("failed to parse {api} response: {e}: {text}")))
    }
}

/// Map a `reqwest::Error` onto the shared error type.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
