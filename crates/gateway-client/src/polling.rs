//! Offset-based long-polling of a gateway queue.
//!
//! The gateway answers calls asynchronously: a submission returns an id, and
//! the outcome shows up later on a poll queue. A [`PollingService`] owns one
//! queue (a URL plus optional subscription queue id), runs at most one poll
//! loop for it, and hands each event to whoever registered its id.
//!
//! Instances are shared through a [`PollingRegistry`] so every caller of the
//! same queue goes through the same cursor and pending table.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use dg_domain::error::{Error, Result};
use dg_domain::stream::BoxStream;
use dg_domain::trace::TraceEvent;

use crate::api::{Event, PollRequest, PollServiceResponse, SERVICE_POLL_API, SUBSCRIBE_POLL_API};
use crate::http::Http;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What a polling instance needs to reach its queue.
#[derive(Clone)]
pub struct PollingConfig {
    pub url: String,
    pub session: Arc<dyn Http>,
    /// Wait between polls that returned nothing.
    pub interval: Duration,
    /// Subscription queue id; `None` polls the service queue.
    pub queue_id: Option<u64>,
}

/// Registry key: one instance per queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollingKey {
    pub url: String,
    pub queue_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// Callers waiting on one id. All of them get the same event.
#[derive(Default)]
struct PendingRequest {
    waiters: Vec<oneshot::Sender<Result<Event>>>,
}

struct PollState {
    offset: u64,
    pending: HashMap<u64, PendingRequest>,
    subscribers: Vec<mpsc::UnboundedSender<Result<Event>>>,
    state: LoopState,
}

impl PollState {
    /// Flip Idle to Running. Returns true when the caller must spawn the loop.
    fn start_if_idle(&mut self) -> bool {
        if self.state == LoopState::Idle {
            self.state = LoopState::Running;
            true
        } else {
            false
        }
    }

    fn has_work(&self) -> bool {
        !self.pending.is_empty() || !self.subscribers.is_empty()
    }
}

/// What the loop does after handling one poll.
enum Next {
    Poll,
    Wait,
    Stop,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PollingService
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct PollingService {
    key: PollingKey,
    session: Arc<dyn Http>,
    interval: Duration,
    state: Mutex<PollState>,
}

impl PollingService {
    fn new(config: PollingConfig) -> Self {
        Self {
            key: PollingKey {
                url: config.url,
                queue_id: config.queue_id,
            },
            session: config.session,
            interval: config.interval,
            state: Mutex::new(PollState {
                offset: 0,
                pending: HashMap::new(),
                subscribers: Vec::new(),
                state: LoopState::Idle,
            }),
        }
    }

    pub fn key(&self) -> &PollingKey {
        &self.key
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Transport this instance polls with. Submissions whose outcome shows
    /// up on this queue must go through the same session.
    pub fn session(&self) -> &Arc<dyn Http> {
        &self.session
    }

    /// Cursor the next poll will send.
    pub fn offset(&self) -> u64 {
        self.state.lock().offset
    }

    /// Number of distinct ids still waiting for an event.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn loop_state(&self) -> LoopState {
        self.state.lock().state
    }

    /// Wait for the event carrying `id`.
    ///
    /// The id is registered before this returns, so an event polled before
    /// the future is first awaited is still delivered. Registering an id
    /// that is already pending joins the existing request. Must be called
    /// inside a tokio runtime; the poll loop is spawned on demand.
    pub fn response(self: &Arc<Self>, id: u64) -> impl Future<Output = Result<Event>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        let start = {
            let mut st = self.state.lock();
            st.pending.entry(id).or_default().waiters.push(tx);
            st.start_if_idle()
        };
        if start {
            self.spawn_loop();
        }

        async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(Error::Transport(format!("polling loop dropped request {id}"))),
            }
        }
    }

    /// [`response`](Self::response) that gives up after `timeout`.
    ///
    /// Timing out only detaches this caller. The id stays registered, and a
    /// later match for it is discarded.
    pub fn response_timeout(
        self: &Arc<Self>,
        id: u64,
        timeout: Duration,
    ) -> impl Future<Output = Result<Event>> + Send + 'static {
        let response = self.response(id);
        async move {
            match tokio::time::timeout(timeout, response).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(format!(
                    "no response for request {id} after {timeout:?}"
                ))),
            }
        }
    }

    /// Receive every polled event not claimed by a pending request.
    ///
    /// A live subscription keeps the loop running; dropping it lets the loop
    /// go idle after the next poll. A failed poll is delivered as one `Err`
    /// item before the subscription closes.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let start = {
            let mut st = self.state.lock();
            st.subscribers.push(tx);
            st.start_if_idle()
        };
        if start {
            self.spawn_loop();
        }
        Subscription { rx }
    }

    fn spawn_loop(self: &Arc<Self>) {
        tracing::debug!(url = %self.key.url, queue_id = ?self.key.queue_id, "starting poll loop");
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run().await });
    }

    async fn run(self: Arc<Self>) {
        loop {
            let offset = self.state.lock().offset;
            match self.poll(offset).await {
                Ok(resp) => match self.process(resp) {
                    Next::Poll => {}
                    Next::Wait => tokio::time::sleep(self.interval).await,
                    Next::Stop => return,
                },
                Err(e) => {
                    self.fail_all(offset, e);
                    return;
                }
            }
        }
    }

    async fn poll(&self, offset: u64) -> Result<PollServiceResponse> {
        let api = match self.key.queue_id {
            Some(_) => SUBSCRIBE_POLL_API,
            None => SERVICE_POLL_API,
        };
        let body = serde_json::to_value(PollRequest {
            offset,
            discard_previous: true,
            id: self.key.queue_id,
        })?;
        let raw: Value = self.session.post(api, body).await?;
        serde_json::from_value(raw).map_err(|e| Error::Transport(format!("malformed poll response: {e}")))
    }

    /// Apply one poll response: advance the cursor, resolve matches, fan
    /// out the rest, and decide whether to keep going.
    ///
    /// The interval only separates empty polls. After a page with events,
    /// the next poll goes out at once if anything is still waiting, since
    /// the queue may hold more.
    fn process(&self, resp: PollServiceResponse) -> Next {
        let start = resp.offset;
        let events = resp.into_events();
        let received = events.len();
        // `offset` is where this page starts; the next one starts after it.
        let cursor = start.saturating_add(received as u64);
        let mut resolved = 0;

        let (offset, pending, next) = {
            let mut st = self.state.lock();
            st.offset = st.offset.max(cursor);

            for event in events {
                let id = event.id();
                if let Some(request) = st.pending.remove(&id) {
                    resolved += 1;
                    for waiter in request.waiters {
                        if waiter.send(Ok(event.clone())).is_err() {
                            tracing::debug!(id, "caller gone before its response arrived");
                        }
                    }
                } else if st.subscribers.is_empty() {
                    tracing::debug!(id, url = %self.key.url, "dropping unmatched event");
                } else {
                    st.subscribers.retain(|tx| tx.send(Ok(event.clone())).is_ok());
                }
            }
            st.subscribers.retain(|tx| !tx.is_closed());

            let next = if !st.has_work() {
                st.state = LoopState::Idle;
                Next::Stop
            } else if received == 0 {
                Next::Wait
            } else {
                Next::Poll
            };
            (st.offset, st.pending.len(), next)
        };

        if received > 0 || matches!(next, Next::Stop) {
            TraceEvent::PollCompleted {
                url: self.key.url.clone(),
                queue_id: self.key.queue_id,
                offset,
                events: received,
                resolved,
                pending,
            }
            .emit();
        }
        next
    }

    /// Fail every pending request, hand subscribers the error and close
    /// them. The cursor is kept, so the next registration resumes where this
    /// loop stopped.
    fn fail_all(&self, offset: u64, err: Error) {
        let reason = match err {
            Error::Transport(msg) => msg,
            other => other.to_string(),
        };
        let (pending, subscribers) = {
            let mut st = self.state.lock();
            st.state = LoopState::Idle;
            (
                std::mem::take(&mut st.pending),
                std::mem::take(&mut st.subscribers),
            )
        };

        tracing::warn!(url = %self.key.url, offset, error = %reason, "poll failed");
        TraceEvent::PollFailed {
            url: self.key.url.clone(),
            queue_id: self.key.queue_id,
            offset,
            failed_requests: pending.len(),
            reason: reason.clone(),
        }
        .emit();

        for (_, request) in pending {
            for waiter in request.waiters {
                let _ = waiter.send(Err(Error::Transport(reason.clone())));
            }
        }
        for tx in subscribers {
            let _ = tx.send(Err(Error::Transport(reason.clone())));
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Subscription
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Unclaimed events from one polling instance. When the loop fails the
/// subscription yields the transport error once and then ends.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Result<Event>>,
}

impl Subscription {
    pub async fn next(&mut self) -> Option<Result<Event>> {
        self.rx.recv().await
    }

    pub fn into_stream(mut self) -> BoxStream<'static, Result<Event>> {
        Box::pin(async_stream::stream! {
            while let Some(event) = self.rx.recv().await {
                yield event;
            }
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Maps each queue to its single polling instance.
#[derive(Default)]
pub struct PollingRegistry {
    services: Mutex<HashMap<PollingKey, Arc<PollingService>>>,
}

impl PollingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<PollingRegistry> {
        static GLOBAL: OnceLock<Arc<PollingRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(PollingRegistry::new())))
    }

    /// The instance for `(config.url, config.queue_id)`, created on first
    /// use. An existing instance keeps its own session and interval.
    pub fn instance(&self, config: PollingConfig) -> Arc<PollingService> {
        let key = PollingKey {
            url: config.url.clone(),
            queue_id: config.queue_id,
        };
        let mut services = self.services.lock();
        Arc::clone(
            services
                .entry(key)
                .or_insert_with(|| Arc::new(PollingService::new(config))),
        )
    }

    pub fn get(&self, url: &str, queue_id: Option<u64>) -> Option<Arc<PollingService>> {
        let key = PollingKey {
            url: url.to_owned(),
            queue_id,
        };
        self.services.lock().get(&key).cloned()
    }

    /// Forget every instance. Loops already running finish on their own.
    pub fn reset(&self) {
        self.services.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.services.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.lock().is_empty()
    }
}

/// Shorthand for [`PollingRegistry::global`]`().instance(config)`.
pub fn instance(config: PollingConfig) -> Arc<PollingService> {
    PollingRegistry::global().instance(config)
}
