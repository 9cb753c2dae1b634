//! Single-flight, rate-limited request queue shared by every character in the process.
//!
//! Any number of controllers may [`submit`](RequestScheduler::submit) concurrently. Tickets are
//! kept in one FIFO queue and drained by at most one worker task, so the completion endpoint
//! never sees overlapping requests from this process and completions fire in submission order.
//!
//! ```text
//! submit ──► [ t3 | t2 | t1 ] ──► drain worker ──► rate-limit wait ──► ClientWrapper
//!                                      ▲                                   │
//!                                      └──── on_complete(outcome) ◄────────┘
//! ```
//!
//! The worker is spawned on the first submit that finds no worker running and exits once the
//! queue is empty; both decisions are taken under the same lock so two workers can never
//! dequeue at the same time.
//!
//! A panic while processing a ticket never takes the worker down. A panicking transport turns
//! into a failed ticket, and a panicking completion callback is logged and skipped, so later
//! tickets keep flowing.
//!
//! The rate-limit clock is owned by the scheduler. It is stamped right after the transport
//! returns, success or failure, so a failing endpoint still gets one interval of rest.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::time::Instant;
use uuid::Uuid;

use crate::client_wrapper::{ClientWrapper, SamplingParameters, TransportError};
use crate::config::{PipelineConfig, DEFAULT_DENIAL_SENTINEL, DEFAULT_MIN_REQUEST_INTERVAL};
use crate::conversation_history::ConversationHistory;
use crate::event::{EventHandler, SchedulerEvent};
use crate::recording::{ConversationRecord, FileRecorder, RecordingError, RecordingSink};

/// How a ticket ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketOutcome {
    /// Accepted reply with enclosing quotes stripped. Already appended to the owner's history.
    Completed(String),
    /// The model answered with the denial sentinel. History was left untouched.
    Denied,
    /// The transport failed. History was left untouched and the ticket is not retried.
    Failed(TransportError),
}

pub type CompletionCallback = Box<dyn FnOnce(TicketOutcome) + Send + 'static>;

/// One outbound request, owned by the scheduler from submit until its callback fires.
///
/// The outbound user message is expected to already sit at the end of `history`; the
/// scheduler sends the history as it stands at dispatch time.
pub struct RequestTicket {
    pub id: Uuid,
    /// Full prompt including the reply and denial instructions.
    pub prompt_text: String,
    /// What the character perceived, without instructions. Used for recording.
    pub original_text: String,
    pub owner_id: String,
    /// Line identifying the owner in recordings.
    pub owner_summary: String,
    pub history: Arc<tokio::sync::Mutex<ConversationHistory>>,
    pub sampling: SamplingParameters,
    on_complete: CompletionCallback,
}

impl RequestTicket {
    pub fn new<F>(
        owner_id: impl Into<String>,
        prompt_text: impl Into<String>,
        original_text: impl Into<String>,
        history: Arc<tokio::sync::Mutex<ConversationHistory>>,
        on_complete: F,
    ) -> Self
    where
        F: FnOnce(TicketOutcome) + Send + 'static,
    {
        RequestTicket {
            id: Uuid::new_v4(),
            prompt_text: prompt_text.into(),
            original_text: original_text.into(),
            owner_id: owner_id.into(),
            owner_summary: String::new(),
            history,
            sampling: SamplingParameters::default(),
            on_complete: Box::new(on_complete),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingParameters) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_owner_summary(mut self, summary: impl Into<String>) -> Self {
        self.owner_summary = summary.into();
        self
    }
}

impl fmt::Debug for RequestTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTicket")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("prompt_text", &self.prompt_text)
            .finish()
    }
}

/// Process-scoped rate-limit clock: the time the last dispatch returned.
#[derive(Debug, Clone)]
pub struct RateLimitClock {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl RateLimitClock {
    pub fn new(min_interval: Duration) -> Self {
        RateLimitClock {
            last_request: None,
            min_interval,
        }
    }

    /// How long to wait at `now` before dispatching. Zero for the very first request.
    pub fn wait_before_dispatch(&self, now: Instant) -> Duration {
        match self.last_request {
            Some(last) => self
                .min_interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_request = Some(now);
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Trim surrounding whitespace and any `"` characters enclosing the reply.
pub fn strip_enclosing_quotes(text: &str) -> String {
    text.trim().trim_matches('"').trim().to_string()
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<RequestTicket>,
    draining: bool,
}

struct SchedulerInner {
    client: Arc<dyn ClientWrapper>,
    queue: Mutex<QueueState>,
    clock: Mutex<RateLimitClock>,
    denial_sentinel: String,
    recorder: Option<Arc<dyn RecordingSink>>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Builder for [`RequestScheduler`].
pub struct RequestSchedulerBuilder {
    client: Arc<dyn ClientWrapper>,
    min_interval: Duration,
    denial_sentinel: String,
    recorder: Option<Arc<dyn RecordingSink>>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl RequestSchedulerBuilder {
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn denial_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.denial_sentinel = sentinel.into();
        self
    }

    pub fn recorder(mut self, recorder: Arc<dyn RecordingSink>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn build(self) -> RequestScheduler {
        RequestScheduler {
            inner: Arc::new(SchedulerInner {
                client: self.client,
                queue: Mutex::new(QueueState::default()),
                clock: Mutex::new(RateLimitClock::new(self.min_interval)),
                denial_sentinel: self.denial_sentinel,
                recorder: self.recorder,
                event_handler: self.event_handler,
            }),
        }
    }
}

/// Cheaply clonable handle to the shared queue.
#[derive(Clone)]
pub struct RequestScheduler {
    inner: Arc<SchedulerInner>,
}

impl RequestScheduler {
    pub fn builder(client: Arc<dyn ClientWrapper>) -> RequestSchedulerBuilder {
        RequestSchedulerBuilder {
            client,
            min_interval: DEFAULT_MIN_REQUEST_INTERVAL,
            denial_sentinel: DEFAULT_DENIAL_SENTINEL.to_string(),
            recorder: None,
            event_handler: None,
        }
    }

    pub fn new(client: Arc<dyn ClientWrapper>, min_interval: Duration) -> Self {
        Self::builder(client).min_interval(min_interval).build()
    }

    /// Scheduler configured from `config`. Opens a [`FileRecorder`] when `record_dir` is set.
    pub fn from_config(
        client: Arc<dyn ClientWrapper>,
        config: &PipelineConfig,
    ) -> Result<Self, RecordingError> {
        let mut builder = Self::builder(client)
            .min_interval(config.min_request_interval)
            .denial_sentinel(config.denial_sentinel.clone());
        if let Some(dir) = &config.record_dir {
            builder = builder.recorder(Arc::new(FileRecorder::create(dir)?));
        }
        Ok(builder.build())
    }

    /// Queue a ticket. Starts a drain worker only if none is running.
    pub async fn submit(&self, ticket: RequestTicket) {
        let ticket_id = ticket.id;
        let owner_id = ticket.owner_id.clone();
        let (queue_len, start_worker) = {
            let mut state = lock(&self.inner.queue);
            state.pending.push_back(ticket);
            let start_worker = !state.draining;
            state.draining = true;
            (state.pending.len(), start_worker)
        };
        log::debug!(
            "RequestScheduler::submit(...): ticket {} from {} queued ({} pending)",
            ticket_id,
            owner_id,
            queue_len
        );
        self.inner
            .emit(SchedulerEvent::TicketQueued {
                ticket_id,
                owner_id,
                queue_len,
            })
            .await;

        if start_worker {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.drain().await });
        }
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.inner.queue).pending.len()
    }

    /// Whether a drain worker currently owns the queue.
    pub fn is_draining(&self) -> bool {
        lock(&self.inner.queue).draining
    }

    pub fn denial_sentinel(&self) -> &str {
        &self.inner.denial_sentinel
    }

    pub fn min_interval(&self) -> Duration {
        lock(&self.inner.clock).min_interval()
    }

    /// Substring containment against the denial sentinel.
    pub fn is_denial(&self, text: &str) -> bool {
        self.inner.is_denial(text)
    }
}

impl SchedulerInner {
    async fn emit(&self, event: SchedulerEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_scheduler_event(&event).await;
        }
    }

    fn is_denial(&self, text: &str) -> bool {
        !self.denial_sentinel.is_empty() && text.contains(&self.denial_sentinel)
    }

    async fn drain(self: Arc<Self>) {
        loop {
            let ticket = {
                let mut state = lock(&self.queue);
                match state.pending.pop_front() {
                    Some(ticket) => ticket,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };
            let id = ticket.id;
            if let Err(payload) = AssertUnwindSafe(self.process(ticket)).catch_unwind().await {
                log::error!(
                    "RequestScheduler: ticket {} panicked during completion: {}",
                    id,
                    panic_message(&*payload)
                );
            }
        }
    }

    async fn process(&self, ticket: RequestTicket) {
        let RequestTicket {
            id,
            prompt_text,
            original_text,
            owner_id,
            owner_summary,
            history,
            sampling,
            on_complete,
        } = ticket;

        let wait = lock(&self.clock).wait_before_dispatch(Instant::now());
        if !wait.is_zero() {
            log::debug!(
                "RequestScheduler: waiting {:?} before sending ticket {}",
                wait,
                id
            );
            self.emit(SchedulerEvent::RateLimitWait {
                ticket_id: id,
                wait,
            })
            .await;
            tokio::time::sleep(wait).await;
        }

        let messages = history.lock().await.to_ordered_messages();
        log::debug!(
            "RequestScheduler: dispatching ticket {} for {} ({} messages)",
            id,
            owner_id,
            messages.len()
        );
        self.emit(SchedulerEvent::Dispatched {
            ticket_id: id,
            owner_id: owner_id.clone(),
            message_count: messages.len(),
        })
        .await;

        let result = AssertUnwindSafe(self.client.send_message(&messages, &sampling))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(TransportError::Network(format!(
                    "transport panicked: {}",
                    panic_message(&*payload)
                )))
            });
        lock(&self.clock).mark(Instant::now());

        let outcome = match result {
            Ok(completion) if self.is_denial(&completion.text) => {
                log::info!(
                    "RequestScheduler: got denial string {:?} from prompt:\n{:?}",
                    self.denial_sentinel,
                    prompt_text
                );
                self.emit(SchedulerEvent::Denied {
                    ticket_id: id,
                    owner_id,
                })
                .await;
                TicketOutcome::Denied
            }
            Ok(completion) => {
                history
                    .lock()
                    .await
                    .append_assistant(completion.text.clone());
                let cleaned = strip_enclosing_quotes(&completion.text);

                if let Some(recorder) = &self.recorder {
                    let record = ConversationRecord {
                        agent_summary: owner_summary,
                        prompt: original_text,
                        reply: completion.text.clone(),
                    };
                    if let Err(e) = recorder.record(&record) {
                        log::error!("RequestScheduler: {}", e);
                    }
                }

                self.emit(SchedulerEvent::Completed {
                    ticket_id: id,
                    owner_id,
                    usage_tokens: completion.usage_tokens,
                    reply_length: cleaned.chars().count(),
                })
                .await;
                TicketOutcome::Completed(cleaned)
            }
            Err(error) => {
                log::error!(
                    "RequestScheduler: ticket {} for {} failed: {}",
                    id,
                    owner_id,
                    error
                );
                self.emit(SchedulerEvent::Failed {
                    ticket_id: id,
                    owner_id,
                    error: error.clone(),
                })
                .await;
                TicketOutcome::Failed(error)
            }
        };

        on_complete(outcome);
    }
}
