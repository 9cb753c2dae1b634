//! Scheduler and character event system.
//!
//! Implement [`EventHandler`] to observe the pipeline without touching its control flow:
//!
//! - **Scheduler**: ticket queued, rate-limit wait, dispatch, and the three outcomes
//! - **Characters**: personality started, utterance spoken, denial, failure, regeneration
//!
//! Both methods have default no-op implementations, so you only override what you care about.
//! The handler is wrapped in `Arc<dyn EventHandler>` and may be shared between the
//! [`RequestScheduler`](crate::RequestScheduler) and any number of
//! [`ConversationController`](crate::ConversationController)s.
//!
//! # Example
//!
//! ```rust,no_run
//! use persona_chat::event::{CharacterEvent, EventHandler, SchedulerEvent};
//! use async_trait::async_trait;
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl EventHandler for Printer {
//!     async fn on_scheduler_event(&self, event: &SchedulerEvent) {
//!         if let SchedulerEvent::RateLimitWait { wait, .. } = event {
//!             println!("waiting {:?} before next request", wait);
//!         }
//!     }
//!     async fn on_character_event(&self, event: &CharacterEvent) {
//!         if let CharacterEvent::Spoke { name, text, .. } = event {
//!             println!("{}: {}", name, text);
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::client_wrapper::TransportError;

/// Events emitted by the [`RequestScheduler`](crate::RequestScheduler).
///
/// # Event Flow (per ticket)
///
/// ```text
/// TicketQueued
///   └─ (drain worker picks the ticket up)
///       ├─ RateLimitWait        (only when the last request was too recent)
///       ├─ Dispatched
///       └─ Completed | Denied | Failed
/// ```
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A ticket was appended to the queue.
    TicketQueued {
        ticket_id: Uuid,
        owner_id: String,
        /// Queue length after the append.
        queue_len: usize,
    },
    /// The drain worker is sleeping before the next dispatch.
    RateLimitWait { ticket_id: Uuid, wait: Duration },
    /// The ticket's messages are being sent to the transport.
    Dispatched {
        ticket_id: Uuid,
        owner_id: String,
        /// Number of messages in the outbound context.
        message_count: usize,
    },
    /// The transport returned a reply that was accepted.
    Completed {
        ticket_id: Uuid,
        owner_id: String,
        usage_tokens: usize,
        reply_length: usize,
    },
    /// The reply contained the denial sentinel.
    Denied { ticket_id: Uuid, owner_id: String },
    /// The transport failed. The ticket is not retried.
    Failed {
        ticket_id: Uuid,
        owner_id: String,
        error: TransportError,
    },
}

/// Events emitted by a [`ConversationController`](crate::ConversationController).
#[derive(Debug, Clone)]
pub enum CharacterEvent {
    /// A new system prompt was installed and the history reset.
    PersonalityStarted {
        character_id: String,
        name: String,
        /// Length in characters of the new system prompt.
        prompt_length: usize,
    },
    /// The character said something out loud.
    Spoke {
        character_id: String,
        name: String,
        text: String,
        /// Pacing delay applied before speaking.
        paced_for: Duration,
    },
    /// The model declined to answer for this character.
    Denied { character_id: String, name: String },
    /// A reply request failed at the transport.
    Failed {
        character_id: String,
        name: String,
        error: TransportError,
    },
    /// A denial caused the personality to be regenerated.
    Regenerated {
        character_id: String,
        old_name: String,
        new_name: String,
    },
}

/// Receives pipeline events. All methods default to no-ops.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Called for every scheduler state transition.
    async fn on_scheduler_event(&self, _event: &SchedulerEvent) {}

    /// Called for every character lifecycle event.
    async fn on_character_event(&self, _event: &CharacterEvent) {}
}
