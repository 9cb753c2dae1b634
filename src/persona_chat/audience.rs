//! Utterance broadcast to whoever is currently within earshot.
//!
//! An [`Audience`] is an explicit subscriber set. Something outside the pipeline (a proximity
//! sensor, a scene script, a test) decides who is listening by calling
//! [`subscribe`](Audience::subscribe) and [`unsubscribe`](Audience::unsubscribe); a speaking
//! character hands each utterance to [`publish`](Audience::publish), which fans it out to every
//! listener except the speaker.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use futures_util::future::join_all;

pub const LOOKING_AT: &str = "who is looking at";
pub const LOOKING_AT_YOU: &str = "who is looking at you";
pub const LOOKING_AT_NOTHING: &str = "who is looking at nothing in particular";

/// What a listener knows about whoever just spoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speaker {
    pub id: String,
    pub name: String,
    pub backstory: String,
    /// Id of what the speaker is looking at.
    pub looking_at: Option<String>,
}

impl Speaker {
    /// `"<backstory> named <name> who is looking at <target|you|nothing in particular>"`
    /// as seen by `observer_id`.
    pub fn describe_for(&self, observer_id: &str) -> String {
        let gaze = match &self.looking_at {
            Some(target) if target == observer_id => LOOKING_AT_YOU.to_string(),
            Some(target) => format!("{} {}", LOOKING_AT, target),
            None => LOOKING_AT_NOTHING.to_string(),
        };
        format!("{} named {} {}", self.backstory, self.name, gaze)
    }
}

/// One statement made out loud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
}

#[async_trait]
pub trait UtteranceListener: Send + Sync {
    fn listener_id(&self) -> &str;

    async fn hear(&self, utterance: &Utterance);
}

#[derive(Default)]
pub struct Audience {
    listeners: RwLock<Vec<Arc<dyn UtteranceListener>>>,
}

impl Audience {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener, replacing any existing one with the same id.
    pub fn subscribe(&self, listener: Arc<dyn UtteranceListener>) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|l| l.listener_id() != listener.listener_id());
        listeners.push(listener);
    }

    /// Returns whether a listener with that id was subscribed.
    pub fn unsubscribe(&self, listener_id: &str) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| l.listener_id() != listener_id);
        listeners.len() != before
    }

    pub fn listener_ids(&self) -> Vec<String> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|l| l.listener_id().to_string())
            .collect()
    }

    /// Deliver to every subscribed listener except the speaker. Returns how many heard it.
    pub async fn publish(&self, utterance: &Utterance) -> usize {
        let targets: Vec<Arc<dyn UtteranceListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| l.listener_id() != utterance.speaker.id)
            .cloned()
            .collect();
        join_all(targets.iter().map(|l| l.hear(utterance))).await;
        targets.len()
    }
}
