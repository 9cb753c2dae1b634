//! Per-character conversation controller.
//!
//! A [`ConversationController`] owns one character's personality and history. It turns what the
//! character perceives (speech, surroundings) into a prompt, appends it to the history as a user
//! message, submits a ticket to the shared [`RequestScheduler`] and waits for the outcome:
//!
//! - **Spoken**: the reply is paced (optionally), announced to the event handler and published
//!   to the character's [`Audience`].
//! - **Denied**: the model had nothing to say. Depending on the [`DenialPolicy`] the character
//!   keeps its personality or gets a freshly generated one.
//! - **Failed**: reported to the caller. Nothing is retried here.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::path::Path;
//! use persona_chat::{
//!     ConversationController, OpenAIClient, Personality, PipelineConfig, PromptSynthesizer,
//!     RequestScheduler, TraitLevel, VocabularyLayout, VocabularyTables,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PipelineConfig::from_env().unwrap();
//!     let tables = VocabularyTables::load(Path::new("vocabulary"), &VocabularyLayout::default()).unwrap();
//!     let synthesizer = Arc::new(PromptSynthesizer::new(tables));
//!     let client = Arc::new(OpenAIClient::new_with_url(&config.api_key, &config.model, &config.api_url));
//!     let scheduler = RequestScheduler::from_config(client, &config).unwrap();
//!
//!     let mira = ConversationController::from_config(
//!         "mira",
//!         synthesizer,
//!         scheduler,
//!         Personality::new("Mira", "a baker from Dover").with_trait("extraversion", TraitLevel::VERY_HIGH),
//!         &config,
//!     );
//!     let outcome = mira.request_reply("A stranger walks into the bakery and says \"Hello\".").await;
//!     println!("{:?}", outcome);
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::audience::{Audience, Speaker, Utterance, UtteranceListener};
use crate::client_wrapper::{Message, TransportError};
use crate::config::PipelineConfig;
use crate::conversation_history::{ConversationHistory, EvictionPolicy};
use crate::event::{CharacterEvent, EventHandler};
use crate::personality::{PacingConfig, Personality};
use crate::prompt_synthesizer::{join_list, PromptSynthesizer};
use crate::recording::agent_summary;
use crate::request_scheduler::{RequestScheduler, RequestTicket, TicketOutcome};
use crate::scenario::ScenarioGenerator;

pub const REPLY_INSTRUCTION: &str = "What dialogue do you have to say outloud in reply?";
pub const RESPONSE_CHECK: &str = "If there's nothing to say here or if you think you should \
     not reply, or if there is no good response, say only the following words:";
pub const HEARD_SPEECH_MID: &str = "has just said";
pub const SEEN_HEAD: &str = "You can see the following things:";
pub const VISUAL_HEAD: &str = "You see";
pub const VISUAL_INSTRUCTION: &str =
    "What do you have to say about this? Give only the dialogue you would use, not a description of it.";

/// What to do when the model answers with the denial sentinel.
#[derive(Clone, Default)]
pub enum DenialPolicy {
    /// Keep the personality; the caller may try again later.
    #[default]
    Ignore,
    /// Replace the personality with a randomly generated one and reset the history.
    Regenerate(Arc<ScenarioGenerator>),
}

/// Result of one reply request, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Spoken(String),
    Denied,
    Failed(TransportError),
}

/// Tracks the last statement so the next one waits roughly as long as it takes to say it.
#[derive(Debug, Default, Clone)]
pub struct Pacer {
    last_statement_at: Option<Instant>,
    last_statement_wait: Duration,
}

impl Pacer {
    /// Wait before speaking `statement_chars` characters at `now`, then remember this statement.
    pub fn next_wait(
        &mut self,
        config: &PacingConfig,
        now: Instant,
        statement_chars: usize,
    ) -> Duration {
        if !config.enabled {
            return Duration::ZERO;
        }
        let wait = match self.last_statement_at {
            Some(at) => {
                let delta = now.saturating_duration_since(at);
                if delta > self.last_statement_wait {
                    Duration::ZERO
                } else {
                    config.max_wait.min(self.last_statement_wait - delta)
                }
            }
            None => Duration::ZERO,
        };
        self.last_statement_at = Some(now);
        self.last_statement_wait =
            Duration::from_secs_f64((statement_chars as f64 * config.seconds_per_char).max(0.0));
        wait
    }
}

pub struct ConversationController {
    id: String,
    synthesizer: Arc<PromptSynthesizer>,
    scheduler: RequestScheduler,
    personality: RwLock<Personality>,
    history: Arc<tokio::sync::Mutex<ConversationHistory>>,
    pacer: Mutex<Pacer>,
    denial_policy: DenialPolicy,
    audience: Option<Arc<Audience>>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl ConversationController {
    /// Controller with the default history limits. The personality's role prompt is installed
    /// as the system message right away.
    pub fn new(
        id: impl Into<String>,
        synthesizer: Arc<PromptSynthesizer>,
        scheduler: RequestScheduler,
        personality: Personality,
    ) -> Self {
        Self::with_history(
            id,
            synthesizer,
            scheduler,
            personality,
            ConversationHistory::default(),
        )
    }

    pub fn from_config(
        id: impl Into<String>,
        synthesizer: Arc<PromptSynthesizer>,
        scheduler: RequestScheduler,
        personality: Personality,
        config: &PipelineConfig,
    ) -> Self {
        let history = ConversationHistory::new(
            config.max_token_budget,
            config.chars_per_token,
            config.eviction_policy,
        );
        Self::with_history(id, synthesizer, scheduler, personality, history)
    }

    /// Controller with explicit history limits.
    pub fn with_limits(
        id: impl Into<String>,
        synthesizer: Arc<PromptSynthesizer>,
        scheduler: RequestScheduler,
        personality: Personality,
        max_token_budget: usize,
        chars_per_token: usize,
        eviction_policy: EvictionPolicy,
    ) -> Self {
        let history = ConversationHistory::new(max_token_budget, chars_per_token, eviction_policy);
        Self::with_history(id, synthesizer, scheduler, personality, history)
    }

    fn with_history(
        id: impl Into<String>,
        synthesizer: Arc<PromptSynthesizer>,
        scheduler: RequestScheduler,
        personality: Personality,
        mut history: ConversationHistory,
    ) -> Self {
        history.set_system_message(synthesizer.role_prompt(&personality));
        ConversationController {
            id: id.into(),
            synthesizer,
            scheduler,
            personality: RwLock::new(personality),
            history: Arc::new(tokio::sync::Mutex::new(history)),
            pacer: Mutex::new(Pacer::default()),
            denial_policy: DenialPolicy::default(),
            audience: None,
            event_handler: None,
        }
    }

    pub fn with_denial_policy(mut self, policy: DenialPolicy) -> Self {
        self.denial_policy = policy;
        self
    }

    /// Publish every spoken reply to `audience`.
    pub fn with_audience(mut self, audience: Arc<Audience>) -> Self {
        self.audience = Some(audience);
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn personality(&self) -> Personality {
        self.personality
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The full system prompt for the current personality.
    pub fn role(&self) -> String {
        self.synthesizer.role_prompt(&self.personality())
    }

    pub async fn history_snapshot(&self) -> Vec<Message> {
        self.history.lock().await.to_ordered_messages()
    }

    pub async fn history_token_total(&self) -> usize {
        self.history.lock().await.current_token_total()
    }

    /// Replace the personality, install its role prompt and drop the conversation so far.
    pub async fn start_personality(&self, personality: Personality) {
        let role = self.synthesizer.role_prompt(&personality);
        let name = personality.name.clone();
        *self
            .personality
            .write()
            .unwrap_or_else(PoisonError::into_inner) = personality;
        {
            let mut history = self.history.lock().await;
            history.clear();
            history.set_system_message(role.clone());
        }
        log::debug!(
            "ConversationController[{}]: started personality {}",
            self.id,
            name
        );
        self.emit(CharacterEvent::PersonalityStarted {
            character_id: self.id.clone(),
            name,
            prompt_length: role.chars().count(),
        })
        .await;
    }

    pub fn look_at(&self, target: Option<String>) {
        self.personality
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .looking_at = target;
    }

    /// How others perceive this character right now.
    pub fn speaker(&self) -> Speaker {
        let personality = self.personality();
        Speaker {
            id: self.id.clone(),
            name: personality.name,
            backstory: personality.backstory,
            looking_at: personality.looking_at,
        }
    }

    pub fn describe_self_for(&self, observer_id: &str) -> String {
        self.speaker().describe_for(observer_id)
    }

    /// `"You can see the following things: a, b, and c."`, or empty when nothing is seen.
    pub fn describe_seen<S: AsRef<str>>(&self, seen: &[S]) -> String {
        if seen.is_empty() {
            return String::new();
        }
        format!("{} {}.", SEEN_HEAD, join_list(seen))
    }

    /// Ask for a reply to `original`, which is what the character just perceived.
    pub async fn request_reply(&self, original: &str) -> ReplyOutcome {
        let prompt = format!(
            "{} {} {} {}",
            original,
            REPLY_INSTRUCTION,
            RESPONSE_CHECK,
            self.scheduler.denial_sentinel()
        );
        self.submit_prompt(prompt, original.to_string()).await
    }

    /// React to another character's statement.
    pub async fn hear_from(&self, speaker: &Speaker, statement: &str) -> ReplyOutcome {
        log::debug!(
            "ConversationController[{}]: heard {:?} from {}",
            self.id,
            statement,
            speaker.id
        );
        let heard = format!(
            "{} {} \"{}\".",
            speaker.describe_for(&self.id),
            HEARD_SPEECH_MID,
            statement
        );
        self.request_reply(&heard).await
    }

    /// Comment on what the character can see. `None` when nothing is in view.
    pub async fn assess_surroundings<S: AsRef<str>>(&self, seen: &[S]) -> Option<ReplyOutcome> {
        if seen.is_empty() {
            return None;
        }
        let description = self.describe_seen(seen);
        log::debug!(
            "ConversationController[{}]: {}",
            self.id,
            description
        );
        let prompt = format!(
            "{} {}. {} {} {}",
            VISUAL_HEAD,
            join_list(seen),
            VISUAL_INSTRUCTION,
            RESPONSE_CHECK,
            self.scheduler.denial_sentinel()
        );
        Some(self.submit_prompt(prompt, description).await)
    }

    async fn submit_prompt(&self, prompt: String, original: String) -> ReplyOutcome {
        let personality = self.personality();
        let summary = agent_summary(
            &personality.backstory,
            &self.synthesizer.summary(&personality),
        );

        self.history.lock().await.append_user(prompt.clone());

        let (tx, rx) = oneshot::channel();
        let ticket = RequestTicket::new(
            self.id.clone(),
            prompt,
            original,
            Arc::clone(&self.history),
            move |outcome| {
                let _ = tx.send(outcome);
            },
        )
        .with_sampling(personality.sampling)
        .with_owner_summary(summary);
        self.scheduler.submit(ticket).await;

        let outcome = rx.await.unwrap_or_else(|_| {
            TicketOutcome::Failed(TransportError::Network(
                "request scheduler dropped the ticket".to_string(),
            ))
        });

        match outcome {
            TicketOutcome::Completed(text) => {
                self.say_out_loud(&personality, text.clone()).await;
                ReplyOutcome::Spoken(text)
            }
            TicketOutcome::Denied => {
                self.emit(CharacterEvent::Denied {
                    character_id: self.id.clone(),
                    name: personality.name.clone(),
                })
                .await;
                self.apply_denial_policy(&personality).await;
                ReplyOutcome::Denied
            }
            TicketOutcome::Failed(error) => {
                self.emit(CharacterEvent::Failed {
                    character_id: self.id.clone(),
                    name: personality.name.clone(),
                    error: error.clone(),
                })
                .await;
                ReplyOutcome::Failed(error)
            }
        }
    }

    async fn say_out_loud(&self, personality: &Personality, text: String) {
        let wait = self
            .pacer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_wait(&personality.pacing, Instant::now(), text.chars().count());
        if !wait.is_zero() {
            log::debug!(
                "ConversationController[{}]: pacing for {:?}",
                self.id,
                wait
            );
            tokio::time::sleep(wait).await;
        }

        self.emit(CharacterEvent::Spoke {
            character_id: self.id.clone(),
            name: personality.name.clone(),
            text: text.clone(),
            paced_for: wait,
        })
        .await;

        if let Some(audience) = &self.audience {
            let utterance = Utterance {
                speaker: self.speaker(),
                text,
            };
            audience.publish(&utterance).await;
        }
    }

    async fn apply_denial_policy(&self, current: &Personality) {
        let generator = match &self.denial_policy {
            DenialPolicy::Ignore => return,
            DenialPolicy::Regenerate(generator) => Arc::clone(generator),
        };
        let fresh = {
            let mut rng = rand::thread_rng();
            generator
                .random_character(&mut rng)
                .with_sampling(current.sampling)
                .with_pacing(current.pacing)
        };
        let new_name = fresh.name.clone();
        self.start_personality(fresh).await;
        self.emit(CharacterEvent::Regenerated {
            character_id: self.id.clone(),
            old_name: current.name.clone(),
            new_name,
        })
        .await;
    }

    async fn emit(&self, event: CharacterEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_character_event(&event).await;
        }
    }

    /// Listener that makes this character answer whatever it hears. Each reply runs on its own
    /// task so publishing never waits on the scheduler.
    pub fn listener(self: &Arc<Self>) -> Arc<dyn UtteranceListener> {
        Arc::new(CharacterEar {
            id: self.id.clone(),
            controller: Arc::downgrade(self),
        })
    }
}

struct CharacterEar {
    id: String,
    controller: Weak<ConversationController>,
}

#[async_trait]
impl UtteranceListener for CharacterEar {
    fn listener_id(&self) -> &str {
        &self.id
    }

    async fn hear(&self, utterance: &Utterance) {
        if let Some(controller) = self.controller.upgrade() {
            let utterance = utterance.clone();
            tokio::spawn(async move {
                controller
                    .hear_from(&utterance.speaker, &utterance.text)
                    .await;
            });
        }
    }
}
