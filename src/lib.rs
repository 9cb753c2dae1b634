//! # persona_chat
//!
//! persona_chat drives conversations between simulated characters whose dialogue comes from a
//! remote chat-completion model. Each character is described by discrete personality trait and
//! mood levels; the crate turns those levels into a natural-language role prompt, keeps every
//! character's conversation inside a token budget, and funnels all characters' requests
//! through a single rate-limited queue so the endpoint never sees overlapping requests.
//!
//! The crate provides:
//!
//! * **Prompt synthesis**: [`PromptSynthesizer`] renders a [`Personality`] into a system prompt
//!   using a file-driven vocabulary ([`VocabularyTables`]). Contradicting behaviours are phrased
//!   with a mirrored action term, so a very open character "refuses to" do what a closed one
//!   "loves to" do.
//! * **Bounded history**: [`ConversationHistory`] keeps the system message first and evicts the
//!   oldest exchange once the approximate token total reaches the budget.
//! * **Request scheduling**: [`RequestScheduler`] is a process-wide FIFO queue with a single
//!   drain worker and a minimum gap between requests. Outcomes come back as values:
//!   completed, denied (the model had nothing to say) or failed.
//! * **Characters**: [`ConversationController`] ties the pieces together for one character:
//!   hearing speech, assessing surroundings, pacing replies and reacting to denials.
//! * **Provider abstraction**: [`ClientWrapper`] is the transport boundary. [`OpenAIClient`]
//!   speaks the OpenAI Chat Completions wire format; tests plug in their own wrappers.
//!
//! ## Core Concepts
//!
//! ### Synthesizing a role prompt
//!
//! ```rust,no_run
//! use std::path::Path;
//! use persona_chat::{Personality, PromptSynthesizer, TraitLevel, VocabularyLayout, VocabularyTables};
//!
//! let tables = VocabularyTables::load(Path::new("vocabulary"), &VocabularyLayout::default())
//!     .expect("vocabulary corpus");
//! let synthesizer = PromptSynthesizer::new(tables);
//!
//! let mira = Personality::new("Mira", "a baker from Dover")
//!     .with_trait("openness", TraitLevel::VERY_HIGH)
//!     .with_mood("happiness", TraitLevel::HIGH);
//! println!("{}", synthesizer.role_prompt(&mira));
//! ```
//!
//! ### Talking through the shared scheduler
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use persona_chat::{
//!     ConversationController, OpenAIClient, Personality, PipelineConfig, PromptSynthesizer,
//!     ReplyOutcome, RequestScheduler, VocabularyLayout, VocabularyTables,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     persona_chat::init_logger();
//!
//!     let config = PipelineConfig::from_env()?;
//!     let tables = VocabularyTables::load(Path::new("vocabulary"), &VocabularyLayout::default())?;
//!     let synthesizer = Arc::new(PromptSynthesizer::new(tables));
//!     let client = Arc::new(OpenAIClient::new_with_url(
//!         &config.api_key,
//!         &config.model,
//!         &config.api_url,
//!     ));
//!     let scheduler = RequestScheduler::from_config(client, &config)?;
//!
//!     let bo = ConversationController::from_config(
//!         "bo",
//!         synthesizer,
//!         scheduler,
//!         Personality::new("Bo", "a blacksmith from Dover"),
//!         &config,
//!     );
//!     match bo.request_reply("A customer asks whether the sword is ready.").await {
//!         ReplyOutcome::Spoken(text) => println!("Bo: {}", text),
//!         ReplyOutcome::Denied => println!("Bo says nothing."),
//!         ReplyOutcome::Failed(e) => eprintln!("request failed: {}", e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Observability
//!
//! Diagnostics go through the [`log`] facade. Call [`init_logger`] to install `env_logger`
//! and control verbosity with `RUST_LOG`. For structured hooks implement
//! [`EventHandler`] and register it on the scheduler and the controllers.

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Applications embedding persona_chat can opt in to `RUST_LOG` driven diagnostics without
/// choosing a logging backend upfront.
///
/// ```rust
/// persona_chat::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `persona_chat` module.
pub mod persona_chat;

// Re-exporting key items for easier external access.
pub use persona_chat::audience;
pub use persona_chat::audience::{Audience, Speaker, Utterance, UtteranceListener};
pub use persona_chat::character;
pub use persona_chat::character::{ConversationController, DenialPolicy, ReplyOutcome};
pub use persona_chat::client_wrapper;
pub use persona_chat::client_wrapper::{
    ClientWrapper, Completion, Message, Role, SamplingParameters, TokenUsage, TransportError,
};
pub use persona_chat::clients;
pub use persona_chat::clients::openai::OpenAIClient;
pub use persona_chat::config;
pub use persona_chat::config::{ConfigurationError, PipelineConfig};
pub use persona_chat::conversation_history;
pub use persona_chat::conversation_history::{ConversationHistory, EvictionPolicy};
pub use persona_chat::event;
pub use persona_chat::event::{CharacterEvent, EventHandler, SchedulerEvent};
pub use persona_chat::personality;
pub use persona_chat::personality::{
    LevelOutOfRange, PacingConfig, Personality, TraitLevel, TraitVector,
};
pub use persona_chat::prompt_synthesizer;
pub use persona_chat::prompt_synthesizer::PromptSynthesizer;
pub use persona_chat::recording;
pub use persona_chat::recording::{FileRecorder, RecordingError, RecordingSink};
pub use persona_chat::request_scheduler;
pub use persona_chat::request_scheduler::{RequestScheduler, RequestTicket, TicketOutcome};
pub use persona_chat::scenario;
pub use persona_chat::scenario::{ScenarioCorpus, ScenarioGenerator};
pub use persona_chat::vocabulary;
pub use persona_chat::vocabulary::{VocabularyLayout, VocabularyTables};
