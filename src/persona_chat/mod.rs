// src/persona_chat/mod.rs

pub mod audience;
pub mod character;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod conversation_history;
pub mod event;
pub mod personality;
pub mod prompt_synthesizer;
pub mod recording;
pub mod request_scheduler;
pub mod scenario;
pub mod vocabulary;

// Export the controller and scheduler here so callers can write persona_chat::RequestScheduler
// instead of persona_chat::request_scheduler::RequestScheduler.
pub use character::ConversationController;
pub use request_scheduler::RequestScheduler;
