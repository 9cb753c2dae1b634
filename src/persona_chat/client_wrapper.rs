//! A ClientWrapper is the transport adapter in front of a remote chat-completion service.
//! It performs exactly one network round trip per call and does not keep track of the
//! conversation; the [`ConversationHistory`](crate::ConversationHistory) owned by each
//! character holds the context, and the [`RequestScheduler`](crate::RequestScheduler) decides
//! when a call may happen.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::Mutex;

/// Represents the possible roles for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    // steers the model; at most one per history, always first
    System,
    // prompts composed on behalf of a character
    User,
    // replies produced by the model
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Represents a generic message to be sent to an LLM. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The actual content of the message.
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// Sampling knobs forwarded with every request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplingParameters {
    /// Between 0 and 2. Higher values make the output more random.
    pub temperature: f32,
    /// Between -2.0 and 2.0. Positive values push the model towards new topics.
    pub presence_penalty: f32,
    /// Between -2.0 and 2.0. Positive values discourage verbatim repetition.
    pub frequency_penalty: f32,
}

impl Default for SamplingParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            presence_penalty: 1.0,
            frequency_penalty: 1.0,
        }
    }
}

/// Structured result of one successful round trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Raw text of the first choice.
    pub text: String,
    /// `usage.total_tokens` as reported by the service.
    pub usage_tokens: usize,
}

/// Failure of a single round trip. Recoverable at the caller's discretion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced an HTTP response (DNS, connect, timeout...).
    Network(String),
    /// The service answered with a non-success status code.
    Status { status: u16, body: String },
    /// The response body could not be decoded.
    MalformedResponse(String),
    /// The response decoded but carried no choices.
    EmptyChoices,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "Network error: {}", msg),
            TransportError::Status { status, body } => {
                write!(f, "Completion endpoint returned {}: {}", status, body)
            }
            TransportError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            TransportError::EmptyChoices => write!(f, "Response contained no choices"),
        }
    }
}

impl Error for TransportError {}

/// Trait defining the interface to a chat-completion service.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Model identifier injected into each request.
    fn model_name(&self) -> &str;

    /// Send the ordered context to the LLM and get its reply.
    /// - `messages`: system message first, then the conversation in stored order.
    /// - `sampling`: the requesting character's sampling parameters.
    async fn send_message(
        &self,
        messages: &[Message],
        sampling: &SamplingParameters,
    ) -> Result<Completion, TransportError>;

    /// Hook to retrieve usage from the *last* send_message() call.
    fn get_last_usage(&self) -> Option<TokenUsage> {
        self.usage_slot()
            .and_then(|slot| slot.lock().ok().and_then(|u| u.clone()))
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        // Implementations that track usage override this with their own slot.
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_to_wire_names() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(Role::User.as_str(), "user");
    }

    #[test]
    fn transport_error_display_includes_status() {
        let err = TransportError::Status {
            status: 429,
            body: "slow down".into(),
        };
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("slow down"));
    }
}
