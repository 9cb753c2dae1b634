//! The `OpenAIClient` struct implements `ClientWrapper` for OpenAI's Chat Completions API
//! (and any endpoint that speaks the same wire format).
//!
//! # Wire format
//!
//! Requests are an HTTP `POST` with a JSON body carrying `model`, `messages[]` and the
//! sampling fields (`temperature`, `presence_penalty`, `frequency_penalty`). The reply text is
//! read from `choices[0].message.content` and the usage from `usage.total_tokens`.
//!
//! # Example
//!
//! ```rust,no_run
//! use persona_chat::clients::openai::OpenAIClient;
//! use persona_chat::client_wrapper::{ClientWrapper, Message, SamplingParameters};
//!
//! #[tokio::main]
//! async fn main() {
//!     let secret_key = std::env::var("OPEN_AI_SECRET").expect("OPEN_AI_SECRET not set");
//!     let client = OpenAIClient::new(&secret_key, "gpt-4");
//!
//!     let completion = client
//!         .send_message(
//!             &[
//!                 Message::system("You are a grumpy innkeeper."),
//!                 Message::user("A traveller asks for a room."),
//!             ],
//!             &SamplingParameters::default(),
//!         )
//!         .await
//!         .unwrap();
//!     println!("Innkeeper: {}", completion.text);
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::client_wrapper::{
    ClientWrapper, Completion, Message, SamplingParameters, TokenUsage, TransportError,
};
use crate::clients::common::{get_shared_http_client, truncate_body};

/// Default chat completions endpoint.
pub const DEFAULT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Client wrapper for OpenAI's Chat Completions API.
///
/// The wrapper keeps the endpoint, credentials and model identifier plus an internal
/// [`TokenUsage`] slot so callers can inspect how many tokens the most recent request consumed.
pub struct OpenAIClient {
    http: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIClient {
    /// Construct a new client against the default OpenAI endpoint.
    pub fn new(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_url(secret_key, model_name, DEFAULT_COMPLETIONS_URL)
    }

    /// Construct a client targeting a custom OpenAI compatible completions URL.
    pub fn new_with_url(secret_key: &str, model_name: &str, url: &str) -> Self {
        OpenAIClient {
            http: get_shared_http_client().clone(),
            api_key: secret_key.to_string(),
            url: url.to_string(),
            model: model_name.to_string(),
            token_usage: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
    #[serde(default)]
    total_tokens: usize,
}

fn build_request_body(
    model: &str,
    messages: &[Message],
    sampling: &SamplingParameters,
) -> Result<String, TransportError> {
    let request = ChatRequest {
        model,
        messages,
        temperature: sampling.temperature,
        presence_penalty: sampling.presence_penalty,
        frequency_penalty: sampling.frequency_penalty,
    };
    serde_json::to_string(&request).map_err(|e| TransportError::MalformedResponse(e.to_string()))
}

/// Decode a completions response body into the structured result and its usage.
fn parse_completion(body: &str) -> Result<(Completion, TokenUsage), TransportError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

    let text = response
        .choices
        .into_iter()
        .next()
        .ok_or(TransportError::EmptyChoices)?
        .message
        .content
        .unwrap_or_default();

    let usage = response
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok((
        Completion {
            text,
            usage_tokens: usage.total_tokens,
        },
        usage,
    ))
}

#[async_trait]
impl ClientWrapper for OpenAIClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &self,
        messages: &[Message],
        sampling: &SamplingParameters,
    ) -> Result<Completion, TransportError> {
        let body = build_request_body(&self.model, messages, sampling)?;

        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                log::error!("OpenAIClient::send_message(...): request failed: {}", e);
                TransportError::Network(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            log::error!(
                "OpenAIClient::send_message(...): OpenAI API Error {}: {}",
                status,
                truncate_body(&text, 512)
            );
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate_body(&text, 512),
            });
        }

        let (completion, usage) = parse_completion(&text)?;
        if let Ok(mut slot) = self.token_usage.lock() {
            *slot = Some(usage);
        }
        Ok(completion)
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation_uses_default_url() {
        let client = OpenAIClient::new("test-key", "gpt-4");
        assert_eq!(client.url(), DEFAULT_COMPLETIONS_URL);
        assert_eq!(client.model_name(), "gpt-4");
        assert!(client.get_last_usage().is_none());
    }

    #[test]
    fn request_body_carries_model_messages_and_sampling() {
        let messages = vec![Message::system("be terse"), Message::user("hi")];
        let sampling = SamplingParameters {
            temperature: 0.5,
            presence_penalty: 1.0,
            frequency_penalty: -1.0,
        };
        let body = build_request_body("gpt-4", &messages, &sampling).unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["presence_penalty"], 1.0);
        assert_eq!(json["frequency_penalty"], -1.0);
    }

    #[test]
    fn parse_completion_reads_first_choice_and_usage() {
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "\"Hello there.\""}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 20, "completion_tokens": 4, "total_tokens": 24}
        }"#;
        let (completion, usage) = parse_completion(body).unwrap();
        assert_eq!(completion.text, "\"Hello there.\"");
        assert_eq!(completion.usage_tokens, 24);
        assert_eq!(usage.input_tokens, 20);
        assert_eq!(usage.output_tokens, 4);
    }

    #[test]
    fn parse_completion_rejects_empty_choices_and_garbage() {
        assert_eq!(
            parse_completion(r#"{"choices": []}"#),
            Err(TransportError::EmptyChoices)
        );
        assert!(matches!(
            parse_completion("<html>bad gateway</html>"),
            Err(TransportError::MalformedResponse(_))
        ));
    }
}
