//! Configuration for the conversational pipeline.
//!
//! [`PipelineConfig`] collects the process-wide settings: where the completion endpoint lives,
//! how often it may be called, and how large each character's context may grow. Users
//! construct it manually or read it from the environment with [`PipelineConfig::from_env`].
//!
//! # Example
//!
//! ```rust
//! use persona_chat::PipelineConfig;
//! use std::time::Duration;
//!
//! let config = PipelineConfig {
//!     min_request_interval: Duration::from_secs(1),
//!     ..PipelineConfig::default()
//! };
//! assert_eq!(config.denial_sentinel, "NO-STATEMENT");
//! ```

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::clients::openai::DEFAULT_COMPLETIONS_URL;
use crate::conversation_history::EvictionPolicy;

/// Fixed string the model is told to answer with when it has nothing to say.
pub const DEFAULT_DENIAL_SENTINEL: &str = "NO-STATEMENT";
/// Approximate characters per token used by the history budget.
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;
/// Default context budget per character, in approximate tokens.
pub const DEFAULT_MAX_TOKENS: usize = 4096;
/// Default minimum gap between two requests to the completion endpoint.
pub const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(3);

/// Fatal problem with the static configuration or corpus files. The process should not
/// proceed with agent dialogue when one of these is returned.
#[derive(Debug)]
pub enum ConfigurationError {
    /// A required file could not be read.
    MissingFile { path: PathBuf, source: std::io::Error },
    /// A trait file line is neither a `1:` manifestation nor a `0:` contradiction.
    MalformedLine {
        path: PathBuf,
        line_number: usize,
        line: String,
    },
    /// A corpus table has fewer entries than the pipeline requires.
    TooFewEntries {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    /// A required environment variable is unset.
    MissingVariable(String),
    /// An environment variable is set but cannot be parsed.
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::MissingFile { path, source } => {
                write!(f, "Cannot read {}: {}", path.display(), source)
            }
            ConfigurationError::MalformedLine {
                path,
                line_number,
                line,
            } => write!(
                f,
                "Malformed entry at {}:{}: {:?}",
                path.display(),
                line_number,
                line
            ),
            ConfigurationError::TooFewEntries {
                path,
                expected,
                found,
            } => write!(
                f,
                "{} has {} entries, at least {} required",
                path.display(),
                found,
                expected
            ),
            ConfigurationError::MissingVariable(key) => {
                write!(f, "Environment variable {} is not set", key)
            }
            ConfigurationError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigurationError::MissingFile { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Process-wide settings for the request pipeline.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Chat completions endpoint.
    pub api_url: String,
    /// Bearer token for the endpoint.
    pub api_key: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Minimum gap between the starts of two consecutive dispatches.
    pub min_request_interval: Duration,
    /// Per-character context budget in approximate tokens.
    pub max_token_budget: usize,
    /// Characters per approximate token.
    pub chars_per_token: usize,
    /// What the model answers when it has nothing to say.
    pub denial_sentinel: String,
    /// How the history sheds messages once over budget.
    pub eviction_policy: EvictionPolicy,
    /// Directory for accepted-completion records. `None` disables recording.
    pub record_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_COMPLETIONS_URL.to_string(),
            api_key: String::new(),
            model: "gpt-4".to_string(),
            min_request_interval: DEFAULT_MIN_REQUEST_INTERVAL,
            max_token_budget: DEFAULT_MAX_TOKENS,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
            denial_sentinel: DEFAULT_DENIAL_SENTINEL.to_string(),
            eviction_policy: EvictionPolicy::default(),
            record_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Build a configuration from environment variables.
    ///
    /// Required: `OPEN_AI_SECRET`
    /// Optional: `PERSONA_API_URL`, `PERSONA_MODEL`, `PERSONA_RATE_LIMIT_SECS`,
    /// `PERSONA_MAX_TOKENS`, `PERSONA_RECORD_DIR`
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = PipelineConfig {
            api_key: lookup("OPEN_AI_SECRET")
                .ok_or_else(|| ConfigurationError::MissingVariable("OPEN_AI_SECRET".into()))?,
            ..PipelineConfig::default()
        };

        if let Some(url) = lookup("PERSONA_API_URL") {
            config.api_url = url;
        }
        if let Some(model) = lookup("PERSONA_MODEL") {
            config.model = model;
        }
        if let Some(secs) = lookup("PERSONA_RATE_LIMIT_SECS") {
            let parsed: f64 = secs
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| ConfigurationError::InvalidValue {
                    key: "PERSONA_RATE_LIMIT_SECS".into(),
                    value: secs.clone(),
                })?;
            config.min_request_interval = Duration::from_secs_f64(parsed);
        }
        if let Some(tokens) = lookup("PERSONA_MAX_TOKENS") {
            config.max_token_budget = tokens.trim().parse().map_err(|_| {
                ConfigurationError::InvalidValue {
                    key: "PERSONA_MAX_TOKENS".into(),
                    value: tokens.clone(),
                }
            })?;
        }
        if let Some(dir) = lookup("PERSONA_RECORD_DIR") {
            config.record_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.min_request_interval, Duration::from_secs(3));
        assert_eq!(config.max_token_budget, 4096);
        assert_eq!(config.chars_per_token, 4);
        assert!(config.record_dir.is_none());
    }

    #[test]
    fn from_lookup_requires_api_key() {
        let err = PipelineConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingVariable(ref k) if k == "OPEN_AI_SECRET"));
    }

    #[test]
    fn from_lookup_reads_overrides() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("OPEN_AI_SECRET", "sk-test"),
            ("PERSONA_MODEL", "gpt-4o-mini"),
            ("PERSONA_RATE_LIMIT_SECS", "0.5"),
            ("PERSONA_MAX_TOKENS", "2048"),
            ("PERSONA_RECORD_DIR", "/tmp/records"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.min_request_interval, Duration::from_millis(500));
        assert_eq!(config.max_token_budget, 2048);
        assert_eq!(config.record_dir, Some(PathBuf::from("/tmp/records")));
    }

    #[test]
    fn from_lookup_rejects_bad_numbers() {
        let err = PipelineConfig::from_lookup(lookup_from(&[
            ("OPEN_AI_SECRET", "sk-test"),
            ("PERSONA_RATE_LIMIT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }
}
