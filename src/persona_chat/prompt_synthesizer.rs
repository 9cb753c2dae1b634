//! Deterministic prompt synthesis: trait and mood levels in, natural-language text out.
//!
//! Every non-neutral trait produces three sentences:
//!
//! ```text
//! You are <degree[level]> <adjective>.
//! You <action[level]> <manifestation_1>, ..., and <manifestation_n>.
//! You <action[N - 1 - level]> <contradiction_1>, ..., and <contradiction_n>.
//! ```
//!
//! where `N` is the length of the action-term table. The third sentence mirrors the level so a
//! very high trait pairs the contradictions with the action term a very low trait would use.
//! The output is byte-for-byte stable for a given vocabulary because the remote model is
//! steered by the exact phrasing.
//!
//! # Example
//!
//! ```rust
//! use persona_chat::prompt_synthesizer::PromptSynthesizer;
//! use persona_chat::vocabulary::{TraitVocabulary, VocabularyTables};
//! use persona_chat::personality::TraitLevel;
//!
//! let tables = VocabularyTables {
//!     traits: vec![TraitVocabulary {
//!         name: "openness".into(),
//!         adjective: String::new(),
//!         manifestations: vec!["reads widely".into(), "tries new food".into()],
//!         contradictions: vec!["avoids new ideas".into()],
//!     }],
//!     moods: Vec::new(),
//!     degree_terms: ["very closed", "closed", "neutral", "open", "very open"]
//!         .iter().map(|s| s.to_string()).collect(),
//!     action_terms: ["refuses to", "tends not to", "", "tends to", "loves to"]
//!         .iter().map(|s| s.to_string()).collect(),
//!     mood_terms: Vec::new(),
//! };
//! let synthesizer = PromptSynthesizer::new(tables);
//! assert_eq!(
//!     synthesizer.trait_fragment(0, TraitLevel::VERY_HIGH),
//!     "You are very open. You loves to reads widely, and tries new food. You refuses to avoids new ideas."
//! );
//! ```

use crate::personality::{Personality, TraitLevel, TraitVector};
use crate::vocabulary::VocabularyTables;

pub const DEGREE_HEAD: &str = "You are";
pub const ACTION_HEAD: &str = "You";
pub const LIST_SEPARATOR: &str = ", ";
pub const LIST_CONJUNCTION: &str = "and";
pub const SENTENCE_END: &str = ".";
pub const MOOD_HEAD: &str = "As for your current mood, you are";
pub const SECRET_HEAD: &str = "Secretly, you";
pub const SECRET_TAIL: &str = "and you will avoid talking about any of this";
pub const SHIRT_HEAD: &str = "You want to talk about";
pub const SHIRT_TAIL_SINGLE: &str = "and will mention this at every opportunity";
pub const SHIRT_TAIL_MULTI: &str = "and will mention these things at every opportunity";
pub const TASKS_HEAD: &str = "Right now you are busy";
pub const TOPICS_HEAD: &str = "You want to talk with people about";
pub const ROLE_HEAD: &str = "Respond as if you are";
pub const ROLE_NAMED: &str = "named";
pub const ROLE_MID: &str = "with the following personality:";
pub const ROLE_TAIL: &str = "Do not mention you are an AI machine learning model or Open AI.";
pub const DIALOGUE_RULE: &str = "Give only dialogue and only from the first-person perspective. \
     Do not under any circumstances narrate the scene, what you are doing, or what you are saying.";

/// Join list items: `a`, `a, and b`, `a, b, and c`. No terminal punctuation.
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::new();
    let last = items.len().saturating_sub(1);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(LIST_SEPARATOR);
            if i == last {
                out.push_str(LIST_CONJUNCTION);
                out.push(' ');
            }
        }
        out.push_str(item.as_ref());
    }
    out
}

/// Space-join the non-empty parts and close the sentence.
fn sentence(parts: &[&str]) -> String {
    let mut out = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    out.push_str(SENTENCE_END);
    out
}

/// Space-join the non-empty fragments.
fn join_fragments<S: AsRef<str>>(fragments: &[S]) -> String {
    fragments
        .iter()
        .map(|f| f.as_ref())
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turns trait/mood vectors plus the loaded vocabulary into prompt text.
#[derive(Clone, Debug)]
pub struct PromptSynthesizer {
    vocabulary: VocabularyTables,
}

impl PromptSynthesizer {
    pub fn new(vocabulary: VocabularyTables) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &VocabularyTables {
        &self.vocabulary
    }

    /// Describe the trait at `trait_index` of the vocabulary at `level`. Empty when the level
    /// is neutral, the index is unknown, or the term tables are too short for the level.
    pub fn trait_fragment(&self, trait_index: usize, level: TraitLevel) -> String {
        let vocab = match self.vocabulary.traits.get(trait_index) {
            Some(v) if !level.is_neutral() => v,
            _ => return String::new(),
        };
        let actions = &self.vocabulary.action_terms;
        let terms = (
            self.vocabulary.degree_terms.get(level.index()),
            actions.get(level.index()),
            actions
                .len()
                .checked_sub(1 + level.index())
                .and_then(|mirrored| actions.get(mirrored)),
        );
        let (degree, action, opposite) = match terms {
            (Some(degree), Some(action), Some(opposite)) => (degree, action, opposite),
            _ => {
                log::warn!(
                    "PromptSynthesizer: term tables too short for level {} of {}",
                    level.index(),
                    vocab.name
                );
                return String::new();
            }
        };

        let intensity = sentence(&[DEGREE_HEAD, degree, &vocab.adjective]);
        let behaviours = sentence(&[ACTION_HEAD, action, &join_list(&vocab.manifestations)]);
        let opposites = sentence(&[ACTION_HEAD, opposite, &join_list(&vocab.contradictions)]);
        [intensity, behaviours, opposites].join(" ")
    }

    /// Regenerate the description of a single trait by name, e.g. after the character's level
    /// for it changed. `None` when the vocabulary has no such trait.
    pub fn trait_fragment_by_name(&self, name: &str, level: TraitLevel) -> Option<String> {
        self.vocabulary
            .trait_index(name)
            .map(|i| self.trait_fragment(i, level))
    }

    /// One fragment per vocabulary trait, in vocabulary order.
    pub fn trait_fragments(&self, traits: &TraitVector) -> Vec<String> {
        self.vocabulary
            .traits
            .iter()
            .enumerate()
            .map(|(i, t)| self.trait_fragment(i, traits.get(&t.name)))
            .collect()
    }

    /// Intensity clause only, for every non-neutral mood, comma-joined without a conjunction.
    pub fn mood_fragment(&self, moods: &TraitVector) -> String {
        let described: Vec<String> = self
            .vocabulary
            .moods
            .iter()
            .filter_map(|mood| {
                let level = moods.get(&mood.name);
                if level.is_neutral() {
                    return None;
                }
                let term = self.vocabulary.mood_terms.get(level.index())?;
                Some(join_fragments(&[term.as_str(), mood.adjective.as_str()]))
            })
            .collect();
        if described.is_empty() {
            return String::new();
        }
        sentence(&[MOOD_HEAD, &described.join(LIST_SEPARATOR)])
    }

    pub fn secrets_fragment(&self, secrets: &[String]) -> String {
        if secrets.is_empty() {
            return String::new();
        }
        let listed = format!("{}{}{}", join_list(secrets), LIST_SEPARATOR, SECRET_TAIL);
        sentence(&[SECRET_HEAD, &listed])
    }

    /// Facts the character wears on their shirt sleeve and volunteers at every chance.
    pub fn shirt_sleeve_fragment(&self, facts: &[String]) -> String {
        if facts.is_empty() {
            return String::new();
        }
        let tail = if facts.len() > 1 {
            SHIRT_TAIL_MULTI
        } else {
            SHIRT_TAIL_SINGLE
        };
        let listed = format!("{}{}{}", join_list(facts), LIST_SEPARATOR, tail);
        sentence(&[SHIRT_HEAD, &listed])
    }

    pub fn tasks_fragment(&self, tasks: &[String]) -> String {
        if tasks.is_empty() {
            return String::new();
        }
        sentence(&[TASKS_HEAD, &join_list(tasks)])
    }

    pub fn topics_fragment(&self, topics: &[String]) -> String {
        if topics.is_empty() {
            return String::new();
        }
        sentence(&[TOPICS_HEAD, &join_list(topics)])
    }

    /// Trait fragments, then the mood, secrets and shirt-sleeve fragments. Empty entries are
    /// kept so positions stay stable.
    pub fn personality_fragments(&self, personality: &Personality) -> Vec<String> {
        let mut fragments = self.trait_fragments(&personality.traits);
        fragments.push(self.mood_fragment(&personality.moods));
        fragments.push(self.secrets_fragment(&personality.secrets));
        fragments.push(self.shirt_sleeve_fragment(&personality.shirt_sleeve));
        fragments
    }

    /// Full system prompt for a character.
    pub fn role_prompt(&self, personality: &Personality) -> String {
        let header = join_fragments(&[
            ROLE_HEAD,
            personality.backstory.as_str(),
            ROLE_NAMED,
            personality.name.as_str(),
            ROLE_MID,
        ]);
        let mut parts = vec![header];
        parts.extend(self.personality_fragments(personality));
        parts.push(self.tasks_fragment(&personality.tasks));
        parts.push(self.topics_fragment(&personality.topics));
        parts.push(ROLE_TAIL.to_string());
        parts.push(DIALOGUE_RULE.to_string());
        join_fragments(&parts)
    }

    /// Intensity sentences only, for traits and moods alike (moods use the degree table).
    pub fn summary(&self, personality: &Personality) -> String {
        let degree = |level: TraitLevel, adjective: &str| {
            if level.is_neutral() {
                return None;
            }
            let term = self.vocabulary.degree_terms.get(level.index())?;
            Some(sentence(&[DEGREE_HEAD, term, adjective]))
        };
        let traits = self
            .vocabulary
            .traits
            .iter()
            .filter_map(|t| degree(personality.traits.get(&t.name), &t.adjective));
        let moods = self
            .vocabulary
            .moods
            .iter()
            .filter_map(|m| degree(personality.moods.get(&m.name), &m.adjective));
        join_fragments(&traits.chain(moods).collect::<Vec<_>>())
    }
}
