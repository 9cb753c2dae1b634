//! Discrete personality description of a character.
//!
//! A [`TraitVector`] is an ordered set of named levels in `[0, 4]`. Level `2` is the neutral
//! sentinel: the trait is left out of every generated prompt. A [`Personality`] bundles the
//! trait and mood vectors with everything else the prompt synthesizer needs to describe a
//! character (name, backstory, secrets, facts to volunteer, tasks and topics) plus the
//! per-character request settings.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use crate::client_wrapper::SamplingParameters;

/// Number of distinct levels a trait can take.
pub const LEVEL_COUNT: usize = 5;

/// Names of the five built-in personality traits, in prompt order.
pub const TRAIT_NAMES: [&str; 5] = [
    "openness",
    "conscientiousness",
    "extraversion",
    "agreeableness",
    "neuroticism",
];

/// Names of the built-in moods, in prompt order.
pub const MOOD_NAMES: [&str; 3] = ["happiness", "anger", "sarcasm"];

/// A level outside `[0, 4]` was supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelOutOfRange(pub i64);

impl fmt::Display for LevelOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trait level {} is outside [0, {}]",
            self.0,
            LEVEL_COUNT - 1
        )
    }
}

impl Error for LevelOutOfRange {}

/// Intensity of a trait or mood.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraitLevel(u8);

impl TraitLevel {
    pub const VERY_LOW: TraitLevel = TraitLevel(0);
    pub const LOW: TraitLevel = TraitLevel(1);
    /// Sentinel meaning "omit from generated text".
    pub const NEUTRAL: TraitLevel = TraitLevel(2);
    pub const HIGH: TraitLevel = TraitLevel(3);
    pub const VERY_HIGH: TraitLevel = TraitLevel(4);

    pub fn new(value: i64) -> Result<Self, LevelOutOfRange> {
        if (0..LEVEL_COUNT as i64).contains(&value) {
            Ok(TraitLevel(value as u8))
        } else {
            Err(LevelOutOfRange(value))
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_neutral(self) -> bool {
        self == TraitLevel::NEUTRAL
    }
}

impl Default for TraitLevel {
    fn default() -> Self {
        TraitLevel::NEUTRAL
    }
}

/// Ordered set of named trait levels. Names not present read as neutral.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraitVector {
    levels: Vec<(String, TraitLevel)>,
}

impl TraitVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every name in `names` at the neutral level.
    pub fn neutral<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TraitVector {
            levels: names
                .into_iter()
                .map(|n| (n.into(), TraitLevel::NEUTRAL))
                .collect(),
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, level: TraitLevel) -> Self {
        self.set(name, level);
        self
    }

    /// Set a level, replacing an existing entry in place or appending a new one.
    pub fn set(&mut self, name: impl Into<String>, level: TraitLevel) {
        let name = name.into();
        match self.levels.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = level,
            None => self.levels.push((name, level)),
        }
    }

    pub fn get(&self, name: &str) -> TraitLevel {
        self.levels
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, level)| *level)
            .unwrap_or(TraitLevel::NEUTRAL)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TraitLevel)> {
        self.levels.iter().map(|(n, l)| (n.as_str(), *l))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Output pacing: after speaking, a character waits roughly as long as it would take to say
/// the line out loud before speaking again.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PacingConfig {
    /// Whether to wait based on the length of the last statement.
    pub enabled: bool,
    /// Seconds of wait per character of the last statement.
    pub seconds_per_char: f64,
    /// Upper bound on any single wait.
    pub max_wait: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            seconds_per_char: 0.1,
            max_wait: Duration::from_secs(20),
        }
    }
}

/// Complete description of one character.
#[derive(Clone, Debug, PartialEq)]
pub struct Personality {
    pub name: String,
    /// Who and what this character is, e.g. "a blacksmith from Dover". Short, little punctuation.
    pub backstory: String,
    pub traits: TraitVector,
    pub moods: TraitVector,
    /// Things this character avoids in conversation ("Secretly, you ...").
    pub secrets: Vec<String>,
    /// Things this character would love to tell you about.
    pub shirt_sleeve: Vec<String>,
    /// What this character is busy with right now.
    pub tasks: Vec<String>,
    /// Subjects this character wants to bring up.
    pub topics: Vec<String>,
    /// Id of whatever this character is currently looking at, if anything.
    pub looking_at: Option<String>,
    pub sampling: SamplingParameters,
    pub pacing: PacingConfig,
}

impl Personality {
    /// A character with every built-in trait and mood at the neutral level.
    pub fn new(name: impl Into<String>, backstory: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backstory: backstory.into(),
            traits: TraitVector::neutral(TRAIT_NAMES),
            moods: TraitVector::neutral(MOOD_NAMES),
            secrets: Vec::new(),
            shirt_sleeve: Vec::new(),
            tasks: Vec::new(),
            topics: Vec::new(),
            looking_at: None,
            sampling: SamplingParameters::default(),
            pacing: PacingConfig::default(),
        }
    }

    pub fn with_trait(mut self, name: &str, level: TraitLevel) -> Self {
        self.traits.set(name, level);
        self
    }

    pub fn with_mood(mut self, name: &str, level: TraitLevel) -> Self {
        self.moods.set(name, level);
        self
    }

    pub fn with_secrets(mut self, secrets: Vec<String>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_shirt_sleeve(mut self, facts: Vec<String>) -> Self {
        self.shirt_sleeve = facts;
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<String>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingParameters) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_level_rejects_out_of_range() {
        assert!(TraitLevel::new(-1).is_err());
        assert!(TraitLevel::new(5).is_err());
        assert_eq!(TraitLevel::new(4).unwrap(), TraitLevel::VERY_HIGH);
        assert!(TraitLevel::new(2).unwrap().is_neutral());
    }

    #[test]
    fn trait_vector_set_replaces_in_place() {
        let mut vector = TraitVector::neutral(["openness", "anger"]);
        vector.set("anger", TraitLevel::HIGH);
        vector.set("sarcasm", TraitLevel::LOW);

        let names: Vec<&str> = vector.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["openness", "anger", "sarcasm"]);
        assert_eq!(vector.get("anger"), TraitLevel::HIGH);
        assert_eq!(vector.get("unknown"), TraitLevel::NEUTRAL);
    }

    #[test]
    fn new_personality_is_neutral() {
        let p = Personality::new("Bilbo", "a simulated video game character");
        assert_eq!(p.traits.len(), 5);
        assert_eq!(p.moods.len(), 3);
        assert!(p.traits.iter().all(|(_, l)| l.is_neutral()));
        assert!(!p.pacing.enabled);
    }
}
