//! Random character generation from flat word lists.
//!
//! A scenario directory holds `jobs.txt`, `names.txt`, `tasks.txt`, `topics.txt` and
//! `places.txt`, one entry per line. [`ScenarioGenerator`] draws one entry from each and rolls
//! a random level for every trait and mood, which is how a character that keeps refusing to
//! talk gets a fresh personality.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::ConfigurationError;
use crate::personality::{Personality, TraitLevel, LEVEL_COUNT, MOOD_NAMES, TRAIT_NAMES};
use crate::vocabulary::read_lines;

pub const JOBS_FILE: &str = "jobs.txt";
pub const NAMES_FILE: &str = "names.txt";
pub const TASKS_FILE: &str = "tasks.txt";
pub const TOPICS_FILE: &str = "topics.txt";
pub const PLACES_FILE: &str = "places.txt";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioCorpus {
    pub jobs: Vec<String>,
    pub names: Vec<String>,
    pub tasks: Vec<String>,
    pub topics: Vec<String>,
    pub places: Vec<String>,
}

impl ScenarioCorpus {
    /// Load every list from `dir`. Blank lines are skipped and each list must keep at least
    /// one entry.
    pub fn load(dir: &Path) -> Result<Self, ConfigurationError> {
        let list = |file: &str| -> Result<Vec<String>, ConfigurationError> {
            let path = dir.join(file);
            let entries: Vec<String> = read_lines(&path)?
                .into_iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            if entries.is_empty() {
                return Err(ConfigurationError::TooFewEntries {
                    path,
                    expected: 1,
                    found: 0,
                });
            }
            Ok(entries)
        };
        let corpus = ScenarioCorpus {
            jobs: list(JOBS_FILE)?,
            names: list(NAMES_FILE)?,
            tasks: list(TASKS_FILE)?,
            topics: list(TOPICS_FILE)?,
            places: list(PLACES_FILE)?,
        };
        log::info!(
            "Loaded scenario corpus from {}: {} names, {} jobs, {} places",
            dir.display(),
            corpus.names.len(),
            corpus.jobs.len(),
            corpus.places.len()
        );
        Ok(corpus)
    }
}

#[derive(Clone, Debug)]
pub struct ScenarioGenerator {
    corpus: ScenarioCorpus,
}

impl ScenarioGenerator {
    pub fn new(corpus: ScenarioCorpus) -> Self {
        Self { corpus }
    }

    pub fn corpus(&self) -> &ScenarioCorpus {
        &self.corpus
    }

    /// A fresh character: `"a <job> from <place>"` with one task, one topic and random levels.
    pub fn random_character<R: Rng>(&self, rng: &mut R) -> Personality {
        let job = pick(&self.corpus.jobs, rng);
        let place = pick(&self.corpus.places, rng);
        let name = pick(&self.corpus.names, rng);
        let mut personality = Personality::new(name, format!("a {} from {}", job, place))
            .with_tasks(vec![pick(&self.corpus.tasks, rng)])
            .with_topics(vec![pick(&self.corpus.topics, rng)]);

        for name in TRAIT_NAMES {
            personality.traits.set(name, random_level(rng));
        }
        for name in MOOD_NAMES {
            personality.moods.set(name, random_level(rng));
        }
        personality
    }
}

fn pick<R: Rng>(items: &[String], rng: &mut R) -> String {
    items.choose(rng).cloned().unwrap_or_default()
}

fn random_level<R: Rng>(rng: &mut R) -> TraitLevel {
    TraitLevel::new(rng.gen_range(0..LEVEL_COUNT as i64)).unwrap_or_default()
}
