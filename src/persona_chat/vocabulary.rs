//! Static vocabulary the prompt synthesizer draws from.
//!
//! The corpus lives in one directory:
//!
//! ```text
//! vocabulary/
//!   ├─ openness.txt            one file per trait, named after the trait
//!   ├─ conscientiousness.txt   "1:<text>" = manifestation, "0:<text>" = contradiction
//!   ├─ ...
//!   ├─ degree_terms.txt        one line per level, 0 (very low) .. 4 (very high)
//!   └─ action_terms.txt        one line per level; blank lines are kept
//! ```
//!
//! Moods read their intensity words from a flat term list too; by default that is the
//! degree-term file. Loading happens once at startup and any missing or malformed file is a
//! fatal [`ConfigurationError`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ConfigurationError;
use crate::personality::{LEVEL_COUNT, MOOD_NAMES, TRAIT_NAMES};

const MANIFESTATION_PREFIX: &str = "1";
const CONTRADICTION_PREFIX: &str = "0";
const ENTRY_DELIMITER: char = ':';

/// Adjectives for the built-in traits, parallel to [`TRAIT_NAMES`].
pub const TRAIT_ADJECTIVES: [&str; 5] = [
    "open",
    "conscientious",
    "extraverted",
    "agreeable",
    "neurotic",
];

/// Adjectives for the built-in moods, parallel to [`MOOD_NAMES`].
pub const MOOD_ADJECTIVES: [&str; 3] = ["happy", "angry", "sarcastic"];

/// File names inside the vocabulary directory.
#[derive(Clone, Debug)]
pub struct VocabularyLayout {
    pub trait_extension: String,
    pub action_terms_file: String,
    pub degree_terms_file: String,
    pub mood_terms_file: String,
}

impl Default for VocabularyLayout {
    fn default() -> Self {
        Self {
            trait_extension: ".txt".to_string(),
            action_terms_file: "action_terms.txt".to_string(),
            degree_terms_file: "degree_terms.txt".to_string(),
            mood_terms_file: "degree_terms.txt".to_string(),
        }
    }
}

/// Vocabulary of one personality trait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraitVocabulary {
    pub name: String,
    /// Word completing "You are <degree> ...". May be empty when the degree terms already
    /// carry it.
    pub adjective: String,
    /// Things people at this level will do.
    pub manifestations: Vec<String>,
    /// Things people at the opposite level will do.
    pub contradictions: Vec<String>,
}

/// A mood only needs a name and an adjective.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoodVocabulary {
    pub name: String,
    pub adjective: String,
}

/// Everything loaded from the corpus. Immutable after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VocabularyTables {
    pub traits: Vec<TraitVocabulary>,
    pub moods: Vec<MoodVocabulary>,
    /// Indexed by trait level.
    pub degree_terms: Vec<String>,
    /// Indexed by trait level; contradictions use the mirrored index.
    pub action_terms: Vec<String>,
    /// Indexed by mood level.
    pub mood_terms: Vec<String>,
}

impl VocabularyTables {
    /// Load the built-in traits and moods from `dir`.
    pub fn load(dir: &Path, layout: &VocabularyLayout) -> Result<Self, ConfigurationError> {
        let specs: Vec<(&str, &str)> = TRAIT_NAMES
            .iter()
            .copied()
            .zip(TRAIT_ADJECTIVES.iter().copied())
            .collect();
        let moods = MOOD_NAMES
            .iter()
            .zip(MOOD_ADJECTIVES.iter())
            .map(|(name, adjective)| MoodVocabulary {
                name: name.to_string(),
                adjective: adjective.to_string(),
            })
            .collect();
        Self::load_with(dir, layout, &specs, moods)
    }

    /// Load an arbitrary trait catalogue (`(name, adjective)` pairs) from `dir`.
    pub fn load_with(
        dir: &Path,
        layout: &VocabularyLayout,
        traits: &[(&str, &str)],
        moods: Vec<MoodVocabulary>,
    ) -> Result<Self, ConfigurationError> {
        let mut loaded = Vec::with_capacity(traits.len());
        for (name, adjective) in traits {
            let path = dir.join(format!("{}{}", name, layout.trait_extension));
            loaded.push(read_trait_file(&path, name, adjective)?);
        }

        let degree_terms = read_term_table(&dir.join(&layout.degree_terms_file))?;
        let action_terms = read_term_table(&dir.join(&layout.action_terms_file))?;
        let mood_terms = read_term_table(&dir.join(&layout.mood_terms_file))?;

        log::info!(
            "Loaded vocabulary from {}: {} traits, {} moods",
            dir.display(),
            loaded.len(),
            moods.len()
        );

        Ok(VocabularyTables {
            traits: loaded,
            moods,
            degree_terms,
            action_terms,
            mood_terms,
        })
    }

    pub fn trait_index(&self, name: &str) -> Option<usize> {
        self.traits.iter().position(|t| t.name == name)
    }

    pub fn mood_index(&self, name: &str) -> Option<usize> {
        self.moods.iter().position(|m| m.name == name)
    }
}

/// Read every line of a file, keeping interior blank lines.
pub(crate) fn read_lines(path: &Path) -> Result<Vec<String>, ConfigurationError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigurationError::MissingFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(contents
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect())
}

fn read_term_table(path: &Path) -> Result<Vec<String>, ConfigurationError> {
    let terms = read_lines(path)?;
    if terms.len() < LEVEL_COUNT {
        return Err(ConfigurationError::TooFewEntries {
            path: path.to_path_buf(),
            expected: LEVEL_COUNT,
            found: terms.len(),
        });
    }
    Ok(terms)
}

fn read_trait_file(
    path: &Path,
    name: &str,
    adjective: &str,
) -> Result<TraitVocabulary, ConfigurationError> {
    let mut manifestations = Vec::new();
    let mut contradictions = Vec::new();

    for (i, line) in read_lines(path)?.into_iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (prefix, text) = match line.split_once(ENTRY_DELIMITER) {
            Some((prefix, text)) if !text.trim().is_empty() => (prefix.trim(), text.trim()),
            _ => return Err(malformed(path, i, &line)),
        };
        match prefix {
            MANIFESTATION_PREFIX => manifestations.push(text.to_string()),
            CONTRADICTION_PREFIX => contradictions.push(text.to_string()),
            _ => return Err(malformed(path, i, &line)),
        }
    }

    for list in [&manifestations, &contradictions] {
        if list.is_empty() {
            return Err(ConfigurationError::TooFewEntries {
                path: path.to_path_buf(),
                expected: 1,
                found: 0,
            });
        }
    }

    Ok(TraitVocabulary {
        name: name.to_string(),
        adjective: adjective.to_string(),
        manifestations,
        contradictions,
    })
}

fn malformed(path: &Path, index: usize, line: &str) -> ConfigurationError {
    ConfigurationError::MalformedLine {
        path: PathBuf::from(path),
        line_number: index + 1,
        line: line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn term_files(dir: &Path) {
        write(
            dir,
            "degree_terms.txt",
            "very closed\nclosed\nneutral\nopen\nvery open\n",
        );
        write(
            dir,
            "action_terms.txt",
            "refuses to\ntends not to\n\ntends to\nloves to\n",
        );
    }

    #[test]
    fn loads_trait_file_and_keeps_blank_action_term() {
        let tmp = TempDir::new().unwrap();
        term_files(tmp.path());
        write(
            tmp.path(),
            "openness.txt",
            "1:reads widely\n0:avoids new ideas\n1:tries new food\n",
        );

        let tables = VocabularyTables::load_with(
            tmp.path(),
            &VocabularyLayout::default(),
            &[("openness", "")],
            Vec::new(),
        )
        .unwrap();

        let openness = &tables.traits[0];
        assert_eq!(openness.manifestations, vec!["reads widely", "tries new food"]);
        assert_eq!(openness.contradictions, vec!["avoids new ideas"]);
        assert_eq!(tables.action_terms.len(), 5);
        assert_eq!(tables.action_terms[2], "");
        assert_eq!(tables.mood_terms, tables.degree_terms);
    }

    #[test]
    fn text_after_first_delimiter_is_kept_whole() {
        let tmp = TempDir::new().unwrap();
        term_files(tmp.path());
        write(
            tmp.path(),
            "openness.txt",
            "1:quotes the motto: try everything\n0:sticks to routine\n",
        );
        let tables = VocabularyTables::load_with(
            tmp.path(),
            &VocabularyLayout::default(),
            &[("openness", "open")],
            Vec::new(),
        )
        .unwrap();
        assert_eq!(
            tables.traits[0].manifestations,
            vec!["quotes the motto: try everything"]
        );
    }

    #[test]
    fn missing_trait_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        term_files(tmp.path());
        let err = VocabularyTables::load(tmp.path(), &VocabularyLayout::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingFile { .. }));
    }

    #[test]
    fn malformed_prefix_is_fatal() {
        let tmp = TempDir::new().unwrap();
        term_files(tmp.path());
        write(tmp.path(), "openness.txt", "1:reads widely\n2:hums\n0:naps\n");
        let err = VocabularyTables::load_with(
            tmp.path(),
            &VocabularyLayout::default(),
            &[("openness", "open")],
            Vec::new(),
        )
        .unwrap_err();
        match err {
            ConfigurationError::MalformedLine { line_number, .. } => assert_eq!(line_number, 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn short_term_table_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "degree_terms.txt", "low\nhigh\n");
        write(tmp.path(), "action_terms.txt", "a\nb\nc\nd\ne\n");
        write(tmp.path(), "openness.txt", "1:x\n0:y\n");
        let err = VocabularyTables::load_with(
            tmp.path(),
            &VocabularyLayout::default(),
            &[("openness", "open")],
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::TooFewEntries { expected: 5, found: 2, .. }
        ));
    }

    #[test]
    fn trait_without_contradictions_is_fatal() {
        let tmp = TempDir::new().unwrap();
        term_files(tmp.path());
        write(tmp.path(), "openness.txt", "1:reads widely\n");
        let err = VocabularyTables::load_with(
            tmp.path(),
            &VocabularyLayout::default(),
            &[("openness", "open")],
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::TooFewEntries { found: 0, .. }));
    }
}
