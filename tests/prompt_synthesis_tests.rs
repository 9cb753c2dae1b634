use persona_chat::personality::{TraitLevel, TRAIT_NAMES};
use persona_chat::prompt_synthesizer::{DIALOGUE_RULE, ROLE_TAIL};
use persona_chat::scenario::{ScenarioCorpus, ScenarioGenerator};
use persona_chat::vocabulary::{VocabularyLayout, VocabularyTables};
use persona_chat::{Personality, PromptSynthesizer};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn bundled_vocabulary() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("vocabulary")
}

fn bundled_synthesizer() -> PromptSynthesizer {
    let tables = VocabularyTables::load(&bundled_vocabulary(), &VocabularyLayout::default())
        .expect("bundled vocabulary loads");
    PromptSynthesizer::new(tables)
}

#[test]
fn openness_fragment_from_vocabulary_files() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("openness.txt"),
        "1:reads widely\n1:tries new food\n0:avoids new ideas\n",
    )
    .unwrap();
    fs::write(
        tmp.path().join("degree_terms.txt"),
        "very closed\nclosed\nneutral\nopen\nvery open\n",
    )
    .unwrap();
    fs::write(
        tmp.path().join("action_terms.txt"),
        "refuses to\ntends not to\n\ntends to\nloves to\n",
    )
    .unwrap();

    let tables = VocabularyTables::load_with(
        tmp.path(),
        &VocabularyLayout::default(),
        &[("openness", "")],
        Vec::new(),
    )
    .unwrap();
    let synthesizer = PromptSynthesizer::new(tables);

    assert_eq!(
        synthesizer
            .trait_fragment_by_name("openness", TraitLevel::VERY_HIGH)
            .unwrap(),
        "You are very open. You loves to reads widely, and tries new food. \
         You refuses to avoids new ideas."
    );
    assert_eq!(
        synthesizer
            .trait_fragment_by_name("openness", TraitLevel::NEUTRAL)
            .unwrap(),
        ""
    );
    assert!(synthesizer
        .trait_fragment_by_name("stubbornness", TraitLevel::HIGH)
        .is_none());
}

#[test]
fn bundled_vocabulary_covers_every_trait() {
    let synthesizer = bundled_synthesizer();
    for name in TRAIT_NAMES {
        for value in [0, 1, 3, 4] {
            let level = TraitLevel::new(value).unwrap();
            let fragment = synthesizer.trait_fragment_by_name(name, level).unwrap();
            assert_eq!(fragment.matches(". ").count(), 2, "{}", fragment);
            assert!(fragment.ends_with('.'));
        }
    }
}

#[test]
fn neutral_character_prompt_has_only_header_and_rules() {
    let synthesizer = bundled_synthesizer();
    let prompt = synthesizer.role_prompt(&Personality::new("Bo", "a blacksmith from Dover"));
    assert_eq!(
        prompt,
        format!(
            "Respond as if you are a blacksmith from Dover named Bo with the following \
             personality: {} {}",
            ROLE_TAIL, DIALOGUE_RULE
        )
    );
}

#[test]
fn role_prompt_is_deterministic_for_generated_characters() {
    let synthesizer = bundled_synthesizer();
    let corpus = ScenarioCorpus::load(&bundled_vocabulary().join("scenario")).unwrap();
    let generator = ScenarioGenerator::new(corpus);

    let mut a = StdRng::seed_from_u64(42);
    let mut b = StdRng::seed_from_u64(42);
    let first = generator.random_character(&mut a);
    let second = generator.random_character(&mut b);
    assert_eq!(first, second);
    assert_eq!(
        synthesizer.role_prompt(&first),
        synthesizer.role_prompt(&second)
    );
    assert!(synthesizer
        .role_prompt(&first)
        .contains(&format!("named {}", first.name)));
}

#[test]
fn mood_fragment_uses_mood_terms() {
    let synthesizer = bundled_synthesizer();
    let grumpy = Personality::new("Osk", "a shepherd from the valley")
        .with_mood("anger", TraitLevel::VERY_HIGH)
        .with_mood("happiness", TraitLevel::VERY_LOW);
    assert_eq!(
        synthesizer.mood_fragment(&grumpy.moods),
        "As for your current mood, you are not at all happy, very angry."
    );
    assert_eq!(
        synthesizer.summary(&grumpy),
        "You are not at all happy. You are very angry."
    );
}
