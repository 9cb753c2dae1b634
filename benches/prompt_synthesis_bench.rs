//! Benchmark to measure the cost of synthesizing role prompts and maintaining histories.
//!
//! Both run once per request on the caller's side; the numbers put them next to the network
//! round trip they precede.
//!
//! Run with: cargo bench --bench prompt_synthesis_bench

use std::path::Path;
use std::time::Instant;

use persona_chat::{
    ConversationHistory, EvictionPolicy, Personality, PromptSynthesizer, TraitLevel,
    VocabularyLayout, VocabularyTables,
};

fn main() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("vocabulary");
    let tables = match VocabularyTables::load(&dir, &VocabularyLayout::default()) {
        Ok(tables) => tables,
        Err(e) => {
            eprintln!("cannot load vocabulary: {}", e);
            return;
        }
    };
    let synthesizer = PromptSynthesizer::new(tables);

    let character = Personality::new("Mira", "a baker from Dover")
        .with_trait("openness", TraitLevel::VERY_HIGH)
        .with_trait("conscientiousness", TraitLevel::LOW)
        .with_trait("extraversion", TraitLevel::HIGH)
        .with_trait("agreeableness", TraitLevel::VERY_LOW)
        .with_trait("neuroticism", TraitLevel::HIGH)
        .with_mood("happiness", TraitLevel::HIGH)
        .with_secrets(vec!["burnt the mayor's cake".into()])
        .with_shirt_sleeve(vec!["your prize-winning rye".into(), "your new oven".into()])
        .with_tasks(vec!["kneading dough".into()])
        .with_topics(vec!["the fair next week".into()]);

    println!("Prompt Synthesis Benchmark");
    println!("==========================\n");
    let prompt = synthesizer.role_prompt(&character);
    println!("Role prompt size: {} chars\n", prompt.len());

    let iterations = 100_000;

    let start = Instant::now();
    for _ in 0..iterations {
        let _prompt = synthesizer.role_prompt(&character);
    }
    let synth_duration = start.elapsed();

    println!("Role prompt synthesis:");
    println!("  {} iterations", iterations);
    println!("  Total time: {:?}", synth_duration);
    println!(
        "  Per prompt: {:.2}µs",
        synth_duration.as_micros() as f64 / iterations as f64
    );

    let mut history = ConversationHistory::new(4096, 4, EvictionPolicy::SingleEvictionPerAppend);
    history.set_system_message(prompt);
    let line = "I heard the miller say the river is running low this year, and I worry for the wheel.";

    let start = Instant::now();
    for i in 0..iterations {
        if i % 2 == 0 {
            history.append_user(line);
        } else {
            history.append_assistant(line);
        }
        let _context = history.to_ordered_messages();
    }
    let history_duration = start.elapsed();

    println!("\nHistory append + snapshot (steady state at budget):");
    println!("  {} iterations", iterations);
    println!("  Total time: {:?}", history_duration);
    println!(
        "  Per turn: {:.2}µs",
        history_duration.as_micros() as f64 / iterations as f64
    );
    println!(
        "  Retained: {} messages, {} / {} tokens",
        history.len(),
        history.current_token_total(),
        history.max_token_budget()
    );

    println!("\n\nContext:");
    println!("========");
    println!("Rate-limit interval: 3,000,000µs (3s)");
    println!("LLM processing: ~1,000,000µs+ (1+ seconds)");
}
