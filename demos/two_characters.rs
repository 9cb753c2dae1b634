//! Two Characters in a Market Square
//!
//! This demo puts two generated characters within earshot of each other and lets them talk
//! through the shared request scheduler. It showcases:
//!
//! - **Prompt synthesis**: role prompts rendered from the bundled `vocabulary/` corpus
//! - **Single-flight scheduling**: both characters share one rate-limited queue
//! - **Audience fan-out**: each spoken line is heard by the other character, who replies
//! - **Denial handling**: a character with nothing to say is regenerated from the scenario lists
//!
//! Run with:
//!
//! ```text
//! OPEN_AI_SECRET=sk-... RUST_LOG=persona_chat=debug cargo run --example two_characters
//! ```

use async_trait::async_trait;
use persona_chat::event::{CharacterEvent, EventHandler};
use persona_chat::{
    Audience, ConversationController, DenialPolicy, OpenAIClient, PipelineConfig,
    PromptSynthesizer, RequestScheduler, ScenarioCorpus, ScenarioGenerator, VocabularyLayout,
    VocabularyTables,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Prints every line spoken and signals once enough lines have been said.
struct Transcript {
    spoken: AtomicUsize,
    limit: usize,
    done: Notify,
}

#[async_trait]
impl EventHandler for Transcript {
    async fn on_character_event(&self, event: &CharacterEvent) {
        match event {
            CharacterEvent::Spoke { name, text, .. } => {
                println!("{}: {}", name, text);
                if self.spoken.fetch_add(1, Ordering::SeqCst) + 1 >= self.limit {
                    self.done.notify_one();
                }
            }
            CharacterEvent::Regenerated {
                old_name, new_name, ..
            } => println!("({} had nothing to say and became {})", old_name, new_name),
            CharacterEvent::Failed { name, error, .. } => {
                eprintln!("({}'s request failed: {})", name, error)
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    persona_chat::init_logger();

    let config = PipelineConfig::from_env()?;
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("vocabulary");
    let tables = VocabularyTables::load(&root, &VocabularyLayout::default())?;
    let synthesizer = Arc::new(PromptSynthesizer::new(tables));
    let generator = Arc::new(ScenarioGenerator::new(ScenarioCorpus::load(
        &root.join("scenario"),
    )?));

    let client = Arc::new(OpenAIClient::new_with_url(
        &config.api_key,
        &config.model,
        &config.api_url,
    ));
    let scheduler = RequestScheduler::from_config(client, &config)?;

    let transcript = Arc::new(Transcript {
        spoken: AtomicUsize::new(0),
        limit: 6,
        done: Notify::new(),
    });
    let square = Arc::new(Audience::new());

    let (first, second) = {
        let mut rng = rand::thread_rng();
        (
            generator.random_character(&mut rng),
            generator.random_character(&mut rng),
        )
    };
    println!(
        "{} ({}) meets {} ({}).\n",
        first.name, first.backstory, second.name, second.backstory
    );

    let make = |id: &str, personality| {
        Arc::new(
            ConversationController::from_config(
                id,
                synthesizer.clone(),
                scheduler.clone(),
                personality,
                &config,
            )
            .with_audience(square.clone())
            .with_event_handler(transcript.clone())
            .with_denial_policy(DenialPolicy::Regenerate(generator.clone())),
        )
    };
    let a = make("a", first);
    let b = make("b", second);
    a.look_at(Some("b".into()));
    b.look_at(Some("a".into()));
    square.subscribe(a.listener());
    square.subscribe(b.listener());

    a.assess_surroundings(&["a busy market square", b.personality().backstory.as_str()])
        .await;

    if tokio::time::timeout(Duration::from_secs(120), transcript.done.notified())
        .await
        .is_err()
    {
        println!("\n(the conversation petered out)");
    }
    Ok(())
}
