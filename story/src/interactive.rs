//! Interactive terminal mode.
//!
//! Collects a profile, generates the story, shows the report, then saves
//! the story and remembers the characters for next time.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::intake::{self, Prompter};
use crate::report;
use std::io::{self, Write};
use story_core::persist::save_story_file;
use story_core::{CharacterStore, StoryEngine, StoryError, StoryOutput, StoryProfile, StoryRecord};

/// Run story sessions until the user is done.
pub async fn run(engine: &StoryEngine, config: &AppConfig) -> Result<(), AppError> {
    let store = CharacterStore::in_dir(&config.data_dir);

    loop {
        let saved = store.load().await;
        let profile = {
            let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
            let mut rng = rand::thread_rng();
            intake::collect_profile(&mut prompter, &saved, engine.catalog(), &mut rng)?
        };

        println!("\n🪄 Writing a story for {}...\n", profile.character_names());

        match generate(engine, &profile, config.stream).await {
            Ok(output) => {
                println!("{}", report::render(&profile, &output));
                if let Err(e) = save(&store, config, profile, output).await {
                    tracing::error!(error = %e, "saving story failed");
                    println!("[ERROR] {e}");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "story generation failed");
                println!("[ERROR] {e}");
            }
        }

        let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
        if !prompter.yes_no("\nCreate another story?", false)? {
            println!("Sweet dreams! 🌙");
            return Ok(());
        }
    }
}

async fn generate(
    engine: &StoryEngine,
    profile: &StoryProfile,
    stream: bool,
) -> Result<StoryOutput, StoryError> {
    if !stream {
        print!("[WRITING]");
        io::stdout().flush().ok();
        let output = engine.generate_story(profile).await;
        print!("\r         \r");
        io::stdout().flush().ok();
        return output;
    }

    let output = engine
        .generate_story_streaming(profile, &mut |chunk: &str| {
            print!("{chunk}");
            io::stdout().flush().ok();
        })
        .await;
    println!();
    output
}

async fn save(
    store: &CharacterStore,
    config: &AppConfig,
    profile: StoryProfile,
    output: StoryOutput,
) -> Result<(), AppError> {
    if let Err(e) = store.save_all(&profile.characters).await {
        tracing::warn!(error = %e, "could not save characters");
        println!("(Could not remember these characters: {e})");
    }

    let stories_dir = config.stories_dir();
    let path = save_story_file(&stories_dir, &profile, &output).await?;

    let record = StoryRecord::new(profile, output);
    record.save_json(record.path_in(&stories_dir)).await?;

    println!("📖 Story saved to {}", path.display());
    Ok(())
}
