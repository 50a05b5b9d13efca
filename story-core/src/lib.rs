//! Personalized children's story engine.
//!
//! This crate provides:
//! - The story profile model (characters, companion, genre, tone, length)
//! - Prompt construction and tag parsing for generated stories
//! - A [`StoryEngine`] that runs generation and an optional analysis pass
//! - Story files, story records and a capped store of saved characters
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use story_core::{Character, GeminiGenerator, StoryEngine, StoryProfile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = gemini::Gemini::from_env()?;
//!     let engine = StoryEngine::new(Arc::new(GeminiGenerator::new(client)));
//!
//!     let mia = Character::new("Mia", 7, "curious and kind", "drawing dragons")?;
//!     let story = engine.generate_story(&StoryProfile::new(vec![mia])).await?;
//!
//!     println!("{}\n\n{}", story.title, story.text);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod engine;
pub mod generator;
pub mod parser;
pub mod persist;
pub mod profile;
pub mod prompt;
pub mod store;
pub mod testing;

// Primary public API
pub use catalog::Catalog;
pub use engine::{EngineConfig, StoryEngine, StoryError, StoryOutput, DEFAULT_WISDOM_GEM};
pub use generator::{GeminiGenerator, GenerationError, TextGenerator};
pub use parser::{parse_analysis, parse_story, AnalysisValue, ParsedStory, StoryAnalysis};
pub use persist::{save_story_file, PersistError, StoryRecord};
pub use profile::{
    Character, Genre, HookStyle, MagicalCompanion, StoryLength, StoryProfile, Tone,
    ValidationError,
};
pub use store::CharacterStore;
pub use testing::MockGenerator;
