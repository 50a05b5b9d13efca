//! Magical Story Creator.
//!
//! Creates personalized children's stories with Gemini, either through an
//! interactive terminal intake or as an HTTP API.
//!
//! ```bash
//! cargo run -p story                        # interactive
//! cargo run -p story -- --serve --port 8000 # HTTP API
//! ```

mod config;
mod error;
mod intake;
mod interactive;
mod logging;
mod report;
mod server;

use config::AppConfig;
use error::AppError;
use gemini::Gemini;
use std::sync::Arc;
use story_core::{Catalog, EngineConfig, GeminiGenerator, StoryEngine};

const TEMPERATURE: f32 = 0.8;
const MAX_OUTPUT_TOKENS: u32 = 4096;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let config = AppConfig::from_args(&args)?;

    if config.help {
        config::print_help();
        return Ok(());
    }

    // The terminal belongs to the story in interactive mode
    let default_filter = if config.serve { "info,story=debug" } else { "warn" };
    let _log_guard = logging::init(Some(&config.logs_dir()), default_filter);

    let mut client = Gemini::from_env().map_err(|e| {
        AppError::Config(format!(
            "{e}. Set GEMINI_API_KEY in a .env file or with: export GEMINI_API_KEY=your_key_here"
        ))
    })?;
    if let Some(ref model) = config.model {
        client = client.with_model(model);
    }
    tracing::info!(model = %client.model(), "using Gemini");

    let generator = GeminiGenerator::new(client)
        .with_temperature(TEMPERATURE)
        .with_max_output_tokens(MAX_OUTPUT_TOKENS);

    let catalog = Catalog::load(&config.data_dir).await;
    let engine = StoryEngine::new(Arc::new(generator))
        .with_config(EngineConfig::new().with_analysis(config.analysis))
        .with_catalog(catalog);

    if config.serve {
        server::serve(engine, &config).await
    } else {
        interactive::run(&engine, &config).await
    }
}
