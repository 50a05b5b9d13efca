//! The story engine.
//!
//! [`StoryEngine`] is the one context object a front end needs: it owns the
//! generator, the catalog and the engine settings, and runs the
//! prompt → generate → parse → analyze pipeline. It is cheap to clone and
//! safe to share between concurrent requests.

use crate::catalog::Catalog;
use crate::generator::{GenerationError, TextGenerator};
use crate::parser::{parse_analysis, parse_story, AnalysisValue, ParsedStory, StoryAnalysis};
use crate::profile::{StoryProfile, ValidationError};
use crate::prompt::{build_analysis_prompt, build_story_prompt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Wisdom gem shown to readers when the generator did not provide one.
///
/// Presentation only: a [`StoryOutput`] keeps an empty `wisdom_gem`.
pub const DEFAULT_WISDOM_GEM: &str =
    "Believing in yourself is the first step to any great adventure.";

/// How long a single generator call may take before it is abandoned.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Errors from generating a story.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("Invalid story request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Story generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Run the second analysis pass after each story.
    pub analysis_enabled: bool,

    /// Upper bound on each generator call.
    pub request_timeout: Duration,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            analysis_enabled: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_analysis(mut self, enabled: bool) -> Self {
        self.analysis_enabled = enabled;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The structured result of generating one story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryOutput {
    pub title: String,
    pub text: String,
    pub key_items: Vec<String>,
    /// Empty when the generator gave none; see [`StoryOutput::display_wisdom_gem`].
    pub wisdom_gem: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub analysis: BTreeMap<String, AnalysisValue>,
}

impl StoryOutput {
    /// The wisdom gem to show a reader, falling back to [`DEFAULT_WISDOM_GEM`].
    pub fn display_wisdom_gem(&self) -> &str {
        if self.wisdom_gem.trim().is_empty() {
            DEFAULT_WISDOM_GEM
        } else {
            &self.wisdom_gem
        }
    }
}

impl From<ParsedStory> for StoryOutput {
    fn from(parsed: ParsedStory) -> Self {
        Self {
            title: parsed.title,
            text: parsed.text,
            key_items: parsed.key_items,
            wisdom_gem: parsed.wisdom_gem,
            analysis: BTreeMap::new(),
        }
    }
}

/// Generates stories from profiles.
#[derive(Clone)]
pub struct StoryEngine {
    generator: Arc<dyn TextGenerator>,
    config: EngineConfig,
    catalog: Arc<Catalog>,
}

impl StoryEngine {
    /// Create an engine with default settings and the built-in catalog.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            config: EngineConfig::default(),
            catalog: Arc::new(Catalog::builtin()),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Generate, parse and (optionally) analyze one story.
    ///
    /// A failed analysis pass is logged and leaves the analysis map empty; it
    /// never fails the story.
    pub async fn generate_story(&self, profile: &StoryProfile) -> Result<StoryOutput, StoryError> {
        profile.validate()?;
        let prompt = build_story_prompt(profile);

        tracing::info!(
            characters = %profile.character_names(),
            genre = profile.genre.name(),
            generator = self.generator.name(),
            "generating story"
        );

        let raw = self.with_timeout(self.generator.generate(&prompt)).await?;
        self.finish(raw).await
    }

    /// Like [`generate_story`](Self::generate_story), handing raw text chunks to
    /// `on_chunk` as they arrive. Chunks still contain tag markup.
    pub async fn generate_story_streaming(
        &self,
        profile: &StoryProfile,
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
    ) -> Result<StoryOutput, StoryError> {
        profile.validate()?;
        let prompt = build_story_prompt(profile);

        tracing::info!(
            characters = %profile.character_names(),
            generator = self.generator.name(),
            "streaming story"
        );

        let raw = self
            .with_timeout(self.generator.generate_streaming(&prompt, on_chunk))
            .await?;
        self.finish(raw).await
    }

    /// Run the analysis pass on finished story text.
    pub async fn analyze_story(&self, story_text: &str) -> Result<StoryAnalysis, GenerationError> {
        let prompt = build_analysis_prompt(story_text);
        let raw = self.with_timeout(self.generator.generate(&prompt)).await?;
        Ok(parse_analysis(&raw))
    }

    async fn finish(&self, raw: String) -> Result<StoryOutput, StoryError> {
        if raw.trim().is_empty() {
            return Err(GenerationError::EmptyResponse.into());
        }

        let mut output = StoryOutput::from(parse_story(&raw));
        // A reply made only of tags has no story to tell
        if output.text.is_empty() {
            tracing::warn!(title = %output.title, "generator returned tags but no story text");
            return Err(GenerationError::EmptyResponse.into());
        }

        if self.config.analysis_enabled {
            match self.analyze_story(&output.text).await {
                Ok(analysis) => output.analysis = analysis.into_map(),
                Err(e) => {
                    tracing::warn!(error = %e, title = %output.title, "story analysis failed, continuing without it");
                }
            }
        }

        tracing::info!(
            title = %output.title,
            key_items = output.key_items.len(),
            analyzed = !output.analysis.is_empty(),
            "story ready"
        );
        Ok(output)
    }

    async fn with_timeout<F>(&self, call: F) -> Result<String, GenerationError>
    where
        F: Future<Output = Result<String, GenerationError>>,
    {
        let limit = self.config.request_timeout;
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| GenerationError::Timeout {
                seconds: limit.as_secs(),
            })?
    }
}
