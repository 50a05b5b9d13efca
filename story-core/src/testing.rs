//! Testing utilities.
//!
//! [`MockGenerator`] stands in for a real text generator so the whole story
//! pipeline can be exercised without API calls.

use crate::generator::{GenerationError, TextGenerator};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A complete tagged story, handy as a scripted response.
pub const SAMPLE_STORY: &str = "[TITLE: Mia and the Moonlit Garden]\n\
Mia tiptoed into the garden and found [KEY ITEM: a glowing watering can] beside the gate.\n\
With Professor Hoot's help she watered the sleepy flowers until they sang.\n\
At the end of the path waited [KEY ITEM: the silver seed].\n\
[WISDOM GEM: Being brave means trying even when you feel small.]";

/// A well-formed analysis response for [`SAMPLE_STORY`].
pub const SAMPLE_ANALYSIS: &str = "[TARGET_AGE: 5-7]\n\
[READING_LEVEL: Early Reader]\n\
[THEMES: courage, curiosity]\n\
[ILLUSTRATION_IDEAS: Mia at the garden gate; the flowers singing; the silver seed glowing]";

/// Returned once the scripted responses run out.
const FALLBACK_RESPONSE: &str = "[TITLE: A Quiet Day]\nNothing much happened today.";

/// A generator that returns scripted responses in order.
pub struct MockGenerator {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockGenerator {
    /// Create a mock with scripted responses.
    pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// A mock that answers with [`SAMPLE_STORY`] and then [`SAMPLE_ANALYSIS`].
    pub fn with_sample_story() -> Self {
        Self::new(vec![
            Ok(SAMPLE_STORY.to_string()),
            Ok(SAMPLE_ANALYSIS.to_string()),
        ])
    }

    /// Sleep before every response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a text response.
    pub fn queue_text(&self, text: impl Into<String>) {
        self.lock_responses().push_back(Ok(text.into()));
    }

    /// Queue an error.
    pub fn queue_error(&self, error: GenerationError) {
        self.lock_responses().push_back(Err(error));
    }

    /// Every prompt received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of generate calls so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, GenerationError>>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_response(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        self.lock_responses()
            .pop_front()
            .unwrap_or_else(|| Ok(FALLBACK_RESPONSE.to_string()))
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let response = self.next_response(prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        response
    }

    fn name(&self) -> &str {
        "mock"
    }

    /// Delivers the response one line at a time.
    async fn generate_streaming(
        &self,
        prompt: &str,
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
    ) -> Result<String, GenerationError> {
        let text = self.generate(prompt).await?;
        for line in text.split_inclusive('\n') {
            on_chunk(line);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_in_order_then_fallback() {
        let mock = MockGenerator::new(vec![
            Ok("one".to_string()),
            Err(GenerationError::EmptyResponse),
        ]);

        assert_eq!(mock.generate("a").await.unwrap(), "one");
        assert_eq!(
            mock.generate("b").await.unwrap_err(),
            GenerationError::EmptyResponse
        );
        assert_eq!(mock.generate("c").await.unwrap(), FALLBACK_RESPONSE);
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_mock_streams_lines() {
        let mock = MockGenerator::with_sample_story();
        let mut chunks = Vec::new();
        let text = mock
            .generate_streaming("p", &mut |chunk: &str| chunks.push(chunk.to_string()))
            .await
            .unwrap();

        assert_eq!(text, SAMPLE_STORY);
        assert_eq!(chunks.len(), SAMPLE_STORY.lines().count());
        assert_eq!(chunks.concat(), SAMPLE_STORY);
    }
}
