//! The generation boundary.
//!
//! The engine only ever sees a [`TextGenerator`]: a prompt goes in, text comes
//! out. The credential is bound when the concrete generator is built, so tests
//! can swap in [`crate::testing::MockGenerator`] without touching the network.

use async_trait::async_trait;
use futures::StreamExt;
use gemini::{FinishReason, Gemini, Request, StreamEvent};
use thiserror::Error;

/// Errors from a text generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Quota exceeded: {0}")]
    Quota(String),

    #[error("The generator returned an empty response")]
    EmptyResponse,

    #[error("Generation was blocked: {0}")]
    Blocked(String),

    #[error("Upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Generation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<gemini::Error> for GenerationError {
    fn from(err: gemini::Error) -> Self {
        if err.is_auth() {
            return GenerationError::Auth(err.to_string());
        }
        if err.is_rate_limited() {
            return GenerationError::Quota(err.to_string());
        }
        match err {
            gemini::Error::Network(message) => GenerationError::Network(message),
            gemini::Error::Api { status, message } => GenerationError::Upstream { status, message },
            gemini::Error::Parse(message) => GenerationError::Malformed(message),
            // An API key that cannot be sent as a header is a credential problem.
            gemini::Error::Config(message) => GenerationError::Auth(message),
            gemini::Error::NoApiKey => GenerationError::Auth("API key not configured".to_string()),
        }
    }
}

/// Something that turns a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a single prompt.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Short name for logs.
    fn name(&self) -> &str;

    /// Generate text, handing each chunk to `on_chunk` as it arrives.
    ///
    /// Returns the full text. Generators without streaming support deliver
    /// the whole response as one chunk.
    async fn generate_streaming(
        &self,
        prompt: &str,
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
    ) -> Result<String, GenerationError> {
        let text = self.generate(prompt).await?;
        on_chunk(&text);
        Ok(text)
    }
}

/// [`TextGenerator`] backed by the Gemini API.
#[derive(Clone)]
pub struct GeminiGenerator {
    client: Gemini,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl GeminiGenerator {
    pub fn new(client: Gemini) -> Self {
        Self {
            client,
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    fn request(&self, prompt: &str) -> Request {
        let mut request = Request::new(prompt);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_output_tokens) = self.max_output_tokens {
            request = request.with_max_output_tokens(max_output_tokens);
        }
        request
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let response = self.client.complete(self.request(prompt)).await?;

        if let Some(reason) = &response.block_reason {
            return Err(GenerationError::Blocked(reason.clone()));
        }

        let text = response.text();
        if text.trim().is_empty() {
            return Err(match response.finish_reason {
                Some(FinishReason::Safety) => GenerationError::Blocked("SAFETY".to_string()),
                _ => GenerationError::EmptyResponse,
            });
        }

        if response.finish_reason == Some(FinishReason::MaxTokens) {
            tracing::warn!(model = %response.model, "generation stopped at the output token limit");
        }
        tracing::debug!(
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            output_tokens = response.usage.output_tokens,
            "generation complete"
        );

        Ok(text)
    }

    fn name(&self) -> &str {
        self.client.model()
    }

    async fn generate_streaming(
        &self,
        prompt: &str,
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
    ) -> Result<String, GenerationError> {
        let mut stream = self.client.stream(self.request(prompt)).await?;
        let mut text = String::new();

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta { text: delta } => {
                    on_chunk(&delta);
                    text.push_str(&delta);
                }
                StreamEvent::Finished { reason } => {
                    if reason == FinishReason::Safety && text.trim().is_empty() {
                        return Err(GenerationError::Blocked("SAFETY".to_string()));
                    }
                    tracing::debug!(?reason, chars = text.len(), "stream finished");
                }
                StreamEvent::Blocked { reason } => return Err(GenerationError::Blocked(reason)),
            }
        }

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let auth = gemini::Error::Api {
            status: 400,
            message: "INVALID_ARGUMENT: API key not valid. Please pass a valid API key.".into(),
        };
        assert!(matches!(GenerationError::from(auth), GenerationError::Auth(_)));

        let quota = gemini::Error::Api {
            status: 429,
            message: "RESOURCE_EXHAUSTED: Quota exceeded".into(),
        };
        assert!(matches!(GenerationError::from(quota), GenerationError::Quota(_)));

        let upstream = gemini::Error::Api {
            status: 500,
            message: "INTERNAL: oops".into(),
        };
        assert_eq!(
            GenerationError::from(upstream),
            GenerationError::Upstream {
                status: 500,
                message: "INTERNAL: oops".into()
            }
        );

        assert_eq!(
            GenerationError::from(gemini::Error::Network("connection refused".into())),
            GenerationError::Network("connection refused".into())
        );
        assert!(matches!(
            GenerationError::from(gemini::Error::Parse("eof".into())),
            GenerationError::Malformed(_)
        ));
        assert!(matches!(
            GenerationError::from(gemini::Error::NoApiKey),
            GenerationError::Auth(_)
        ));
    }

    #[test]
    fn test_upstream_reason_is_preserved_in_message() {
        let err = GenerationError::Upstream {
            status: 503,
            message: "UNAVAILABLE: model overloaded".into(),
        };
        assert!(err.to_string().contains("UNAVAILABLE: model overloaded"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_request_carries_settings() {
        let generator = GeminiGenerator::new(Gemini::new("key"))
            .with_temperature(0.7)
            .with_max_output_tokens(2048);
        let request = generator.request("hello");

        assert_eq!(request.prompt, "hello");
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_output_tokens, Some(2048));
        assert!(request.model.is_none());
    }

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            Ok(format!("echo: {prompt}"))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_default_streaming_delivers_one_chunk() {
        let mut chunks: Vec<String> = Vec::new();
        let text = Echo
            .generate_streaming("hi", &mut |chunk: &str| chunks.push(chunk.to_string()))
            .await
            .unwrap();

        assert_eq!(text, "echo: hi");
        assert_eq!(chunks, vec!["echo: hi"]);
    }
}
