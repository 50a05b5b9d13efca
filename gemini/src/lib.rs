//! Minimal Google Gemini API client.
//!
//! This crate provides a focused client for the Generative Language
//! `generateContent` endpoint with:
//! - Non-streaming completions
//! - Streaming completions over server-sent events
//! - Typed errors that keep the upstream status and message

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Environment variables checked by [`Gemini::from_env`], in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Errors that can occur when using the Gemini client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the API rejected the credential.
    pub fn is_auth(&self) -> bool {
        match self {
            Error::NoApiKey => true,
            Error::Api { status, message } => {
                matches!(status, 401 | 403)
                    || message.contains("API_KEY_INVALID")
                    || message.contains("API key not valid")
            }
            _ => false,
        }
    }

    /// Whether the API refused the call because of quota or rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Error::Api { status, message } => {
                *status == 429 || message.contains("RESOURCE_EXHAUSTED")
            }
            _ => false,
        }
    }
}

/// Gemini API client.
#[derive(Clone)]
pub struct Gemini {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl Gemini {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Create a Gemini client from `GEMINI_API_KEY` (or `GOOGLE_API_KEY`).
    pub fn from_env() -> Result<Self, Error> {
        let api_key = API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .ok_or(Error::NoApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The model used when a request does not name one.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a completion request and return the full response.
    pub async fn complete(&self, request: Request) -> Result<Response, Error> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        let api_request = self.build_api_request(&request);
        let headers = self.build_headers()?;

        tracing::debug!(%model, prompt_chars = request.prompt.len(), "sending generateContent");

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: api_error_message(&body),
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(self.parse_response(api_response, model))
    }

    /// Send a completion request and stream the response.
    pub async fn stream(
        &self,
        request: Request,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>, Error> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let url = format!(
            "{}/models/{model}:streamGenerateContent?alt=sse",
            self.base_url
        );
        let api_request = self.build_api_request(&request);
        let headers = self.build_headers()?;

        tracing::debug!(%model, "opening streamGenerateContent");

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: api_error_message(&body),
            });
        }

        // Use scan to keep a byte buffer for SSE lines (and UTF-8 sequences)
        // split across chunks
        let stream = response
            .bytes_stream()
            .scan(Vec::new(), |buffer: &mut Vec<u8>, result| {
                let events = match result {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);
                        parse_sse_events_buffered(buffer)
                    }
                    Err(e) => vec![Err(Error::Network(e.to_string()))],
                };
                futures::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(stream))
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        if self.api_key.trim().is_empty() {
            return Err(Error::NoApiKey);
        }
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }

    fn build_api_request(&self, request: &Request) -> ApiRequest {
        let generation_config = if request.temperature.is_some()
            || request.max_output_tokens.is_some()
        {
            Some(ApiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            })
        } else {
            None
        };

        ApiRequest {
            contents: vec![ApiContent {
                role: Some("user".to_string()),
                parts: vec![ApiPart {
                    text: Some(request.prompt.clone()),
                }],
            }],
            system_instruction: request.system.as_ref().map(|system| ApiContent {
                role: None,
                parts: vec![ApiPart {
                    text: Some(system.clone()),
                }],
            }),
            generation_config,
        }
    }

    fn parse_response(&self, api_response: ApiResponse, model: String) -> Response {
        let candidate = api_response.candidates.into_iter().next();

        let (parts, finish_reason) = match candidate {
            Some(c) => (
                c.content
                    .map(|content| {
                        content
                            .parts
                            .into_iter()
                            .filter_map(|p| p.text)
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default(),
                c.finish_reason.as_deref().map(FinishReason::from_api),
            ),
            None => (Vec::new(), None),
        };

        Response {
            model: api_response.model_version.unwrap_or(model),
            parts,
            finish_reason,
            block_reason: api_response
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason),
            usage: api_response
                .usage_metadata
                .map(|u| Usage {
                    prompt_tokens: u.prompt_token_count,
                    output_tokens: u.candidates_token_count,
                })
                .unwrap_or_default(),
        }
    }
}

/// Pull `error.message` out of a Google API error body, or return the body as-is.
fn api_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: ApiError,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) => format!("{status}: {}", envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) => body.to_string(),
    }
}

// ============================================================================
// Public types
// ============================================================================

/// A single-turn generation request.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl Request {
    /// Create a new request for the given user prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            prompt: prompt.into(),
            system: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// A completion response from Gemini.
#[derive(Debug, Clone)]
pub struct Response {
    pub model: String,
    pub parts: Vec<String>,
    pub finish_reason: Option<FinishReason>,
    /// Set when the prompt itself was rejected by safety filters.
    pub block_reason: Option<String>,
    pub usage: Usage,
}

impl Response {
    /// Get all text parts of the first candidate concatenated.
    pub fn text(&self) -> String {
        self.parts.concat()
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other(String),
}

impl FinishReason {
    fn from_api(reason: &str) -> Self {
        match reason {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub output_tokens: usize,
}

// ============================================================================
// Streaming types
// ============================================================================

/// Events from a streaming response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    TextDelta { text: String },
    Finished { reason: FinishReason },
    Blocked { reason: String },
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<ApiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<ApiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<ApiUsage>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Parse SSE events from a buffer, consuming complete lines and leaving incomplete data.
///
/// Lines are decoded only once their newline has arrived, so a multi-byte
/// character split between network chunks is never mangled. Each `data:` line
/// carries one complete `GenerateContentResponse` chunk; a line that fails to
/// decode is reported and dropped.
fn parse_sse_events_buffered(buffer: &mut Vec<u8>) -> Vec<Result<StreamEvent, Error>> {
    let mut events = Vec::new();

    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=newline_pos).collect();

        let line = match std::str::from_utf8(&line) {
            Ok(line) => line.trim_end_matches(['\r', '\n']),
            Err(e) => {
                events.push(Err(Error::Parse(format!("SSE line is not UTF-8: {e}"))));
                continue;
            }
        };

        let Some(json_str) = line.strip_prefix("data:") else {
            continue;
        };
        let json_str = json_str.trim_start();
        if json_str.is_empty() {
            continue;
        }

        match serde_json::from_str::<ApiResponse>(json_str) {
            Ok(chunk) => events.extend(convert_stream_chunk(chunk).into_iter().map(Ok)),
            Err(e) => events.push(Err(Error::Parse(format!("SSE parse error: {e}")))),
        }
    }

    events
}

fn convert_stream_chunk(chunk: ApiResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
        events.push(StreamEvent::Blocked { reason });
    }

    for candidate in chunk.candidates {
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if !text.is_empty() {
            events.push(StreamEvent::TextDelta { text });
        }
        if let Some(reason) = candidate.finish_reason.as_deref() {
            events.push(StreamEvent::Finished {
                reason: FinishReason::from_api(reason),
            });
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Gemini::new("test-key");
        assert_eq!(client.model, DEFAULT_MODEL);
        assert_eq!(client.base_url, API_BASE);
    }

    #[test]
    fn test_client_with_model_and_base_url() {
        let client = Gemini::new("test-key")
            .with_model("gemini-1.5-pro")
            .with_base_url("http://localhost:9000/");
        assert_eq!(client.model(), "gemini-1.5-pro");
        assert_eq!(client.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_request_builder() {
        let request = Request::new("Tell me a story")
            .with_system("You are a storyteller")
            .with_max_output_tokens(1000)
            .with_temperature(0.7);

        assert_eq!(request.max_output_tokens, Some(1000));
        assert!(request.system.is_some());
        assert_eq!(request.temperature, Some(0.7));
    }

    #[test]
    fn test_api_request_serialization() {
        let client = Gemini::new("k");
        let request = Request::new("hello").with_temperature(0.5);
        let json = serde_json::to_value(client.build_api_request(&request)).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_empty_key_rejected() {
        let client = Gemini::new("  ");
        assert!(matches!(client.build_headers(), Err(Error::NoApiKey)));
    }

    #[test]
    fn test_error_classification() {
        let unauthorized = Error::Api {
            status: 401,
            message: "nope".to_string(),
        };
        assert!(unauthorized.is_auth());

        let bad_key = Error::Api {
            status: 400,
            message: "INVALID_ARGUMENT: API key not valid. Please pass a valid API key.".to_string(),
        };
        assert!(bad_key.is_auth());

        let quota = Error::Api {
            status: 429,
            message: "RESOURCE_EXHAUSTED: quota".to_string(),
        };
        assert!(quota.is_rate_limited());
        assert!(!quota.is_auth());
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(api_error_message(body), "RESOURCE_EXHAUSTED: Quota exceeded");
        assert_eq!(api_error_message("plain failure"), "plain failure");
    }

    #[test]
    fn test_sse_parsing_across_chunks() {
        let mut buffer = b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Once \"}]}}]}\r\n\r\ndata: {\"candidates\":[{\"content\":{\"parts\":[{\"te".to_vec();

        let first = parse_sse_events_buffered(&mut buffer);
        assert_eq!(first.len(), 1);
        assert_eq!(
            first[0].as_ref().unwrap(),
            &StreamEvent::TextDelta {
                text: "Once ".to_string()
            }
        );

        buffer.extend_from_slice(b"xt\":\"upon\"}]},\"finishReason\":\"STOP\"}]}\r\n\r\n");
        let second = parse_sse_events_buffered(&mut buffer);
        assert_eq!(second.len(), 2);
        assert_eq!(
            second[1].as_ref().unwrap(),
            &StreamEvent::Finished {
                reason: FinishReason::Stop
            }
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sse_emoji_split_across_chunks() {
        let line = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Owl 🦉 here\"}]}}]}\n\n";
        let bytes = line.as_bytes();
        let owl = line.find('🦉').unwrap();

        // Cut inside the four-byte owl
        let mut buffer = bytes[..owl + 2].to_vec();
        assert!(parse_sse_events_buffered(&mut buffer).is_empty());

        buffer.extend_from_slice(&bytes[owl + 2..]);
        let events = parse_sse_events_buffered(&mut buffer);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &StreamEvent::TextDelta {
                text: "Owl 🦉 here".to_string()
            }
        );
    }

    #[test]
    fn test_sse_bad_line_does_not_block_later_events() {
        let mut buffer = b"data: {\"candidates\":[\n\ndata: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hello\"}]}}]}\n\n".to_vec();

        let events = parse_sse_events_buffered(&mut buffer);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Err(Error::Parse(_))));
        assert_eq!(
            events[1].as_ref().unwrap(),
            &StreamEvent::TextDelta {
                text: "Hello".to_string()
            }
        );
        assert!(buffer.is_empty());
    }
}
