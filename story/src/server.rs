//! HTTP API.
//!
//! ## Endpoints
//! - `POST /generate_story` - Generate one story for a single character
//! - `GET /health` - Health check

use crate::config::AppConfig;
use crate::error::AppError;
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use story_core::persist::save_story_file;
use story_core::profile::{DEFAULT_CHALLENGE, DEFAULT_MAGIC_SYSTEM};
use story_core::{
    Character, GenerationError, Genre, StoryEngine, StoryError, StoryLength, StoryOutput,
    StoryProfile, Tone, ValidationError,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

// ============================================================================
// Request / response types
// ============================================================================

fn default_personality() -> String {
    "curious and kind".to_string()
}

fn default_loves() -> String {
    "exploring new places".to_string()
}

fn default_challenge() -> String {
    DEFAULT_CHALLENGE.to_string()
}

/// Body of `POST /generate_story`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoryRequest {
    pub character_name: String,
    pub character_age: i64,
    #[serde(default)]
    pub character_gender: Option<String>,
    #[serde(default = "default_personality")]
    pub character_personality: String,
    #[serde(default = "default_loves")]
    pub character_loves: String,
    #[serde(default = "default_challenge")]
    pub challenge: String,
    #[serde(default)]
    pub genre: Genre,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub length: StoryLength,
}

impl StoryRequest {
    /// Build a validated profile. The magic system is fixed for API stories.
    pub fn into_profile(self) -> Result<StoryProfile, ValidationError> {
        let mut character = Character::from_signed_age(
            self.character_name,
            self.character_age,
            self.character_personality,
            self.character_loves,
        )?;
        if let Some(gender) = self.character_gender {
            character = character.with_gender(gender);
        }

        let challenge = if self.challenge.trim().is_empty() {
            default_challenge()
        } else {
            self.challenge
        };

        Ok(StoryProfile::new(vec![character])
            .with_genre(self.genre)
            .with_tone(self.tone)
            .with_length(self.length)
            .with_challenge(challenge)
            .with_magic_system(DEFAULT_MAGIC_SYSTEM))
    }
}

/// Body of a successful `POST /generate_story`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryResponse {
    pub title: String,
    pub text: String,
    pub wisdom_gem: String,
    pub key_items: Vec<String>,
}

impl From<StoryOutput> for StoryResponse {
    fn from(output: StoryOutput) -> Self {
        Self {
            title: output.title,
            text: output.text,
            wisdom_gem: output.wisdom_gem,
            key_items: output.key_items,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors a handler can answer with. Every variant renders as `{"detail": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// The body could not be read as a story request.
    Rejected(JsonRejection),
    Invalid(ValidationError),
    Generation(GenerationError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Invalid(err)
    }
}

impl From<StoryError> for ApiError {
    fn from(err: StoryError) -> Self {
        match err {
            StoryError::Validation(e) => ApiError::Invalid(e),
            StoryError::Generation(e) => ApiError::Generation(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Rejected(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Invalid(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ApiError::Generation(e) => {
                tracing::error!(error = %e, "story generation failed");
                let status = match e {
                    GenerationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, format!("Story generation failed: {e}"))
            }
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

// ============================================================================
// Server
// ============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: StoryEngine,
    /// Where story files are written; `None` disables saving.
    pub stories_dir: Option<PathBuf>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate_story", post(generate_story))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

/// Serve the API until Ctrl-C.
pub async fn serve(engine: StoryEngine, config: &AppConfig) -> Result<(), AppError> {
    let state = AppState {
        engine,
        stories_dir: Some(config.stories_dir()),
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Server(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("story API listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("story API shutting down");
        })
        .await
        .map_err(|e| AppError::Server(e.to_string()))
}

// ============================================================================
// HTTP Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn generate_story(
    State(state): State<AppState>,
    payload: Result<Json<StoryRequest>, JsonRejection>,
) -> Result<Json<StoryResponse>, ApiError> {
    let Json(request) = payload?;
    let profile = request.into_profile()?;

    let output = state.engine.generate_story(&profile).await?;

    if let Some(ref dir) = state.stories_dir {
        if let Err(e) = save_story_file(dir, &profile, &output).await {
            tracing::warn!(error = %e, title = %output.title, "could not save story file");
        }
    }

    Ok(Json(StoryResponse::from(output)))
}

// ============================================================================
// Tests
// ============================================================================
