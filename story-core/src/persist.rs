//! Story persistence.
//!
//! Each finished story can be written two ways: a human-readable text file
//! for printing and reading aloud, and a JSON [`StoryRecord`] that keeps the
//! full profile and output so it can be listed or reloaded later.

use crate::engine::StoryOutput;
use crate::parser::AnalysisValue;
use crate::profile::StoryProfile;
use chrono::{Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current story record version.
const RECORD_VERSION: u32 = 1;

/// Name of the stories directory inside a data directory.
pub const STORIES_DIR: &str = "stories";

/// Turn a title into a file-name-safe stem.
fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let sanitized = sanitized.trim_matches('_');

    if sanitized.is_empty() {
        "story".to_string()
    } else {
        sanitized.to_string()
    }
}

/// Path of the text file for a story: `{title}_{YYYYmmdd_HHMMSS}.txt`.
pub fn story_file_path(dir: impl AsRef<Path>, title: &str, timestamp: NaiveDateTime) -> PathBuf {
    dir.as_ref().join(format!(
        "{}_{}.txt",
        sanitize_title(title),
        timestamp.format("%Y%m%d_%H%M%S")
    ))
}

/// Render a story as printable text.
pub fn render_story_file(
    profile: &StoryProfile,
    output: &StoryOutput,
    generated_at: NaiveDateTime,
) -> String {
    let mut out = String::new();

    out.push_str(&output.title);
    out.push('\n');
    out.push_str(&"=".repeat(output.title.chars().count().max(3)));
    out.push_str("\n\n");

    let characters = profile
        .characters
        .iter()
        .map(|c| format!("{} ({})", c.name(), c.age()))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!("Characters: {characters}\n"));
    out.push_str(&format!("Genre: {}\n", profile.genre.name()));
    out.push_str(&format!("Tone: {}\n", profile.tone.name()));
    out.push_str(&format!("Length: {}\n", profile.length.name()));
    out.push_str(&format!("Challenge: {}\n", profile.challenge));
    out.push_str(&format!("Magic system: {}\n", profile.magic_system));
    if let Some(ref companion) = profile.companion {
        out.push_str(&format!("Companion: {}\n", companion.label()));
    }
    if let Some(ref twist) = profile.twist {
        out.push_str(&format!("Twist: {twist}\n"));
    }
    out.push_str(&format!(
        "Generated: {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    out.push_str(&output.text);
    out.push_str("\n\n");

    if !output.key_items.is_empty() {
        out.push_str("Key Items\n---------\n");
        for item in &output.key_items {
            out.push_str(&format!("- {item}\n"));
        }
        out.push('\n');
    }

    out.push_str("Wisdom Gem\n----------\n");
    out.push_str(output.display_wisdom_gem());
    out.push('\n');

    if !output.analysis.is_empty() {
        out.push_str("\nStory Analysis\n--------------\n");
        for (key, value) in &output.analysis {
            let value = match value {
                AnalysisValue::Text(text) => text.clone(),
                AnalysisValue::List(items) => items.join("; "),
            };
            out.push_str(&format!("{}: {value}\n", analysis_label(key)));
        }
    }

    out
}

/// `reading_level` -> `Reading level`.
fn analysis_label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Write a story text file into `dir`, creating it if needed. Returns the file path.
///
/// An existing file is never overwritten: a second story with the same title
/// in the same second gets a numbered name.
pub async fn save_story_file(
    dir: impl AsRef<Path>,
    profile: &StoryProfile,
    output: &StoryOutput,
) -> Result<PathBuf, PersistError> {
    write_story_file(dir.as_ref(), profile, output, Local::now().naive_local()).await
}

/// Most numbered names tried before giving up on a free one.
const MAX_NAME_ATTEMPTS: u32 = 1000;

async fn write_story_file(
    dir: &Path,
    profile: &StoryProfile,
    output: &StoryOutput,
    generated_at: NaiveDateTime,
) -> Result<PathBuf, PersistError> {
    fs::create_dir_all(dir).await?;

    let base = story_file_path(dir, &output.title, generated_at);
    let (path, mut file) = create_unique(&base).await?;
    file.write_all(render_story_file(profile, output, generated_at).as_bytes())
        .await?;
    file.flush().await?;

    tracing::info!(path = %path.display(), "saved story file");
    Ok(path)
}

/// Create `base`, or `{stem}_2.{ext}`, `{stem}_3.{ext}`... if it is taken.
async fn create_unique(base: &Path) -> Result<(PathBuf, fs::File), PersistError> {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut path = base.to_path_buf();
    for attempt in 2..=MAX_NAME_ATTEMPTS + 1 {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                path = base.with_file_name(format!("{stem}_{attempt}.{extension}"));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("no free file name for {}", base.display()),
    )
    .into())
}

/// A generated story with everything needed to show it again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRecord {
    /// Record format version for compatibility checking.
    pub version: u32,

    pub id: Uuid,

    /// When the record was created (RFC 3339).
    pub saved_at: String,

    pub profile: StoryProfile,

    pub output: StoryOutput,
}

impl StoryRecord {
    pub fn new(profile: StoryProfile, output: StoryOutput) -> Self {
        Self {
            version: RECORD_VERSION,
            id: Uuid::new_v4(),
            saved_at: Utc::now().to_rfc3339(),
            profile,
            output,
        }
    }

    /// Default file path for this record inside `dir`.
    pub fn path_in(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(format!(
            "{}_{}.json",
            sanitize_title(&self.output.title),
            self.id.simple()
        ))
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let record: Self = serde_json::from_str(&content)?;

        if record.version != RECORD_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: RECORD_VERSION,
                found: record.version,
            });
        }

        Ok(record)
    }
}

/// Load every story record in `dir`, newest first.
///
/// A missing directory is an empty list. Files that fail to load are skipped
/// with a warning.
pub async fn list_story_records(dir: impl AsRef<Path>) -> Result<Vec<StoryRecord>, PersistError> {
    let mut records = Vec::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            match StoryRecord::load_json(&path).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable story record")
                }
            }
        }
    }

    // RFC 3339 timestamps from the same clock sort lexically
    records.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
    Ok(records)
}
