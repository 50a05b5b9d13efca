//! Front-end errors.

use story_core::{PersistError, StoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Story(#[from] StoryError),

    #[error("Could not save: {0}")]
    Persist(#[from] PersistError),

    #[error("Server error: {0}")]
    Server(String),
}
