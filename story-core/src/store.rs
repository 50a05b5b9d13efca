//! Saved characters.
//!
//! Characters the user has created are kept in a small JSON file so they can
//! be picked again next time. The file holds at most [`MAX_SAVED_CHARACTERS`]
//! entries, de-duplicated by name, most recent last.
//!
//! Every read-modify-write goes through one async lock per file path. Handles
//! opened separately on the same path share that lock, so concurrent saves
//! from different requests never lose each other's characters.

use crate::persist::PersistError;
use crate::profile::Character;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

/// Number of characters the store keeps.
pub const MAX_SAVED_CHARACTERS: usize = 20;

/// File name of the character store inside a data directory.
pub const CHARACTERS_FILE: &str = "characters.json";

lazy_static::lazy_static! {
    static ref STORE_LOCKS: std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>> =
        std::sync::Mutex::new(HashMap::new());
}

/// The writer lock for a store path, shared by every handle on that path.
fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let key = lock_key(path);
    let mut locks = STORE_LOCKS.lock().unwrap_or_else(|e| e.into_inner());
    locks.entry(key).or_default().clone()
}

/// One key per store file however the path is spelled.
///
/// `.` and `..` are folded away first; when the parent directory exists it is
/// canonicalized so symlinked spellings meet as well.
fn lock_key(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }

    let canonical = match (normalized.parent(), normalized.file_name()) {
        (Some(parent), Some(name)) => std::fs::canonicalize(parent)
            .ok()
            .map(|dir| dir.join(name)),
        _ => None,
    };
    canonical.unwrap_or(normalized)
}

/// Handle on a character store file.
#[derive(Debug, Clone)]
pub struct CharacterStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl CharacterStore {
    /// Open the store at `path`. The file is created on first save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = lock_for(&path);
        Self { path, lock }
    }

    /// Open `characters.json` inside a data directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::open(dir.as_ref().join(CHARACTERS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All saved characters, oldest first.
    ///
    /// A missing file is an empty store. A corrupt file is logged and treated
    /// as empty; records that fail validation are skipped.
    pub async fn load(&self) -> Vec<Character> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Find a saved character by exact name.
    pub async fn find(&self, name: &str) -> Option<Character> {
        self.load().await.into_iter().find(|c| c.name() == name)
    }

    /// Save one character.
    pub async fn save(&self, character: &Character) -> Result<(), PersistError> {
        self.save_all(std::slice::from_ref(character)).await
    }

    /// Save characters whose names are not already stored, then trim to the
    /// most recent [`MAX_SAVED_CHARACTERS`].
    ///
    /// A name that is already present keeps its stored record and position.
    pub async fn save_all(&self, characters: &[Character]) -> Result<(), PersistError> {
        let _guard = self.lock.lock().await;

        let mut saved = self.read().await;
        let mut added = 0;
        for character in characters {
            if !saved.iter().any(|c| c.name() == character.name()) {
                saved.push(character.clone());
                added += 1;
            }
        }
        if added == 0 {
            return Ok(());
        }

        let excess = saved.len().saturating_sub(MAX_SAVED_CHARACTERS);
        saved.drain(..excess);

        self.write(&saved).await?;
        tracing::debug!(path = %self.path.display(), added, total = saved.len(), "saved characters");
        Ok(())
    }

    async fn read(&self) -> Vec<Character> {
        let values: Vec<serde_json::Value> = crate::catalog::load_json_list(&self.path).await;

        values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Character>(value) {
                Ok(character) => Some(character),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "skipping invalid saved character");
                    None
                }
            })
            .collect()
    }

    async fn write(&self, characters: &[Character]) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(characters)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
