//! Companion and twist catalog.
//!
//! The built-in catalog ships with the crate. A data directory may override
//! either list with `companions.json` / `twists.json`; unreadable or corrupt
//! files fail soft to an empty list and the built-in entries are used instead.

use crate::profile::MagicalCompanion;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;

/// File name of the companion override inside a data directory.
pub const COMPANIONS_FILE: &str = "companions.json";

/// File name of the twist override inside a data directory.
pub const TWISTS_FILE: &str = "twists.json";

fn companion(
    name: &str,
    emoji: &str,
    species: &str,
    appearance: &str,
    personality: &str,
    quirk: &str,
    special_ability: &str,
) -> MagicalCompanion {
    MagicalCompanion {
        name: name.to_string(),
        emoji: emoji.to_string(),
        species: species.to_string(),
        appearance: appearance.to_string(),
        personality: personality.to_string(),
        quirk: quirk.to_string(),
        special_ability: special_ability.to_string(),
    }
}

lazy_static::lazy_static! {
    /// Companions available when no override file is present.
    pub static ref BUILTIN_COMPANIONS: Vec<MagicalCompanion> = vec![
        companion(
            "Professor Hoot",
            "🦉",
            "wise old owl",
            "silver feathers and tiny round spectacles",
            "patient and thoughtful",
            "hoots a little tune before giving advice",
            "can read any book, map or secret code",
        ),
        companion(
            "Sparkle",
            "🦄",
            "baby unicorn",
            "a rainbow mane that glows in the dark",
            "bubbly and endlessly cheerful",
            "giggles so hard that glitter falls out of her mane",
            "heals scrapes and sad feelings with a touch of her horn",
        ),
        companion(
            "Bolt",
            "🤖",
            "pocket-sized robot",
            "shiny copper body with one blinking blue eye",
            "curious and a little clumsy",
            "beeps the wrong word when he gets excited",
            "can build any gadget out of spare bits and bobs",
        ),
        companion(
            "Ember",
            "🐉",
            "friendly little dragon",
            "emerald scales and wings the size of maple leaves",
            "brave but secretly afraid of the dark",
            "sneezes sparks whenever he smells flowers",
            "breathes warm light instead of fire",
        ),
        companion(
            "Whiskers",
            "🐿️",
            "talking squirrel",
            "a bushy tail with a single golden stripe",
            "fast-talking and loyal",
            "hides acorns in everyone's pockets",
            "can talk to every animal in the forest",
        ),
        companion(
            "Luna",
            "🦊",
            "moon fox",
            "fur as pale as moonlight and star-speckled ears",
            "calm, gentle and a great listener",
            "only whispers, even when she is excited",
            "can make herself and her friends invisible for one minute",
        ),
    ];

    /// Story twists available when no override file is present.
    pub static ref BUILTIN_TWISTS: Vec<String> = [
        "the villain turns out to be lonely and just wants a friend",
        "the magic only works when the characters hold hands",
        "the treasure they were searching for was a seed that grows into a garden for everyone",
        "the companion accidentally shrinks everyone to the size of a beetle",
        "the map they follow was drawn by the main character's grandparent long ago",
        "it starts snowing in the middle of summer and only the heroes know why",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
}

/// The set of companions and twists a story may draw from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    companions: Vec<MagicalCompanion>,
    twists: Vec<String>,
}

impl Catalog {
    /// Create a catalog from explicit lists.
    pub fn new(companions: Vec<MagicalCompanion>, twists: Vec<String>) -> Self {
        Self { companions, twists }
    }

    /// The catalog compiled into the crate.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_COMPANIONS.clone(), BUILTIN_TWISTS.clone())
    }

    /// Load overrides from a data directory, falling back per list to the built-in entries.
    pub async fn load(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();

        let mut companions: Vec<MagicalCompanion> =
            load_json_list(dir.join(COMPANIONS_FILE)).await;
        if companions.is_empty() {
            companions = BUILTIN_COMPANIONS.clone();
        }

        let mut twists: Vec<String> = load_json_list(dir.join(TWISTS_FILE)).await;
        twists.retain(|t| !t.trim().is_empty());
        if twists.is_empty() {
            twists = BUILTIN_TWISTS.clone();
        }

        Self::new(companions, twists)
    }

    pub fn companions(&self) -> &[MagicalCompanion] {
        &self.companions
    }

    pub fn twists(&self) -> &[String] {
        &self.twists
    }

    /// Find a companion by name, ignoring case.
    pub fn find_companion(&self, name: &str) -> Option<&MagicalCompanion> {
        let name = name.trim();
        self.companions
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn random_companion<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&MagicalCompanion> {
        self.companions.choose(rng)
    }

    pub fn random_twist<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.twists.choose(rng).map(String::as_str)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Read a JSON array from `path`.
///
/// A missing file yields an empty list silently; an unreadable or corrupt one
/// yields an empty list with a warning.
pub async fn load_json_list<T: DeserializeOwned>(path: impl AsRef<Path>) -> Vec<T> {
    let path = path.as_ref();

    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no catalog file, using defaults");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read file, using an empty list");
            return Vec::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt JSON file, using an empty list");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_catalog() {
        let catalog = Catalog::builtin();
        assert!(!catalog.companions().is_empty());
        assert!(!catalog.twists().is_empty());
        assert!(catalog.companions().iter().all(|c| !c.name.is_empty()));
    }

    #[test]
    fn test_find_companion_ignores_case() {
        let catalog = Catalog::builtin();
        let hoot = catalog.find_companion("professor hoot").unwrap();
        assert_eq!(hoot.emoji, "🦉");
        assert!(catalog.find_companion("Nobody").is_none());
    }

    #[test]
    fn test_random_picks_come_from_catalog() {
        let catalog = Catalog::builtin();
        let mut rng = StdRng::seed_from_u64(7);

        let companion = catalog.random_companion(&mut rng).unwrap();
        assert!(catalog.companions().contains(companion));

        let twist = catalog.random_twist(&mut rng).unwrap();
        assert!(catalog.twists().iter().any(|t| t == twist));

        let empty = Catalog::new(Vec::new(), Vec::new());
        assert!(empty.random_companion(&mut rng).is_none());
        assert!(empty.random_twist(&mut rng).is_none());
    }

    #[tokio::test]
    async fn test_load_missing_dir_uses_builtin() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let catalog = Catalog::load(temp_dir.path().join("nowhere")).await;
        assert_eq!(catalog, Catalog::builtin());
    }

    #[tokio::test]
    async fn test_load_overrides_and_corrupt_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let custom = vec![companion("Pip", "🐢", "tortoise", "mossy shell", "slow and wise", "naps often", "remembers everything")];
        std::fs::write(
            temp_dir.path().join(COMPANIONS_FILE),
            serde_json::to_string(&custom).unwrap(),
        )
        .unwrap();
        std::fs::write(temp_dir.path().join(TWISTS_FILE), "{ not json").unwrap();

        let catalog = Catalog::load(temp_dir.path()).await;
        assert_eq!(catalog.companions(), custom.as_slice());
        assert_eq!(catalog.twists(), BUILTIN_TWISTS.as_slice());
    }

    #[tokio::test]
    async fn test_load_json_list_corrupt_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "[1, 2,").unwrap();

        let items: Vec<u32> = load_json_list(&path).await;
        assert!(items.is_empty());
    }
}
