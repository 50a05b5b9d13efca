//! Story profile model.
//!
//! Plain value types describing one story request: the children who star
//! in it, an optional magical companion, and the genre/tone/length choices.
//! The only behavior here is validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Youngest age a story character may have.
pub const MIN_AGE: u32 = 1;

/// Oldest age a story character may have.
pub const MAX_AGE: u32 = 18;

/// Errors from constructing or validating profile data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Character name is required")]
    EmptyName,

    #[error("Character age must be between 1 and 18, got {age}")]
    AgeOutOfRange { age: i64 },

    #[error("A story needs at least one character")]
    NoCharacters,

    #[error("Unknown {kind} '{value}'")]
    UnknownOption { kind: &'static str, value: String },
}

// ============================================================================
// Character
// ============================================================================

/// A child who stars in the story.
///
/// Constructed through [`Character::new`], which enforces a non-empty name and
/// an age within [`MIN_AGE`]..=[`MAX_AGE`]. Deserialization goes through the
/// same check, so an invalid saved record fails to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CharacterRecord")]
pub struct Character {
    name: String,
    age: u32,
    personality: String,
    favorites: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    special_trait: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gender: Option<String>,
}

impl Character {
    /// Create a validated character.
    pub fn new(
        name: impl Into<String>,
        age: u32,
        personality: impl Into<String>,
        favorites: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            return Err(ValidationError::AgeOutOfRange { age: age.into() });
        }

        Ok(Self {
            name,
            age,
            personality: personality.into().trim().to_string(),
            favorites: favorites.into().trim().to_string(),
            special_trait: None,
            gender: None,
        })
    }

    /// Create a character from a signed age, as received over the wire.
    pub fn from_signed_age(
        name: impl Into<String>,
        age: i64,
        personality: impl Into<String>,
        favorites: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let age = u32::try_from(age).map_err(|_| ValidationError::AgeOutOfRange { age })?;
        Self::new(name, age, personality, favorites)
    }

    /// Attach a special trait. Blank input leaves the trait unset.
    pub fn with_special_trait(mut self, special_trait: impl Into<String>) -> Self {
        self.special_trait = non_blank(special_trait.into());
        self
    }

    /// Attach a gender. Blank input leaves it unset.
    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = non_blank(gender.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn personality(&self) -> &str {
        &self.personality
    }

    pub fn favorites(&self) -> &str {
        &self.favorites
    }

    pub fn special_trait(&self) -> Option<&str> {
        self.special_trait.as_deref()
    }

    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Unvalidated wire shape of a [`Character`].
#[derive(Deserialize)]
struct CharacterRecord {
    name: String,
    age: i64,
    #[serde(default)]
    personality: String,
    #[serde(default)]
    favorites: String,
    #[serde(default)]
    special_trait: Option<String>,
    #[serde(default)]
    gender: Option<String>,
}

impl TryFrom<CharacterRecord> for Character {
    type Error = ValidationError;

    fn try_from(record: CharacterRecord) -> Result<Self, Self::Error> {
        let mut character =
            Character::from_signed_age(record.name, record.age, record.personality, record.favorites)?;
        if let Some(special_trait) = record.special_trait {
            character = character.with_special_trait(special_trait);
        }
        if let Some(gender) = record.gender {
            character = character.with_gender(gender);
        }
        Ok(character)
    }
}

// ============================================================================
// Companion
// ============================================================================

/// A magical friend drawn from the companion catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicalCompanion {
    pub name: String,
    pub emoji: String,
    pub species: String,
    pub appearance: String,
    pub personality: String,
    pub quirk: String,
    pub special_ability: String,
}

impl MagicalCompanion {
    /// Short label for menus, e.g. "🦉 Professor Hoot (wise old owl)".
    pub fn label(&self) -> String {
        format!("{} {} ({})", self.emoji, self.name, self.species)
    }
}

// ============================================================================
// Option sets
// ============================================================================

/// Story genre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    #[default]
    #[serde(alias = "FANTASY")]
    Fantasy,
    #[serde(alias = "ADVENTURE")]
    Adventure,
    #[serde(alias = "MYSTERY")]
    Mystery,
    #[serde(alias = "SPACE_EXPLORATION", alias = "space")]
    SpaceExploration,
    #[serde(alias = "ANIMAL_TALE", alias = "animal")]
    AnimalTale,
    #[serde(alias = "FAIRY_TALE")]
    FairyTale,
}

impl Genre {
    pub fn name(&self) -> &'static str {
        match self {
            Genre::Fantasy => "Fantasy",
            Genre::Adventure => "Adventure",
            Genre::Mystery => "Mystery",
            Genre::SpaceExploration => "Space Exploration",
            Genre::AnimalTale => "Animal Tale",
            Genre::FairyTale => "Fairy Tale",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Genre::Fantasy => "Dragons, enchanted forests and hidden kingdoms",
            Genre::Adventure => "Treasure maps, daring journeys and brave explorers",
            Genre::Mystery => "Clues, puzzles and a secret waiting to be solved",
            Genre::SpaceExploration => "Rockets, friendly aliens and faraway planets",
            Genre::AnimalTale => "Talking animals and woodland friendships",
            Genre::FairyTale => "Castles, wishes and happily-ever-afters",
        }
    }

    /// Phrase used inside the generation prompt.
    pub fn phrase(&self) -> &'static str {
        match self {
            Genre::Fantasy => "a magical fantasy adventure",
            Genre::Adventure => "a daring adventure story",
            Genre::Mystery => "a gentle mystery with clues to solve",
            Genre::SpaceExploration => "a space exploration adventure among the stars",
            Genre::AnimalTale => "an animal tale full of talking creatures",
            Genre::FairyTale => "a classic fairy tale",
        }
    }

    pub fn all() -> &'static [Genre] {
        &[
            Genre::Fantasy,
            Genre::Adventure,
            Genre::Mystery,
            Genre::SpaceExploration,
            Genre::AnimalTale,
            Genre::FairyTale,
        ]
    }
}

/// Emotional tone of the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    #[serde(alias = "GENTLE")]
    Gentle,
    #[serde(alias = "FUNNY")]
    Funny,
    #[serde(alias = "EXCITING")]
    Exciting,
    #[serde(alias = "BEDTIME")]
    Bedtime,
}

impl Tone {
    pub fn name(&self) -> &'static str {
        match self {
            Tone::Gentle => "Gentle",
            Tone::Funny => "Funny",
            Tone::Exciting => "Exciting",
            Tone::Bedtime => "Bedtime",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tone::Gentle => "Warm, kind and reassuring",
            Tone::Funny => "Silly moments and lots of giggles",
            Tone::Exciting => "Thrills and suspense, never too scary",
            Tone::Bedtime => "Slow, calm and sleepy",
        }
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            Tone::Gentle => "gentle and heartwarming",
            Tone::Funny => "funny and playful, with silly moments",
            Tone::Exciting => "exciting and full of suspense, but never frightening",
            Tone::Bedtime => "calm and soothing, perfect for bedtime",
        }
    }

    pub fn all() -> &'static [Tone] {
        &[Tone::Gentle, Tone::Funny, Tone::Exciting, Tone::Bedtime]
    }
}

/// Target story length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryLength {
    #[default]
    #[serde(alias = "SHORT")]
    Short,
    #[serde(alias = "MEDIUM")]
    Medium,
    #[serde(alias = "LONG")]
    Long,
}

impl StoryLength {
    pub fn name(&self) -> &'static str {
        match self {
            StoryLength::Short => "Short",
            StoryLength::Medium => "Medium",
            StoryLength::Long => "Long",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StoryLength::Short => "A quick tale, about 5 minutes to read",
            StoryLength::Medium => "A cozy read, about 10 minutes",
            StoryLength::Long => "A grand saga, 15 minutes or more",
        }
    }

    /// Inclusive word-count range requested from the generator.
    pub fn word_range(&self) -> (u32, u32) {
        match self {
            StoryLength::Short => (300, 400),
            StoryLength::Medium => (600, 800),
            StoryLength::Long => (1000, 1300),
        }
    }

    pub fn phrase(&self) -> String {
        let (low, high) = self.word_range();
        format!("about {low}-{high} words long")
    }

    pub fn all() -> &'static [StoryLength] {
        &[StoryLength::Short, StoryLength::Medium, StoryLength::Long]
    }
}

/// How the opening line should hook the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStyle {
    #[default]
    Action,
    Description,
}

impl HookStyle {
    pub fn name(&self) -> &'static str {
        match self {
            HookStyle::Action => "Action",
            HookStyle::Description => "Description",
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            HookStyle::Action => {
                "Open the story in the middle of an exciting moment of action."
            }
            HookStyle::Description => {
                "Open the story with a vivid description of the setting, full of sights, sounds and smells."
            }
        }
    }

    pub fn all() -> &'static [HookStyle] {
        &[HookStyle::Action, HookStyle::Description]
    }
}

/// Parse option names loosely: case-insensitive, ignoring spaces, dashes and underscores.
fn option_key(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! impl_option_parsing {
    ($ty:ty, $kind:literal) => {
        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let key = option_key(s);
                <$ty>::all()
                    .iter()
                    .copied()
                    .find(|option| option_key(option.name()) == key)
                    .ok_or_else(|| ValidationError::UnknownOption {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

impl_option_parsing!(Genre, "genre");
impl_option_parsing!(Tone, "tone");
impl_option_parsing!(StoryLength, "length");
impl_option_parsing!(HookStyle, "hook style");

// ============================================================================
// Story profile
// ============================================================================

/// Default challenge used when the requester does not give one.
pub const DEFAULT_CHALLENGE: &str = "learning to be brave";

/// Default magic system used when the requester does not give one.
pub const DEFAULT_MAGIC_SYSTEM: &str = "friendship and courage";

/// Everything the requester chose for one story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryProfile {
    /// Characters in order of importance; the first is the lead.
    pub characters: Vec<Character>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion: Option<MagicalCompanion>,
    #[serde(default)]
    pub genre: Genre,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub length: StoryLength,
    pub challenge: String,
    pub magic_system: String,
    #[serde(default)]
    pub hook: HookStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twist: Option<String>,
}

impl StoryProfile {
    /// Create a profile with default options for the given characters.
    pub fn new(characters: Vec<Character>) -> Self {
        Self {
            characters,
            companion: None,
            genre: Genre::default(),
            tone: Tone::default(),
            length: StoryLength::default(),
            challenge: DEFAULT_CHALLENGE.to_string(),
            magic_system: DEFAULT_MAGIC_SYSTEM.to_string(),
            hook: HookStyle::default(),
            twist: None,
        }
    }

    pub fn with_genre(mut self, genre: Genre) -> Self {
        self.genre = genre;
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_length(mut self, length: StoryLength) -> Self {
        self.length = length;
        self
    }

    pub fn with_challenge(mut self, challenge: impl Into<String>) -> Self {
        self.challenge = challenge.into();
        self
    }

    pub fn with_magic_system(mut self, magic_system: impl Into<String>) -> Self {
        self.magic_system = magic_system.into();
        self
    }

    pub fn with_hook(mut self, hook: HookStyle) -> Self {
        self.hook = hook;
        self
    }

    pub fn with_companion(mut self, companion: MagicalCompanion) -> Self {
        self.companion = Some(companion);
        self
    }

    pub fn with_twist(mut self, twist: impl Into<String>) -> Self {
        self.twist = non_blank(twist.into());
        self
    }

    /// Check the profile can be sent for generation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.characters.is_empty() {
            return Err(ValidationError::NoCharacters);
        }
        Ok(())
    }

    /// The lead character, if any.
    pub fn lead(&self) -> Option<&Character> {
        self.characters.first()
    }

    /// Character names joined for display: "Mia", "Mia and Leo", "Mia, Leo and Sam".
    pub fn character_names(&self) -> String {
        let names: Vec<&str> = self.characters.iter().map(Character::name).collect();
        match names.split_last() {
            None => String::new(),
            Some((last, [])) => last.to_string(),
            Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mia() -> Character {
        Character::new("Mia", 7, "curious and kind", "drawing dragons").unwrap()
    }

    #[test]
    fn test_character_age_bounds() {
        assert_eq!(
            Character::new("Mia", 0, "", ""),
            Err(ValidationError::AgeOutOfRange { age: 0 })
        );
        assert_eq!(
            Character::new("Mia", 19, "", ""),
            Err(ValidationError::AgeOutOfRange { age: 19 })
        );
        assert!(Character::new("Mia", 1, "", "").is_ok());
        assert!(Character::new("Mia", 18, "", "").is_ok());
    }

    #[test]
    fn test_character_requires_name() {
        assert_eq!(Character::new("", 7, "", ""), Err(ValidationError::EmptyName));
        assert_eq!(Character::new("   ", 7, "", ""), Err(ValidationError::EmptyName));
    }

    #[test]
    fn test_negative_age_rejected() {
        assert_eq!(
            Character::from_signed_age("Leo", -3, "", ""),
            Err(ValidationError::AgeOutOfRange { age: -3 })
        );
    }

    #[test]
    fn test_optional_fields() {
        let character = mia().with_special_trait("  ").with_gender("girl");
        assert_eq!(character.special_trait(), None);
        assert_eq!(character.gender(), Some("girl"));

        let character = character.with_special_trait("can whistle like a bird");
        assert_eq!(character.special_trait(), Some("can whistle like a bird"));
    }

    #[test]
    fn test_character_serialization_omits_absent_trait() {
        let json = serde_json::to_value(mia()).unwrap();
        assert_eq!(json["name"], "Mia");
        assert_eq!(json["age"], 7);
        assert!(json.get("special_trait").is_none());
    }

    #[test]
    fn test_deserialization_validates() {
        let ok: Character = serde_json::from_str(
            r#"{"name":"Leo","age":9,"personality":"bold","favorites":"rockets","special_trait":"never gives up"}"#,
        )
        .unwrap();
        assert_eq!(ok.special_trait(), Some("never gives up"));

        let too_old = serde_json::from_str::<Character>(r#"{"name":"Leo","age":40}"#);
        assert!(too_old.is_err());

        let nameless = serde_json::from_str::<Character>(r#"{"name":"","age":5}"#);
        assert!(nameless.is_err());
    }

    #[test]
    fn test_option_parsing() {
        assert_eq!("fantasy".parse::<Genre>(), Ok(Genre::Fantasy));
        assert_eq!("Space Exploration".parse::<Genre>(), Ok(Genre::SpaceExploration));
        assert_eq!("fairy_tale".parse::<Genre>(), Ok(Genre::FairyTale));
        assert_eq!("BEDTIME".parse::<Tone>(), Ok(Tone::Bedtime));
        assert_eq!("long".parse::<StoryLength>(), Ok(StoryLength::Long));
        assert!(matches!(
            "western".parse::<Genre>(),
            Err(ValidationError::UnknownOption { kind: "genre", .. })
        ));
    }

    #[test]
    fn test_option_serde_accepts_legacy_names() {
        let genre: Genre = serde_json::from_str(r#""FANTASY""#).unwrap();
        assert_eq!(genre, Genre::Fantasy);
        let tone: Tone = serde_json::from_str(r#""gentle""#).unwrap();
        assert_eq!(tone, Tone::Gentle);
        assert_eq!(serde_json::to_string(&Genre::AnimalTale).unwrap(), r#""animal_tale""#);
    }

    #[test]
    fn test_profile_defaults_and_validation() {
        let profile = StoryProfile::new(vec![mia()]);
        assert_eq!(profile.genre, Genre::Fantasy);
        assert_eq!(profile.tone, Tone::Gentle);
        assert_eq!(profile.length, StoryLength::Short);
        assert_eq!(profile.challenge, DEFAULT_CHALLENGE);
        assert!(profile.validate().is_ok());

        let empty = StoryProfile::new(Vec::new());
        assert_eq!(empty.validate(), Err(ValidationError::NoCharacters));
    }

    #[test]
    fn test_character_names() {
        let leo = Character::new("Leo", 9, "", "").unwrap();
        let sam = Character::new("Sam", 5, "", "").unwrap();

        assert_eq!(StoryProfile::new(vec![]).character_names(), "");
        assert_eq!(StoryProfile::new(vec![mia()]).character_names(), "Mia");
        assert_eq!(
            StoryProfile::new(vec![mia(), leo.clone()]).character_names(),
            "Mia and Leo"
        );
        assert_eq!(
            StoryProfile::new(vec![mia(), leo, sam]).character_names(),
            "Mia, Leo and Sam"
        );
    }
}
