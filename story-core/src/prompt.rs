//! Prompt construction.
//!
//! Both builders are pure string formatting: the same input always produces
//! the same prompt, byte for byte.

use crate::profile::{Character, MagicalCompanion, StoryProfile};

/// Build the story-generation prompt for a profile.
///
/// Optional parts of the profile (companion, twist, character traits) are
/// left out of the prompt when absent.
pub fn build_story_prompt(profile: &StoryProfile) -> String {
    let mut prompt = String::new();

    prompt.push_str(include_str!("prompts/storyteller.txt"));

    // Characters
    prompt.push_str("\n## The Heroes\n");
    if profile.characters.len() > 1 {
        prompt.push_str("The story stars these children, who go on the adventure together:\n");
    } else {
        prompt.push_str("The story stars this child:\n");
    }
    for character in &profile.characters {
        prompt.push_str(&describe_character(character));
        prompt.push('\n');
    }

    // Story choices
    prompt.push_str("\n## The Story\n");
    prompt.push_str(&format!("- Genre: {}.\n", profile.genre.phrase()));
    prompt.push_str(&format!("- Tone: {}.\n", profile.tone.phrase()));
    prompt.push_str(&format!("- Length: {}.\n", profile.length.phrase()));
    prompt.push_str(&format!(
        "- Challenge the heroes are working through: {}\n",
        profile.challenge.trim()
    ));
    prompt.push_str(&format!(
        "- How magic works in this world: {}\n",
        profile.magic_system.trim()
    ));
    prompt.push_str(&format!("- Opening: {}\n", profile.hook.instruction()));

    if let Some(ref companion) = profile.companion {
        prompt.push_str("\n## Magical Companion\n");
        prompt.push_str(&describe_companion(companion));
        prompt.push('\n');
    }

    if let Some(ref twist) = profile.twist {
        prompt.push_str("\n## Plot Twist\n");
        prompt.push_str(&format!(
            "Somewhere in the middle of the story, weave in this surprise: {}.\n",
            twist.trim().trim_end_matches('.')
        ));
    }

    prompt.push('\n');
    prompt.push_str(include_str!("prompts/format_tags.txt"));

    prompt
}

/// Build the second-pass prompt that asks for a short analysis of a story.
pub fn build_analysis_prompt(story_text: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(include_str!("prompts/analysis.txt"));
    prompt.push_str("\n## Story\n");
    prompt.push_str(story_text.trim());
    prompt.push('\n');
    prompt
}

fn describe_character(character: &Character) -> String {
    let mut line = format!("- {}, age {}", character.name(), character.age());

    if let Some(gender) = character.gender() {
        line.push_str(&format!(" ({gender})"));
    }
    if !character.personality().is_empty() {
        line.push_str(&format!(". Personality: {}", character.personality()));
    }
    if !character.favorites().is_empty() {
        line.push_str(&format!(". Loves: {}", character.favorites()));
    }
    if let Some(special_trait) = character.special_trait() {
        line.push_str(&format!(". Special trait: {special_trait}"));
    }

    line.push('.');
    line
}

fn describe_companion(companion: &MagicalCompanion) -> String {
    format!(
        "Include {name} {emoji}, a {species} with {appearance}. {name} is {personality}, \
         {quirk}, and {ability}. {name} helps the heroes but never solves the challenge for them.",
        name = companion.name,
        emoji = companion.emoji,
        species = companion.species,
        appearance = companion.appearance,
        personality = companion.personality,
        quirk = companion.quirk,
        ability = companion.special_ability,
    )
}
