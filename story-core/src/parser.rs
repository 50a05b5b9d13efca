//! Tag extraction for generated text.
//!
//! The generator is asked to embed structured fields as bracket tags
//! (`[TITLE: ...]`, `[KEY ITEM: ...]`, `[WISDOM GEM: ...]`). These functions
//! pull them back out. Parsing never fails: a missing or malformed tag
//! degrades to a fallback value.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Title used when the generated text carries no `[TITLE: ...]` tag.
pub const FALLBACK_TITLE: &str = "Untitled Adventure";

/// Value used for analysis fields the generator left out.
pub const NOT_AVAILABLE: &str = "N/A";

lazy_static::lazy_static! {
    // Keyword matching is case-insensitive and content may span lines but
    // never contains brackets, so an unclosed tag cannot swallow the next one.
    // Key items may hold one level of nested brackets ("the [golden] key").
    // Multi-word keywords accept spaces or underscores between words.
    static ref TITLE_TAG: Regex = tag_pattern(r"TITLE");
    static ref KEY_ITEM_TAG: Regex = nested_tag_pattern(r"KEY[\s_]+ITEM");
    static ref WISDOM_GEM_TAG: Regex = tag_pattern(r"WISDOM[\s_]+GEM");

    // Openers left behind once every closed tag is gone. A dangling title or
    // wisdom gem runs to the end of its line.
    static ref DANGLING_TITLE: Regex = dangling_pattern(r"TITLE");
    static ref DANGLING_WISDOM_GEM: Regex = dangling_pattern(r"WISDOM[\s_]+GEM");
    static ref DANGLING_KEY_ITEM: Regex =
        Regex::new(r"(?i)\[\s*KEY[\s_]+ITEM\s*:[ \t]*").expect("dangling key item pattern is valid");

    static ref TARGET_AGE_TAG: Regex = tag_pattern(r"TARGET[\s_]+AGE");
    static ref READING_LEVEL_TAG: Regex = tag_pattern(r"READING[\s_]+LEVEL");
    static ref THEMES_TAG: Regex = tag_pattern(r"THEMES");
    static ref ILLUSTRATION_IDEAS_TAG: Regex = tag_pattern(r"ILLUSTRATION[\s_]+IDEAS");

    static ref LIST_MARKER: Regex =
        Regex::new(r"^(?:[-*•]+|\d+[.)])\s*").expect("list marker pattern is valid");
}

fn tag_pattern(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?i)\[\s*{keyword}\s*:\s*([^\[\]]*?)\s*\]"))
        .expect("tag pattern is valid")
}

fn nested_tag_pattern(keyword: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)\[\s*{keyword}\s*:\s*((?:[^\[\]]|\[[^\[\]]*\])*?)\s*\]"
    ))
    .expect("nested tag pattern is valid")
}

fn dangling_pattern(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?i)\[\s*{keyword}\s*:[ \t]*([^\[\]\n]*)"))
        .expect("dangling tag pattern is valid")
}

/// First tag match, trimmed. `None` when the tag is absent.
fn first_tag(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// The structured pieces of a generated story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStory {
    pub title: String,
    /// Story text with all tag markup removed.
    pub text: String,
    pub key_items: Vec<String>,
    /// Empty when the generator gave no wisdom gem.
    pub wisdom_gem: String,
}

/// Extract title, key items and wisdom gem from raw generated text.
///
/// Closed tags win. A tag the generator never closed is still removed from
/// the text; an unclosed title or wisdom gem is used only when no closed one
/// exists.
pub fn parse_story(raw: &str) -> ParsedStory {
    let key_items: Vec<String> = KEY_ITEM_TAG
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    let text = TITLE_TAG.replace_all(raw, "");
    let text = WISDOM_GEM_TAG.replace_all(&text, "");
    let text = KEY_ITEM_TAG.replace_all(&text, |caps: &regex::Captures| {
        caps.get(1)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    });

    let title = first_tag(&TITLE_TAG, raw)
        .or_else(|| first_tag(&DANGLING_TITLE, &text))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string());
    let wisdom_gem = first_tag(&WISDOM_GEM_TAG, raw)
        .or_else(|| first_tag(&DANGLING_WISDOM_GEM, &text))
        .unwrap_or_default();

    let text = DANGLING_TITLE.replace_all(&text, "");
    let text = DANGLING_WISDOM_GEM.replace_all(&text, "");
    let text = DANGLING_KEY_ITEM.replace_all(&text, "");

    ParsedStory {
        title,
        text: text.trim().to_string(),
        key_items,
        wisdom_gem,
    }
}

/// One value in a story analysis map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisValue {
    Text(String),
    List(Vec<String>),
}

impl AnalysisValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnalysisValue::Text(text) => Some(text),
            AnalysisValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AnalysisValue::List(items) => Some(items),
            AnalysisValue::Text(_) => None,
        }
    }
}

/// Typed result of the analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryAnalysis {
    pub target_age: String,
    pub reading_level: String,
    pub themes: String,
    pub illustration_ideas: Vec<String>,
}

impl StoryAnalysis {
    /// Flatten into the named-metric map stored on a story output.
    pub fn into_map(self) -> BTreeMap<String, AnalysisValue> {
        BTreeMap::from([
            ("target_age".to_string(), AnalysisValue::Text(self.target_age)),
            ("reading_level".to_string(), AnalysisValue::Text(self.reading_level)),
            ("themes".to_string(), AnalysisValue::Text(self.themes)),
            (
                "illustration_ideas".to_string(),
                AnalysisValue::List(self.illustration_ideas),
            ),
        ])
    }
}

/// Extract analysis tags. Missing text tags become `"N/A"`, missing ideas an empty list.
pub fn parse_analysis(raw: &str) -> StoryAnalysis {
    let text_or_na = |pattern: &Regex| {
        first_tag(pattern, raw)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };

    let illustration_ideas = first_tag(&ILLUSTRATION_IDEAS_TAG, raw)
        .map(|ideas| split_list(&ideas))
        .unwrap_or_default();

    StoryAnalysis {
        target_age: text_or_na(&TARGET_AGE_TAG),
        reading_level: text_or_na(&READING_LEVEL_TAG),
        themes: text_or_na(&THEMES_TAG),
        illustration_ideas,
    }
}

/// Split a semicolon- or line-separated list, dropping bullet markers and blanks.
fn split_list(list: &str) -> Vec<String> {
    list.split([';', '\n'])
        .map(|item| LIST_MARKER.replace(item.trim(), "").trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_story() {
        let raw = "[TITLE: X]\nMia walked on and found [KEY ITEM: A] under a rock.\n\
                   Later she spotted [KEY ITEM: B].\n[WISDOM GEM: Y]";
        let parsed = parse_story(raw);

        assert_eq!(parsed.title, "X");
        assert_eq!(parsed.key_items, vec!["A", "B"]);
        assert_eq!(parsed.wisdom_gem, "Y");
        assert!(parsed.text.contains("found A under a rock"));
        assert!(parsed.text.contains("spotted B."));
        assert!(!parsed.text.contains('['));
        assert!(!parsed.text.contains(']'));
    }

    #[test]
    fn test_parse_untagged_text() {
        let raw = "\n  Once upon a time there was a quiet village.\n\n";
        let parsed = parse_story(raw);

        assert_eq!(parsed.title, FALLBACK_TITLE);
        assert!(parsed.key_items.is_empty());
        assert_eq!(parsed.wisdom_gem, "");
        assert_eq!(parsed.text, raw.trim());
    }

    #[test]
    fn test_tags_are_case_insensitive_and_multiline() {
        let raw = "[title:  The Long\nRoad Home ]\nText with [key_item: Silver Key ].\n[Wisdom  Gem: Be kind. ]";
        let parsed = parse_story(raw);

        assert_eq!(parsed.title, "The Long\nRoad Home");
        assert_eq!(parsed.key_items, vec!["Silver Key"]);
        assert_eq!(parsed.wisdom_gem, "Be kind.");
        assert_eq!(parsed.text, "Text with Silver Key.");
    }

    #[test]
    fn test_duplicate_items_preserved_in_order() {
        let raw = "[KEY ITEM: Map] then [KEY ITEM: Lantern] then [KEY ITEM: Map] again";
        let parsed = parse_story(raw);
        assert_eq!(parsed.key_items, vec!["Map", "Lantern", "Map"]);
        assert_eq!(parsed.text, "Map then Lantern then Map again");
    }

    #[test]
    fn test_only_first_title_and_gem_used_but_all_removed() {
        let raw = "[TITLE: First]\n[TITLE: Second]\nStory.\n[WISDOM GEM: One]\n[WISDOM GEM: Two]";
        let parsed = parse_story(raw);

        assert_eq!(parsed.title, "First");
        assert_eq!(parsed.wisdom_gem, "One");
        assert_eq!(parsed.text, "Story.");
    }

    #[test]
    fn test_blank_title_falls_back() {
        let parsed = parse_story("[TITLE:   ] Hello");
        assert_eq!(parsed.title, FALLBACK_TITLE);
        assert_eq!(parsed.text, "Hello");
    }

    #[test]
    fn test_unclosed_title_is_removed_and_used() {
        let parsed = parse_story("[TITLE: Broken\nStory text");
        assert_eq!(parsed.title, "Broken");
        assert_eq!(parsed.text, "Story text");
    }

    #[test]
    fn test_unclosed_tag_does_not_swallow_next_tag() {
        let parsed = parse_story("[TITLE: Broken\nShe found [KEY ITEM: Lamp].");
        assert_eq!(parsed.title, "Broken");
        assert_eq!(parsed.key_items, vec!["Lamp"]);
        assert_eq!(parsed.text, "She found Lamp.");
    }

    #[test]
    fn test_closed_title_wins_over_unclosed_one() {
        let parsed = parse_story("[TITLE: Real]\nOnce upon a time.\n[TITLE: Stray");
        assert_eq!(parsed.title, "Real");
        assert_eq!(parsed.text, "Once upon a time.");
    }

    #[test]
    fn test_unclosed_key_item_and_gem_leave_no_markup() {
        let parsed = parse_story(
            "[TITLE: Ok] Mia grabbed [KEY ITEM: the lantern and ran.\n[WISDOM GEM: Light the way",
        );
        assert_eq!(parsed.text, "Mia grabbed the lantern and ran.");
        assert!(parsed.key_items.is_empty());
        assert_eq!(parsed.wisdom_gem, "Light the way");
    }

    #[test]
    fn test_key_item_with_nested_brackets() {
        let parsed = parse_story("Leo held [KEY ITEM: the [golden] key] high. [WISDOM GEM: Share.]");
        assert_eq!(parsed.key_items, vec!["the [golden] key"]);
        assert_eq!(parsed.text, "Leo held the [golden] key high.");
        assert_eq!(parsed.wisdom_gem, "Share.");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let raw = "[TITLE: T] a [KEY ITEM: b] c [WISDOM GEM: d]";
        assert_eq!(parse_story(raw), parse_story(raw));
    }

    #[test]
    fn test_parse_analysis() {
        let raw = "[TARGET_AGE: 5-7]\n[READING_LEVEL: Early Reader]\n\
                   [THEMES: courage, friendship]\n\
                   [ILLUSTRATION_IDEAS: Mia meets the owl; - the glowing cave;\n2. the feast]";
        let analysis = parse_analysis(raw);

        assert_eq!(analysis.target_age, "5-7");
        assert_eq!(analysis.reading_level, "Early Reader");
        assert_eq!(analysis.themes, "courage, friendship");
        assert_eq!(
            analysis.illustration_ideas,
            vec!["Mia meets the owl", "the glowing cave", "the feast"]
        );
    }

    #[test]
    fn test_parse_analysis_missing_tags() {
        let analysis = parse_analysis("I could not analyze this story.");
        assert_eq!(analysis.target_age, NOT_AVAILABLE);
        assert_eq!(analysis.reading_level, NOT_AVAILABLE);
        assert_eq!(analysis.themes, NOT_AVAILABLE);
        assert!(analysis.illustration_ideas.is_empty());
    }

    #[test]
    fn test_analysis_map() {
        let map = parse_analysis("[TARGET_AGE: 4-6][ILLUSTRATION_IDEAS: a; b]").into_map();

        assert_eq!(map["target_age"].as_text(), Some("4-6"));
        assert_eq!(map["themes"].as_text(), Some(NOT_AVAILABLE));
        assert_eq!(
            map["illustration_ideas"].as_list(),
            Some(&["a".to_string(), "b".to_string()][..])
        );

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["illustration_ideas"][1], "b");
        assert_eq!(json["reading_level"], "N/A");
    }
}
