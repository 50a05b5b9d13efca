//! Terminal presentation of a finished story.

use story_core::{AnalysisValue, StoryOutput, StoryProfile};

const RULE_WIDTH: usize = 50;

/// The story, its adventure report and wisdom gem, ready to print.
pub fn render(profile: &StoryProfile, output: &StoryOutput) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    out.push_str(&format!("\n{rule}\n✨ {} ✨\n{rule}\n\n", output.title));
    out.push_str(&output.text);
    out.push_str("\n\n");

    out.push_str("--- Adventure Report ---\n");
    out.push_str(&format!("* Heroes: {}\n", profile.character_names()));
    if let Some(ref companion) = profile.companion {
        out.push_str(&format!("* Companion: {}\n", companion.label()));
    }
    if output.key_items.is_empty() {
        out.push_str("* Key Items Found: none this time\n");
    } else {
        out.push_str(&format!(
            "* Key Items Found: {}\n",
            output.key_items.join(", ")
        ));
    }
    out.push_str(&format!(
        "* This story explored: {}\n",
        profile.challenge.trim()
    ));

    if !output.analysis.is_empty() {
        out.push_str("\n--- Story Notes ---\n");
        for (key, value) in &output.analysis {
            match value {
                AnalysisValue::Text(text) => {
                    out.push_str(&format!("* {}: {text}\n", label(key)));
                }
                AnalysisValue::List(items) => {
                    out.push_str(&format!("* {}:\n", label(key)));
                    for item in items {
                        out.push_str(&format!("    - {item}\n"));
                    }
                }
            }
        }
    }

    out.push_str("\n--- Wisdom Gem ---\n");
    out.push_str(&format!("💎 {}\n", output.display_wisdom_gem()));

    out
}

fn label(key: &str) -> String {
    match key {
        "target_age" => "Best for ages".to_string(),
        "reading_level" => "Reading level".to_string(),
        "themes" => "Themes".to_string(),
        "illustration_ideas" => "Illustration ideas".to_string(),
        other => other.replace('_', " "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use story_core::{parse_analysis, parse_story, Character, DEFAULT_WISDOM_GEM};

    fn profile() -> StoryProfile {
        let mia = Character::new("Mia", 7, "curious", "owls").unwrap();
        let leo = Character::new("Leo", 5, "shy", "trains").unwrap();
        StoryProfile::new(vec![mia, leo]).with_challenge("sharing toys")
    }

    #[test]
    fn test_render_report() {
        let output = StoryOutput::from(parse_story(
            "[TITLE: The Big Share]\nMia gave Leo [KEY ITEM: the red train].\n[WISDOM GEM: Sharing doubles the fun.]",
        ));
        let text = render(&profile(), &output);

        assert!(text.contains("✨ The Big Share ✨"));
        assert!(text.contains("Mia gave Leo the red train."));
        assert!(text.contains("* Heroes: Mia and Leo\n"));
        assert!(text.contains("* Key Items Found: the red train\n"));
        assert!(text.contains("* This story explored: sharing toys\n"));
        assert!(text.contains("💎 Sharing doubles the fun."));
        assert!(!text.contains("Story Notes"));
    }

    #[test]
    fn test_render_fallbacks_and_analysis() {
        let mut output = StoryOutput::from(parse_story("A plain story."));
        output.analysis =
            parse_analysis("[TARGET_AGE: 4-6][ILLUSTRATION_IDEAS: a kite; a cloud]").into_map();
        let text = render(&profile(), &output);

        assert!(text.contains("Untitled Adventure"));
        assert!(text.contains("none this time"));
        assert!(text.contains(DEFAULT_WISDOM_GEM));
        assert!(text.contains("* Best for ages: 4-6\n"));
        assert!(text.contains("* Illustration ideas:\n    - a kite\n    - a cloud\n"));
    }
}
