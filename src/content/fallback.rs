//! Canned content used when no model is configured or every provider failed.

use crate::technique::Technique;
use crate::types::AiAnalysis;

pub const TOPICS: [&str; 8] = [
    "coffee",
    "studying",
    "technology",
    "animals",
    "the weather",
    "sports",
    "music",
    "restaurants",
];

pub const FALLBACK_EXPLANATION: &str =
    "The post leans on emotional manipulation techniques to steer the reader's opinion.";
pub const FALLBACK_COMMENTARY: &str = "An interesting piece of manipulation!";
pub const FALLBACK_AI_GUESS_MISTAKE: &str =
    "I'm sure this is just emotional language... or maybe something else?";
pub const FALLBACK_AI_GUESS: &str = "Looks like a few interesting manipulation techniques here!";
pub const DEFAULT_AI_GUESS_COMMENT: &str = "Looks manipulative!";

/// Manipulation level before the per-technique bump
pub const BASE_MANIPULATION_LEVEL: i64 = 50;
pub const LEVEL_PER_TECHNIQUE: i64 = 10;

fn sentence_for(technique: Technique, topic: &str) -> String {
    match technique {
        Technique::EmotionalLanguage => {
            format!("Honestly, it breaks my heart how people treat {topic} these days!")
        }
        Technique::FalseDilemma => format!(
            "Either you take {topic} seriously or you simply don't care about anything."
        ),
        Technique::Scapegoating => format!(
            "Everything wrong with {topic} is the fault of those clueless newcomers."
        ),
        Technique::AdHominem => {
            format!("Anyone who disagrees with me about {topic} is just too lazy to think.")
        }
        Technique::Inconsistency => format!(
            "Nobody should ever make a fuss about {topic}, yet it is the most important thing in the world."
        ),
        Technique::AppealToAuthority => {
            format!("Top experts agree that my view on {topic} is the only correct one.")
        }
        Technique::Bandwagon => {
            format!("Everybody already knows the truth about {topic}, so why don't you?")
        }
        Technique::SlipperySlope => format!(
            "If we let this slide with {topic} today, tomorrow society will fall apart."
        ),
    }
}

/// A post built from one template sentence per technique
pub fn fallback_post(topic: &str, techniques: &[Technique]) -> String {
    techniques
        .iter()
        .map(|t| sentence_for(*t, topic))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn fallback_neutral(topic: &str) -> String {
    format!("A balanced, fact-based discussion about {topic}.")
}

/// Level derived from the model's estimate plus 10 per technique, capped at 100.
/// A missing or zero estimate counts as the base level.
pub fn adjusted_level(raw: Option<i64>, technique_count: usize) -> u8 {
    let base = raw
        .filter(|n| *n != 0)
        .unwrap_or(BASE_MANIPULATION_LEVEL)
        .clamp(0, 100);
    let bumped = base + LEVEL_PER_TECHNIQUE * technique_count as i64;
    bumped.min(100) as u8
}

pub fn fallback_analysis(topic: &str, techniques: &[Technique]) -> AiAnalysis {
    AiAnalysis {
        correct_techniques: techniques.to_vec(),
        explanation: FALLBACK_EXPLANATION.to_string(),
        neutral_alternative: fallback_neutral(topic),
        manipulation_level: adjusted_level(None, techniques.len()),
        ai_commentary: FALLBACK_COMMENTARY.to_string(),
    }
}
