//! The eight manipulation techniques players learn to spot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Technique {
    EmotionalLanguage,
    FalseDilemma,
    Scapegoating,
    AdHominem,
    Inconsistency,
    AppealToAuthority,
    Bandwagon,
    SlipperySlope,
}

impl Technique {
    pub const ALL: [Technique; 8] = [
        Technique::EmotionalLanguage,
        Technique::FalseDilemma,
        Technique::Scapegoating,
        Technique::AdHominem,
        Technique::Inconsistency,
        Technique::AppealToAuthority,
        Technique::Bandwagon,
        Technique::SlipperySlope,
    ];

    /// Wire tag, identical to the serde representation
    pub fn tag(&self) -> &'static str {
        match self {
            Technique::EmotionalLanguage => "emotional_language",
            Technique::FalseDilemma => "false_dilemma",
            Technique::Scapegoating => "scapegoating",
            Technique::AdHominem => "ad_hominem",
            Technique::Inconsistency => "inconsistency",
            Technique::AppealToAuthority => "appeal_to_authority",
            Technique::Bandwagon => "bandwagon",
            Technique::SlipperySlope => "slippery_slope",
        }
    }

    /// Human-readable name shown on the guessing buttons
    pub fn label(&self) -> &'static str {
        match self {
            Technique::EmotionalLanguage => "Emotional language",
            Technique::FalseDilemma => "False dilemma",
            Technique::Scapegoating => "Scapegoating",
            Technique::AdHominem => "Ad hominem",
            Technique::Inconsistency => "Inconsistency",
            Technique::AppealToAuthority => "Appeal to authority",
            Technique::Bandwagon => "Bandwagon",
            Technique::SlipperySlope => "Slippery slope",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Technique::EmotionalLanguage => {
                "Loaded, dramatic wording that aims at feelings instead of facts"
            }
            Technique::FalseDilemma => "Only two options are presented when many exist",
            Technique::Scapegoating => "A person or group is blamed for a complex problem",
            Technique::AdHominem => "The person is attacked instead of their argument",
            Technique::Inconsistency => "The post contradicts itself to push its point",
            Technique::AppealToAuthority => {
                "Vague or irrelevant experts are cited to end the discussion"
            }
            Technique::Bandwagon => "Something must be right because everyone does it",
            Technique::SlipperySlope => {
                "One small step supposedly leads to an inevitable disaster"
            }
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown manipulation technique: {0}")]
pub struct UnknownTechnique(pub String);

impl FromStr for Technique {
    type Err = UnknownTechnique;

    /// Accepts the wire tag or the label, ignoring case, spaces and dashes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        Technique::ALL
            .into_iter()
            .find(|t| t.tag() == normalized)
            .ok_or_else(|| UnknownTechnique(s.to_string()))
    }
}

/// Remove repeated techniques while keeping the first occurrence order
pub fn dedup_techniques(techniques: &[Technique]) -> Vec<Technique> {
    let mut seen = Vec::with_capacity(techniques.len());
    for t in techniques {
        if !seen.contains(t) {
            seen.push(*t);
        }
    }
    seen
}
