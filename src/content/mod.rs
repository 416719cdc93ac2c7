//! Round content: manipulative posts, their analysis and the AI player's guesses.
//!
//! Every operation degrades to canned content, so a game keeps running with
//! no model configured or when all providers fail.

pub mod fallback;
pub mod parse;
pub mod prompts;

use crate::config::ContentConfig;
use crate::llm::{GenerateRequest, LlmManager};
use crate::technique::Technique;
use crate::types::AiAnalysis;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Minimum length of a neutral alternative taken from the analysis JSON
const MIN_NEUTRAL_CHARS: usize = 20;
/// Rewrites this short (or shorter) are rejected
const MIN_REWRITE_CHARS: usize = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPost {
    pub topic: String,
    pub post: String,
    pub techniques: Vec<Technique>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiGuess {
    pub techniques: Vec<Technique>,
    pub analysis: String,
}

/// Pick a topic and 2-4 distinct techniques for a new round
pub fn random_round_setup() -> (String, Vec<Technique>) {
    let mut rng = rand::rng();
    let topic = fallback::TOPICS
        .choose(&mut rng)
        .copied()
        .unwrap_or("coffee")
        .to_string();
    let count = rng.random_range(2..=4);
    let techniques = Technique::ALL
        .choose_multiple(&mut rng, count)
        .copied()
        .collect();
    (topic, techniques)
}

/// How long the AI player "thinks" before its guess is submitted
pub fn ai_guess_delay() -> Duration {
    Duration::from_millis(rand::rng().random_range(1000..=3000))
}

fn random_techniques(count: usize) -> Vec<Technique> {
    let mut rng = rand::rng();
    Technique::ALL
        .choose_multiple(&mut rng, count)
        .copied()
        .collect()
}

pub struct ContentService {
    llm: Option<Arc<LlmManager>>,
    config: ContentConfig,
}

impl ContentService {
    pub fn new(llm: Option<Arc<LlmManager>>, config: ContentConfig) -> Self {
        Self { llm, config }
    }

    /// Service that only ever returns canned content
    pub fn offline() -> Self {
        Self::new(None, ContentConfig::default())
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    async fn ask(&self, system: &str, prompt: String) -> Option<String> {
        let llm = self.llm.as_ref()?;
        let request = GenerateRequest::new(prompt, self.config.timeout)
            .with_system(system)
            .with_max_tokens(self.config.max_tokens);

        match llm.generate(request).await {
            Ok(response) if !response.text.trim().is_empty() => Some(response.text),
            Ok(_) => {
                tracing::warn!("LLM returned an empty response");
                None
            }
            Err(e) => {
                tracing::warn!("LLM request failed: {}", e);
                None
            }
        }
    }

    /// Post for a random topic using 2-4 random techniques
    pub async fn generate_post(&self) -> GeneratedPost {
        let (topic, techniques) = random_round_setup();
        self.generate_post_for(&topic, &techniques).await
    }

    pub async fn generate_post_for(&self, topic: &str, techniques: &[Technique]) -> GeneratedPost {
        let prompt = prompts::post_prompt(topic, techniques, &self.config.language);
        let post = match self.ask(prompts::POST_SYSTEM_PROMPT, prompt).await {
            Some(text) => {
                let cleaned = parse::clean_rewrite(&text);
                if cleaned.is_empty() {
                    fallback::fallback_post(topic, techniques)
                } else {
                    cleaned
                }
            }
            None => {
                tracing::info!("Using canned post for topic {}", topic);
                fallback::fallback_post(topic, techniques)
            }
        };

        GeneratedPost {
            topic: topic.to_string(),
            post,
            techniques: techniques.to_vec(),
        }
    }

    /// Explanation, neutral rewrite and manipulation level for a post.
    /// The correct techniques are always the ones the post was generated with.
    pub async fn analyze_post(
        &self,
        post: &str,
        topic: &str,
        techniques: &[Technique],
    ) -> AiAnalysis {
        let prompt = prompts::analysis_prompt(post, techniques, &self.config.language);
        let parsed = match self.ask(prompts::ANALYST_SYSTEM_PROMPT, prompt).await {
            Some(text) => parse::parse_json_response(&text)
                .map_err(|e| tracing::warn!("Could not parse analysis: {}", e))
                .ok(),
            None => None,
        };

        let Some(value) = parsed else {
            let mut analysis = fallback::fallback_analysis(topic, techniques);
            if let Some(rewrite) = self.neutral_rewrite(post).await {
                analysis.neutral_alternative = rewrite;
            }
            return analysis;
        };

        let explanation = parse::string_field(&value, "explanation")
            .unwrap_or_else(|| fallback::FALLBACK_EXPLANATION.to_string());
        let ai_commentary = parse::string_field(&value, "aiCommentary")
            .or_else(|| parse::string_field(&value, "ai_commentary"))
            .unwrap_or_else(|| fallback::FALLBACK_COMMENTARY.to_string());
        let raw_level = value
            .get("manipulationLevel")
            .or_else(|| value.get("manipulation_level"))
            .and_then(parse::parse_leading_int);

        let candidate = parse::string_field(&value, "neutralAlternative")
            .or_else(|| parse::string_field(&value, "neutral_alternative"))
            .map(|s| parse::clean_rewrite(&s))
            .filter(|s| {
                s.chars().count() >= MIN_NEUTRAL_CHARS && !parse::looks_like_placeholder(s)
            });

        let neutral_alternative = match candidate {
            Some(neutral) => neutral,
            None => match self.neutral_rewrite(post).await {
                Some(rewrite) => rewrite,
                None => fallback::fallback_neutral(topic),
            },
        };

        AiAnalysis {
            correct_techniques: techniques.to_vec(),
            explanation,
            neutral_alternative,
            manipulation_level: fallback::adjusted_level(raw_level, techniques.len()),
            ai_commentary,
        }
    }

    /// Dedicated rewrite request, used when the analysis came back without
    /// a usable neutral version
    pub async fn neutral_rewrite(&self, post: &str) -> Option<String> {
        let prompt = prompts::neutral_rewrite_prompt(post, &self.config.language);
        let text = self.ask(prompts::ANALYST_SYSTEM_PROMPT, prompt).await?;
        let rewrite = parse::clean_rewrite(&text);

        if rewrite.chars().count() <= MIN_REWRITE_CHARS
            || parse::looks_like_placeholder(&rewrite)
            || rewrite == post.trim()
        {
            tracing::warn!("Rejected neutral rewrite: {:?}", rewrite);
            return None;
        }

        Some(rewrite)
    }

    /// The AI player's guess, wrong on purpose some of the time
    pub async fn ai_player_guess(&self, post: &str) -> AiGuess {
        let make_mistake = rand::rng().random_bool(self.config.ai_mistake_chance);
        self.ai_player_guess_with(post, make_mistake).await
    }

    pub async fn ai_player_guess_with(&self, post: &str, make_mistake: bool) -> AiGuess {
        let prompt = prompts::ai_guess_prompt(post, make_mistake, &self.config.language);
        let parsed = match self.ask(prompts::ANALYST_SYSTEM_PROMPT, prompt).await {
            Some(text) => parse::parse_json_response(&text)
                .map_err(|e| tracing::warn!("Could not parse AI guess: {}", e))
                .ok(),
            None => None,
        };

        let Some(value) = parsed else {
            return fallback_ai_guess(make_mistake);
        };

        let mut techniques = parse::technique_list(&value, "techniques");
        if techniques.is_empty() {
            techniques.push(Technique::ALL[0]);
        }
        let analysis = parse::string_field(&value, "analysis")
            .unwrap_or_else(|| fallback::DEFAULT_AI_GUESS_COMMENT.to_string());

        AiGuess {
            techniques,
            analysis,
        }
    }
}

fn fallback_ai_guess(make_mistake: bool) -> AiGuess {
    if make_mistake {
        AiGuess {
            techniques: random_techniques(1),
            analysis: fallback::FALLBACK_AI_GUESS_MISTAKE.to_string(),
        }
    } else {
        AiGuess {
            techniques: random_techniques(2),
            analysis: fallback::FALLBACK_AI_GUESS.to_string(),
        }
    }
}
