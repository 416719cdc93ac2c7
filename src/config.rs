//! Runtime configuration loaded from environment variables.
//!
//! Every value has a default so the server starts without any `.env` file.

use crate::llm::LlmConfig;
use std::time::Duration;

/// Parse a trimmed, non-empty environment variable
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_value(key).and_then(|v| match v.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, v);
            None
        }
    })
}

fn env_flag(key: &str) -> Option<bool> {
    env_value(key).map(|v| v != "0" && v.to_lowercase() != "false")
}

/// Rules and timings for a game session
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub total_rounds: u32,
    pub guessing_seconds: u32,
    /// Reveal screen duration once the analysis is available
    pub reveal_seconds: u32,
    /// Reveal screen duration while still waiting for the analysis
    pub reveal_fallback_seconds: u32,
    /// Humans (host included) needed before the game can start
    pub min_players: usize,
    pub add_ai_player: bool,
    pub ai_player_name: String,
    /// Close guessing as soon as every player has guessed
    pub end_guessing_when_all_guessed: bool,
    pub max_name_chars: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            total_rounds: 10,
            guessing_seconds: 60,
            reveal_seconds: 8,
            reveal_fallback_seconds: 12,
            min_players: 2,
            add_ai_player: true,
            ai_player_name: "The Machine".to_string(),
            end_guessing_when_all_guessed: true,
            max_name_chars: 24,
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            total_rounds: env_parse("GAME_ROUNDS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.total_rounds),
            guessing_seconds: env_parse("GUESSING_SECONDS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.guessing_seconds),
            reveal_seconds: env_parse("REVEAL_SECONDS").unwrap_or(defaults.reveal_seconds),
            reveal_fallback_seconds: env_parse("REVEAL_FALLBACK_SECONDS")
                .unwrap_or(defaults.reveal_fallback_seconds),
            min_players: env_parse("MIN_PLAYERS").unwrap_or(defaults.min_players),
            add_ai_player: env_flag("AI_PLAYER").unwrap_or(defaults.add_ai_player),
            ai_player_name: env_value("AI_PLAYER_NAME").unwrap_or(defaults.ai_player_name),
            end_guessing_when_all_guessed: env_flag("END_GUESSING_EARLY")
                .unwrap_or(defaults.end_guessing_when_all_guessed),
            max_name_chars: env_parse("MAX_NAME_CHARS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_name_chars),
        }
    }

    pub fn guessing_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.guessing_seconds))
    }
}

/// Settings for generated round content
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Language every generated text is written in
    pub language: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    /// Chance that the AI player deliberately gets a round wrong
    pub ai_mistake_chance: f64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            timeout: Duration::from_secs(30),
            max_tokens: 600,
            ai_mistake_chance: 0.4,
        }
    }
}

impl ContentConfig {
    pub fn from_env(llm: &LlmConfig) -> Self {
        let defaults = Self::default();

        Self {
            language: env_value("GAME_LANGUAGE").unwrap_or(defaults.language),
            timeout: llm.default_timeout,
            max_tokens: llm.default_max_tokens,
            ai_mistake_chance: env_parse("AI_MISTAKE_CHANCE")
                .filter(|p: &f64| (0.0..=1.0).contains(p))
                .unwrap_or(defaults.ai_mistake_chance),
        }
    }
}

/// Listener and public URL settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Base URL players open; the join URL (and its QR code) is built from it
    pub public_url: String,
    pub static_dir: String,
    /// How often phase deadlines are checked
    pub tick_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            public_url: "http://localhost:3000".to_string(),
            static_dir: "static".to_string(),
            tick_interval: Duration::from_millis(500),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let port = env_parse("PORT").unwrap_or(defaults.port);

        Self {
            port,
            public_url: env_value("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            static_dir: env_value("STATIC_DIR").unwrap_or(defaults.static_dir),
            tick_interval: env_parse("TICK_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
        }
    }

    pub fn join_url(&self, code: &str) -> String {
        format!("{}/join/{}", self.public_url, code)
    }
}
