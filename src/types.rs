use crate::technique::Technique;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque ID types for type safety
pub type GameId = String;
pub type RoundId = String;
pub type PlayerId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Lobby,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    Waiting,
    Guessing,
    Reveal,
    Comparison,
    Complete,
}

impl RoundPhase {
    /// The only phase this one may move to
    pub fn next(&self) -> Option<RoundPhase> {
        use RoundPhase::*;

        match self {
            Waiting => Some(Guessing),
            Guessing => Some(Reveal),
            Reveal => Some(Comparison),
            Comparison => Some(Complete),
            Complete => None,
        }
    }

    pub fn can_transition_to(&self, to: RoundPhase) -> bool {
        self.next() == Some(to)
    }

    /// Whether correct answers and everyone's guesses may be shown
    pub fn is_revealed(&self) -> bool {
        matches!(
            self,
            RoundPhase::Reveal | RoundPhase::Comparison | RoundPhase::Complete
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub is_host: bool,
    pub is_ai: bool,
    pub score: u32,
    /// Session secret; never leaves the server except in the join response
    #[serde(skip_serializing, default)]
    pub token: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Guess {
    pub techniques: Vec<Technique>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiAnalysis {
    pub correct_techniques: Vec<Technique>,
    pub explanation: String,
    pub neutral_alternative: String,
    /// 0-100
    pub manipulation_level: u8,
    pub ai_commentary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub number: u32,
    pub topic: String,
    pub manipulative_post: String,
    pub correct_techniques: Vec<Technique>,
    pub ai_analysis: Option<AiAnalysis>,
    /// What the AI player said about its own guess
    pub ai_player_comment: Option<String>,
    pub guesses: HashMap<PlayerId, Guess>,
    pub phase: RoundPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub guessing_ends_at: Option<DateTime<Utc>>,
    pub revealed_at: Option<DateTime<Utc>>,
    /// Set once points were handed out (guards against double scoring)
    pub scored_at: Option<DateTime<Utc>>,
    /// Points each player earned in this round
    pub points: HashMap<PlayerId, u32>,
}

impl Round {
    pub fn round_id(number: u32) -> RoundId {
        format!("round-{}", number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub code: String,
    pub host_id: PlayerId,
    pub status: GameStatus,
    pub current_round_id: Option<RoundId>,
    pub current_round_number: u32,
    pub total_rounds: u32,
    pub created_at: DateTime<Utc>,
    pub players: HashMap<PlayerId, Player>,
    pub rounds: HashMap<RoundId, Round>,
}

impl Game {
    pub fn current_round(&self) -> Option<&Round> {
        self.current_round_id
            .as_ref()
            .and_then(|id| self.rounds.get(id))
    }

    pub fn current_round_mut(&mut self) -> Option<&mut Round> {
        match &self.current_round_id {
            Some(id) => self.rounds.get_mut(id),
            None => None,
        }
    }

    pub fn ai_player(&self) -> Option<&Player> {
        self.players.values().find(|p| p.is_ai)
    }

    pub fn human_player_count(&self) -> usize {
        self.players.values().filter(|p| !p.is_ai).count()
    }

    pub fn player_by_token(&self, token: &str) -> Option<&Player> {
        self.players
            .values()
            .find(|p| !p.token.is_empty() && p.token == token)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Player,
    /// Read-only screen (e.g. a projector) without a player token
    Display,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_phase_moves_one_step() {
        assert!(RoundPhase::Waiting.can_transition_to(RoundPhase::Guessing));
        assert!(RoundPhase::Guessing.can_transition_to(RoundPhase::Reveal));
        assert!(RoundPhase::Reveal.can_transition_to(RoundPhase::Comparison));
        assert!(RoundPhase::Comparison.can_transition_to(RoundPhase::Complete));

        assert!(!RoundPhase::Guessing.can_transition_to(RoundPhase::Comparison));
        assert!(!RoundPhase::Reveal.can_transition_to(RoundPhase::Guessing));
        assert!(!RoundPhase::Complete.can_transition_to(RoundPhase::Waiting));
    }

    #[test]
    fn test_player_token_not_serialized() {
        let player = Player {
            id: "p1".to_string(),
            display_name: "Alice".to_string(),
            is_host: false,
            is_ai: false,
            score: 0,
            token: "SECRET".to_string(),
            joined_at: Utc::now(),
        };

        let json = serde_json::to_string(&player).unwrap();
        assert!(!json.contains("SECRET"));
        assert!(json.contains("Alice"));
    }
}
