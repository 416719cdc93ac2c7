//! Client-facing snapshots of a game.
//!
//! Views never carry player tokens. While a round is still open they also
//! hide the correct techniques and what other players picked.

use crate::technique::Technique;
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub display_name: String,
    pub is_host: bool,
    pub is_ai: bool,
    pub score: u32,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            display_name: player.display_name.clone(),
            is_host: player.is_host,
            is_ai: player.is_ai,
            score: player.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GuessView {
    /// Hidden until reveal, except for the viewer's own guess
    #[serde(skip_serializing_if = "Option::is_none")]
    pub techniques: Option<Vec<Technique>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoundView {
    pub id: RoundId,
    pub number: u32,
    pub topic: String,
    pub manipulative_post: String,
    pub phase: RoundPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub guessing_ends_at: Option<DateTime<Utc>>,
    pub revealed_at: Option<DateTime<Utc>>,
    pub correct_techniques: Option<Vec<Technique>>,
    pub ai_analysis: Option<AiAnalysis>,
    pub ai_player_comment: Option<String>,
    pub guesses: HashMap<PlayerId, GuessView>,
    pub points: HashMap<PlayerId, u32>,
}

impl RoundView {
    pub fn new(round: &Round, viewer: Option<&str>) -> Self {
        let revealed = round.phase.is_revealed();

        let guesses = round
            .guesses
            .iter()
            .map(|(player_id, guess)| {
                let visible = revealed || viewer == Some(player_id.as_str());
                let view = GuessView {
                    techniques: visible.then(|| guess.techniques.clone()),
                    timestamp: guess.timestamp,
                };
                (player_id.clone(), view)
            })
            .collect();

        Self {
            id: round.id.clone(),
            number: round.number,
            topic: round.topic.clone(),
            manipulative_post: round.manipulative_post.clone(),
            phase: round.phase,
            started_at: round.started_at,
            guessing_ends_at: round.guessing_ends_at,
            revealed_at: round.revealed_at,
            correct_techniques: revealed.then(|| round.correct_techniques.clone()),
            ai_analysis: if revealed {
                round.ai_analysis.clone()
            } else {
                None
            },
            ai_player_comment: if revealed {
                round.ai_player_comment.clone()
            } else {
                None
            },
            guesses,
            points: round.points.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based; tied scores share a rank
    pub rank: usize,
    pub player_id: PlayerId,
    pub display_name: String,
    pub score: u32,
    pub is_ai: bool,
}

/// Players ordered by score, highest first
pub fn leaderboard(game: &Game) -> Vec<LeaderboardEntry> {
    let mut players: Vec<&Player> = game.players.values().collect();
    players.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });

    let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(players.len());
    for (index, player) in players.into_iter().enumerate() {
        let rank = match entries.last() {
            Some(prev) if prev.score == player.score => prev.rank,
            _ => index + 1,
        };
        entries.push(LeaderboardEntry {
            rank,
            player_id: player.id.clone(),
            display_name: player.display_name.clone(),
            score: player.score,
            is_ai: player.is_ai,
        });
    }
    entries
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GameView {
    pub id: GameId,
    pub code: String,
    pub host_id: PlayerId,
    pub status: GameStatus,
    pub current_round_number: u32,
    pub total_rounds: u32,
    pub created_at: DateTime<Utc>,
    /// In join order
    pub players: Vec<PlayerView>,
    pub current_round: Option<RoundView>,
}

impl GameView {
    /// Snapshot as seen by `viewer`; `None` is the public view
    pub fn new(game: &Game, viewer: Option<&str>) -> Self {
        let mut players: Vec<&Player> = game.players.values().collect();
        players.sort_by_key(|p| p.joined_at);

        Self {
            id: game.id.clone(),
            code: game.code.clone(),
            host_id: game.host_id.clone(),
            status: game.status,
            current_round_number: game.current_round_number,
            total_rounds: game.total_rounds,
            created_at: game.created_at,
            players: players.into_iter().map(PlayerView::from).collect(),
            current_round: game.current_round().map(|r| RoundView::new(r, viewer)),
        }
    }
}
