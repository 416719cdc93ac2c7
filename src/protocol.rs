use crate::technique::Technique;
use crate::types::*;
use crate::view::{GameView, LeaderboardEntry, PlayerView};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Tags or labels; validated server-side
    SubmitGuess {
        techniques: Vec<String>,
    },
    // Host-only messages
    HostStartGame,
    /// The host's "next" button; meaning depends on the current phase
    HostAdvance,
    HostEndGame,
    HostAddAiPlayer,
    HostRemovePlayer {
        player_id: PlayerId,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        player_id: Option<PlayerId>,
        game: GameView,
        server_now: String,
    },
    /// Full public snapshot after every state change
    GameState {
        game: GameView,
    },
    Phase {
        round_number: u32,
        phase: RoundPhase,
        /// Guessing deadline (RFC3339) while guessing
        deadline: Option<String>,
        server_now: String,
    },
    GuessAccepted {
        round_number: u32,
        techniques: Vec<Technique>,
    },
    GuessProgress {
        round_number: u32,
        guessed: usize,
        total: usize,
    },
    Analysis {
        round_number: u32,
        analysis: AiAnalysis,
    },
    Scores {
        round_number: u32,
        /// Points earned this round
        points: HashMap<PlayerId, u32>,
        leaderboard: Vec<LeaderboardEntry>,
    },
    GameFinished {
        leaderboard: Vec<LeaderboardEntry>,
    },
    PlayerJoined {
        player: PlayerView,
    },
    PlayerRemoved {
        player_id: PlayerId,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl From<crate::error::GameError> for ServerMessage {
    fn from(err: crate::error::GameError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }
}
