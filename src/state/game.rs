use super::player::insert_ai_player;
use super::{ensure_host, AppState};
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;
use crate::view::leaderboard;
use chrono::Utc;
use rand::Rng;
use std::collections::HashMap;

/// Safe character set for join codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

fn generate_join_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

impl AppState {
    /// Create a game in the lobby with the host as its first player
    pub async fn create_game(&self, host_name: &str) -> GameResult<(Game, Player)> {
        let host_name = self.validate_name(host_name)?;
        let now = Utc::now();

        let host = Player {
            id: ulid::Ulid::new().to_string(),
            display_name: host_name,
            is_host: true,
            is_ai: false,
            score: 0,
            token: ulid::Ulid::new().to_string(),
            joined_at: now,
        };

        let game = {
            let mut games = self.games.write().await;

            // Codes only need to be unique among games people can still join
            let code = loop {
                let code = generate_join_code();
                let in_use = games
                    .values()
                    .any(|g| g.code == code && g.status != GameStatus::Finished);
                if !in_use {
                    break code;
                }
            };

            let mut players = HashMap::new();
            players.insert(host.id.clone(), host.clone());

            let game = Game {
                id: ulid::Ulid::new().to_string(),
                code,
                host_id: host.id.clone(),
                status: GameStatus::Lobby,
                current_round_id: None,
                current_round_number: 0,
                total_rounds: self.config.total_rounds,
                created_at: now,
                players,
                rounds: HashMap::new(),
            };
            games.insert(game.id.clone(), game.clone());
            game
        };

        self.open_channel(&game.id).await;
        tracing::info!("Game {} created with code {}", game.id, game.code);

        Ok((game, host))
    }

    /// Newest game using this join code
    pub async fn find_game_by_code(&self, code: &str) -> GameResult<Game> {
        let code = code.trim().to_uppercase();
        let games = self.games.read().await;
        games
            .values()
            .filter(|g| g.code == code)
            .max_by_key(|g| g.created_at)
            .cloned()
            .ok_or_else(|| GameError::CodeNotFound(code.clone()))
    }

    pub async fn start_game(&self, game_id: &str, by: &str) -> GameResult<()> {
        {
            let mut games = self.games.write().await;
            let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
            ensure_host(game, by, "start the game")?;

            if game.status != GameStatus::Lobby {
                return Err(GameError::invalid_state("The game has already started"));
            }
            if game.human_player_count() < self.config.min_players {
                return Err(GameError::invalid_state(format!(
                    "At least {} players are needed to start",
                    self.config.min_players
                )));
            }

            if self.config.add_ai_player {
                insert_ai_player(game, &self.config.ai_player_name);
            }
            game.status = GameStatus::Playing;
        }

        tracing::info!("Game {} started", game_id);
        self.broadcast_state(game_id).await;

        self.begin_round(game_id, 1).await
    }

    /// Finish the game early (or again; ending twice is a no-op)
    pub async fn end_game(&self, game_id: &str, by: &str) -> GameResult<()> {
        {
            let mut games = self.games.write().await;
            let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
            ensure_host(game, by, "end the game")?;

            if game.status == GameStatus::Finished {
                return Ok(());
            }
            game.status = GameStatus::Finished;
        }

        self.announce_finish(game_id).await;
        Ok(())
    }

    /// Final leaderboard and snapshot once a game is finished
    pub(super) async fn announce_finish(&self, game_id: &str) {
        let board = match self.games.read().await.get(game_id) {
            Some(game) => leaderboard(game),
            None => return,
        };

        tracing::info!("Game {} finished", game_id);
        self.broadcast(game_id, ServerMessage::GameFinished { leaderboard: board })
            .await;
        self.broadcast_state(game_id).await;
    }
}
