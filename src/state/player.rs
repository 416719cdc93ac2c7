use super::{ensure_host, AppState};
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;
use crate::view::PlayerView;
use chrono::Utc;

fn new_player(display_name: String, is_host: bool, is_ai: bool) -> Player {
    Player {
        id: ulid::Ulid::new().to_string(),
        display_name,
        is_host,
        is_ai,
        score: 0,
        token: if is_ai {
            String::new()
        } else {
            ulid::Ulid::new().to_string()
        },
        joined_at: Utc::now(),
    }
}

/// Names are unique within a game, ignoring case
fn name_taken(game: &Game, name: &str) -> bool {
    let name = name.to_lowercase();
    game.players
        .values()
        .any(|p| p.display_name.to_lowercase() == name)
}

/// Add the AI player unless the game already has one. A number is appended
/// if a human already uses the name.
pub(super) fn insert_ai_player(game: &mut Game, name: &str) -> (Player, bool) {
    if let Some(existing) = game.ai_player() {
        return (existing.clone(), false);
    }

    let mut display_name = name.to_string();
    let mut n = 2;
    while name_taken(game, &display_name) {
        display_name = format!("{} {}", name, n);
        n += 1;
    }

    let player = new_player(display_name, false, true);
    game.players.insert(player.id.clone(), player.clone());
    (player, true)
}

impl AppState {
    /// Trimmed display name, or an error if it is empty or too long
    pub fn validate_name(&self, name: &str) -> GameResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::InvalidInput("Name cannot be empty".to_string()));
        }
        if name.chars().count() > self.config.max_name_chars {
            return Err(GameError::InvalidInput(format!(
                "Name must be at most {} characters",
                self.config.max_name_chars
            )));
        }
        Ok(name.to_string())
    }

    /// Join the newest game with this code while it is still in the lobby
    pub async fn join_game(&self, code: &str, display_name: &str) -> GameResult<(GameId, Player)> {
        let code = code.trim().to_uppercase();
        let display_name = self.validate_name(display_name)?;

        let (game_id, player) = {
            let mut games = self.games.write().await;
            let game = games
                .values_mut()
                .filter(|g| g.code == code)
                .max_by_key(|g| g.created_at)
                .ok_or_else(|| GameError::CodeNotFound(code.clone()))?;

            if game.status != GameStatus::Lobby {
                return Err(GameError::invalid_state("The game has already started"));
            }

            if name_taken(game, &display_name) {
                return Err(GameError::InvalidInput(
                    "That name is already taken".to_string(),
                ));
            }

            let player = new_player(display_name, false, false);
            game.players.insert(player.id.clone(), player.clone());
            (game.id.clone(), player)
        };

        tracing::info!(
            "Player {} joined game {} as {}",
            player.id,
            game_id,
            player.display_name
        );

        self.broadcast(
            &game_id,
            ServerMessage::PlayerJoined {
                player: PlayerView::from(&player),
            },
        )
        .await;
        self.broadcast_state(&game_id).await;

        Ok((game_id, player))
    }

    /// Idempotent: returns the existing AI player if there is one
    pub async fn add_ai_player(&self, game_id: &str, by: &str) -> GameResult<Player> {
        let (player, added) = {
            let mut games = self.games.write().await;
            let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
            ensure_host(game, by, "add the AI player")?;

            if game.status == GameStatus::Finished {
                return Err(GameError::invalid_state("The game is over"));
            }

            insert_ai_player(game, &self.config.ai_player_name)
        };

        if added {
            tracing::info!("AI player {} added to game {}", player.id, game_id);
            self.broadcast(
                game_id,
                ServerMessage::PlayerJoined {
                    player: PlayerView::from(&player),
                },
            )
            .await;
            self.broadcast_state(game_id).await;
        }

        Ok(player)
    }

    pub async fn remove_player(&self, game_id: &str, by: &str, player_id: &str) -> GameResult<()> {
        {
            let mut games = self.games.write().await;
            let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
            ensure_host(game, by, "remove players")?;

            if player_id == game.host_id {
                return Err(GameError::invalid_state("The host cannot be removed"));
            }
            game.players
                .remove(player_id)
                .ok_or(GameError::PlayerNotFound)?;
        }

        tracing::info!("Player {} removed from game {}", player_id, game_id);

        self.broadcast(
            game_id,
            ServerMessage::PlayerRemoved {
                player_id: player_id.to_string(),
            },
        )
        .await;
        self.broadcast_state(game_id).await;

        Ok(())
    }

    pub async fn get_player_by_token(&self, game_id: &str, token: &str) -> GameResult<Player> {
        let games = self.games.read().await;
        let game = games.get(game_id).ok_or(GameError::GameNotFound)?;
        game.player_by_token(token)
            .cloned()
            .ok_or(GameError::PlayerNotFound)
    }
}
