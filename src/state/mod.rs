mod game;
mod guess;
mod player;
mod round;
mod score;

use crate::config::{GameConfig, ServerConfig};
use crate::content::ContentService;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::scoring::ScoringRules;
use crate::types::*;
use crate::view::GameView;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

pub use score::score_round;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub games: Arc<RwLock<HashMap<GameId, Game>>>,
    /// One broadcast channel per game, fanned out to its sockets
    channels: Arc<RwLock<HashMap<GameId, broadcast::Sender<ServerMessage>>>>,
    pub content: Arc<ContentService>,
    pub config: Arc<GameConfig>,
    pub server: Arc<ServerConfig>,
    pub scoring: ScoringRules,
}

impl AppState {
    /// State with default configuration and canned content only
    pub fn new() -> Self {
        Self::with_config(
            GameConfig::default(),
            ServerConfig::default(),
            ContentService::offline(),
        )
    }

    pub fn with_config(config: GameConfig, server: ServerConfig, content: ContentService) -> Self {
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
            channels: Arc::new(RwLock::new(HashMap::new())),
            content: Arc::new(content),
            config: Arc::new(config),
            server: Arc::new(server),
            scoring: ScoringRules::default(),
        }
    }

    pub async fn get_game(&self, game_id: &str) -> GameResult<Game> {
        self.games
            .read()
            .await
            .get(game_id)
            .cloned()
            .ok_or(GameError::GameNotFound)
    }

    pub async fn game_view(&self, game_id: &str, viewer: Option<&str>) -> GameResult<GameView> {
        let games = self.games.read().await;
        let game = games.get(game_id).ok_or(GameError::GameNotFound)?;
        Ok(GameView::new(game, viewer))
    }

    /// Receiver for everything broadcast to this game
    pub async fn subscribe(&self, game_id: &str) -> GameResult<broadcast::Receiver<ServerMessage>> {
        self.channels
            .read()
            .await
            .get(game_id)
            .map(|tx| tx.subscribe())
            .ok_or(GameError::GameNotFound)
    }

    async fn open_channel(&self, game_id: &str) {
        let (tx, _rx) = broadcast::channel(100);
        self.channels.write().await.insert(game_id.to_string(), tx);
    }

    /// Send a message to every socket of a game
    pub async fn broadcast(&self, game_id: &str, msg: ServerMessage) {
        if let Some(tx) = self.channels.read().await.get(game_id) {
            // No connected receivers is fine
            let _ = tx.send(msg);
        }
    }

    /// Broadcast the public snapshot of a game
    pub async fn broadcast_state(&self, game_id: &str) {
        match self.game_view(game_id, None).await {
            Ok(game) => self.broadcast(game_id, ServerMessage::GameState { game }).await,
            Err(e) => tracing::warn!("Cannot broadcast state of {}: {}", game_id, e),
        }
    }

    /// Broadcast the phase of the current round
    async fn broadcast_phase(&self, game_id: &str) {
        let msg = {
            let games = self.games.read().await;
            let Some(round) = games.get(game_id).and_then(|g| g.current_round()) else {
                return;
            };
            ServerMessage::Phase {
                round_number: round.number,
                phase: round.phase,
                deadline: (round.phase == RoundPhase::Guessing)
                    .then(|| round.guessing_ends_at.map(|t| t.to_rfc3339()))
                    .flatten(),
                server_now: chrono::Utc::now().to_rfc3339(),
            }
        };
        self.broadcast(game_id, msg).await;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Host authority comes from the session, never from a client claim
fn ensure_host(game: &Game, player_id: &str, action: &'static str) -> GameResult<()> {
    if game.host_id == player_id {
        Ok(())
    } else {
        Err(GameError::NotHost(action))
    }
}
