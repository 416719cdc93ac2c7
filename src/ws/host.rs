//! Host-only command handlers
//!
//! Authorization is checked in the dispatch layer before calling these; the
//! state methods check the host id once more under the lock.

use crate::error::GameResult;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::PlayerId;
use std::sync::Arc;

use super::Session;

/// Errors go back to the host; successes reach everyone through broadcasts
fn reply(result: GameResult<()>) -> Option<ServerMessage> {
    match result {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!("Host command failed: {}", e);
            Some(e.into())
        }
    }
}

fn host_id(session: &Session) -> &str {
    session.player_id.as_deref().unwrap_or_default()
}

pub async fn handle_start_game(state: &Arc<AppState>, session: &Session) -> Option<ServerMessage> {
    tracing::info!("Host starting game {}", session.game_id);
    reply(state.start_game(&session.game_id, host_id(session)).await)
}

pub async fn handle_advance(state: &Arc<AppState>, session: &Session) -> Option<ServerMessage> {
    tracing::info!("Host advancing game {}", session.game_id);
    reply(state.advance(&session.game_id, host_id(session)).await)
}

pub async fn handle_end_game(state: &Arc<AppState>, session: &Session) -> Option<ServerMessage> {
    tracing::info!("Host ending game {}", session.game_id);
    reply(state.end_game(&session.game_id, host_id(session)).await)
}

pub async fn handle_add_ai_player(
    state: &Arc<AppState>,
    session: &Session,
) -> Option<ServerMessage> {
    reply(
        state
            .add_ai_player(&session.game_id, host_id(session))
            .await
            .map(|_| ()),
    )
}

pub async fn handle_remove_player(
    state: &Arc<AppState>,
    session: &Session,
    player_id: PlayerId,
) -> Option<ServerMessage> {
    tracing::info!("Host removing player {}", player_id);
    reply(
        state
            .remove_player(&session.game_id, host_id(session), &player_id)
            .await,
    )
}
