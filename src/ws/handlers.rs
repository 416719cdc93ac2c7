//! WebSocket message dispatch
//!
//! Authorization is checked here, then dispatched to role-specific handler modules.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;
use std::sync::Arc;

use super::{host, player, Session};

/// Macro to check host authorization and return early if unauthorized
macro_rules! check_host {
    ($session:expr, $action:expr) => {
        if $session.role != Role::Host {
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only the host can {}", $action),
            });
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    session: &Session,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::SubmitGuess { techniques } => {
            player::handle_submit_guess(state, session, techniques).await
        }

        // Host-only commands (authorization checked before dispatch)
        ClientMessage::HostStartGame => {
            check_host!(session, "start the game");
            host::handle_start_game(state, session).await
        }

        ClientMessage::HostAdvance => {
            check_host!(session, "advance the game");
            host::handle_advance(state, session).await
        }

        ClientMessage::HostEndGame => {
            check_host!(session, "end the game");
            host::handle_end_game(state, session).await
        }

        ClientMessage::HostAddAiPlayer => {
            check_host!(session, "add the AI player");
            host::handle_add_ai_player(state, session).await
        }

        ClientMessage::HostRemovePlayer { player_id } => {
            check_host!(session, "remove players");
            host::handle_remove_player(state, session, player_id).await
        }
    }
}
