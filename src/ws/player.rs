//! Player message handlers

use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::technique::Technique;
use std::sync::Arc;

use super::Session;

pub async fn handle_submit_guess(
    state: &Arc<AppState>,
    session: &Session,
    techniques: Vec<String>,
) -> Option<ServerMessage> {
    let Some(player_id) = &session.player_id else {
        return Some(ServerMessage::Error {
            code: "UNAUTHORIZED".to_string(),
            msg: "Join the game to submit a guess".to_string(),
        });
    };

    let parsed: Result<Vec<Technique>, _> = techniques.iter().map(|t| t.parse()).collect();
    let techniques = match parsed {
        Ok(techniques) => techniques,
        Err(e) => return Some(GameError::InvalidInput(e.to_string()).into()),
    };

    match state
        .submit_guess(&session.game_id, player_id, techniques)
        .await
    {
        Ok((round_number, guess)) => Some(ServerMessage::GuessAccepted {
            round_number,
            techniques: guess.techniques,
        }),
        Err(e) => {
            tracing::debug!("Guess from {} rejected: {}", player_id, e);
            Some(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{playing_game, test_state};
    use crate::types::Role;

    #[tokio::test]
    async fn test_guess_accepted_names_its_round() {
        let state = Arc::new(test_state());
        let (game_id, _host, alice) = playing_game(&state).await;

        state.end_guessing_at(&game_id, chrono::Utc::now()).await.unwrap();
        state.to_comparison(&game_id).await.unwrap();
        state.next_round(&game_id).await.unwrap();

        let session = Session {
            game_id: game_id.clone(),
            player_id: Some(alice.id.clone()),
            role: Role::Player,
        };
        match handle_submit_guess(&state, &session, vec!["bandwagon".to_string()]).await {
            Some(ServerMessage::GuessAccepted { round_number, .. }) => assert_eq!(round_number, 2),
            other => panic!("unexpected reply: {:?}", other),
        }
    }
}
