pub mod handlers;
mod host;
mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;
use crate::types::{GameId, PlayerId, Role};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub game: GameId,
    pub token: Option<String>,
}

/// Who is on the other end of a socket
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub game_id: GameId,
    /// None for read-only displays
    pub player_id: Option<PlayerId>,
    pub role: Role,
}

impl Session {
    /// Resolve the connection's role from its token
    pub async fn resolve(
        state: &AppState,
        game_id: &str,
        token: Option<&str>,
    ) -> Result<Session, GameError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            state.get_game(game_id).await?;
            return Ok(Session {
                game_id: game_id.to_string(),
                player_id: None,
                role: Role::Display,
            });
        };

        let player = state.get_player_by_token(game_id, token).await?;
        let role = if player.is_host {
            Role::Host
        } else {
            Role::Player
        };

        Ok(Session {
            game_id: game_id.to_string(),
            player_id: Some(player.id),
            role,
        })
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let session = match Session::resolve(&state, &params.game, params.token.as_deref()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Rejected WebSocket for game {}: {}", params.game, e);
            return e.into_response();
        }
    };

    tracing::info!(
        "WebSocket connection request: game={}, role={:?}",
        session.game_id,
        session.role
    );

    ws.on_upgrade(move |socket| handle_socket(socket, session, state))
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, session: Session, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the welcome so no update falls in between
    let mut broadcast_rx = match state.subscribe(&session.game_id).await {
        Ok(rx) => rx,
        Err(e) => {
            tracing::error!("No channel for game {}: {}", session.game_id, e);
            return;
        }
    };

    let game = match state
        .game_view(&session.game_id, session.player_id.as_deref())
        .await
    {
        Ok(game) => game,
        Err(e) => {
            let _ = send_json(&mut sender, &e.into()).await;
            return;
        }
    };

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        role: session.role,
        player_id: session.player_id.clone(),
        game,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send_json(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    loop {
        tokio::select! {
            broadcast_msg = broadcast_rx.recv() => {
                match broadcast_msg {
                    Ok(msg) => {
                        let removed = matches!(
                            &msg,
                            ServerMessage::PlayerRemoved { player_id }
                                if session.player_id.as_ref() == Some(player_id)
                        );
                        if !send_json(&mut sender, &msg).await {
                            break;
                        }
                        if removed {
                            tracing::info!("Closing socket of removed player");
                            let _ = sender.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Catch up with a fresh snapshot instead of the missed updates
                        tracing::warn!("Socket lagged behind by {} messages", skipped);
                        if let Ok(game) = state.game_view(&session.game_id, session.player_id.as_deref()).await {
                            if !send_json(&mut sender, &ServerMessage::GameState { game }).await {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text.as_str());

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => handlers::handle_message(client_msg, &session, &state).await,
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(response) = response {
                            if !send_json(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(
        "WebSocket connection closed: game={}, role={:?}",
        session.game_id,
        session.role
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_roles() {
        let state = AppState::new();
        let (game, host) = state.create_game("Host").await.unwrap();
        let (_, alice) = state.join_game(&game.code, "Alice").await.unwrap();

        let session = Session::resolve(&state, &game.id, Some(&host.token))
            .await
            .unwrap();
        assert_eq!(session.role, Role::Host);

        let session = Session::resolve(&state, &game.id, Some(&alice.token))
            .await
            .unwrap();
        assert_eq!(session.role, Role::Player);
        assert_eq!(session.player_id, Some(alice.id));

        let session = Session::resolve(&state, &game.id, None).await.unwrap();
        assert_eq!(session.role, Role::Display);
        assert!(session.player_id.is_none());

        assert_eq!(
            Session::resolve(&state, &game.id, Some("forged")).await,
            Err(GameError::PlayerNotFound)
        );
        assert_eq!(
            Session::resolve(&state, "missing", None).await,
            Err(GameError::GameNotFound)
        );
    }
}
