//! HTTP API endpoints.
//!
//! Games are created and joined over HTTP; everything that happens during a
//! game goes over the WebSocket.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{self, AuthConfig};
use crate::error::GameResult;
use crate::state::AppState;
use crate::technique::Technique;
use crate::types::{GameId, GameStatus, PlayerId};
use crate::view::GameView;
use crate::ws;

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    pub host_name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateGameResponse {
    pub game_id: GameId,
    pub code: String,
    /// What the QR code on the lobby screen encodes
    pub join_url: String,
    pub player_id: PlayerId,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct CodeLookupResponse {
    pub game_id: GameId,
    pub status: GameStatus,
    pub player_count: usize,
}

#[derive(Debug, Serialize)]
pub struct TechniqueInfo {
    pub tag: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub llm: bool,
}

/// Create a game; the caller becomes its host.
///
/// POST /api/games
pub async fn create_game(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGameRequest>,
) -> GameResult<(StatusCode, Json<CreateGameResponse>)> {
    let (game, host) = state.create_game(&req.host_name).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateGameResponse {
            join_url: state.server.join_url(&game.code),
            game_id: game.id,
            code: game.code,
            player_id: host.id,
            token: host.token,
        }),
    ))
}

/// Public snapshot of a game.
///
/// GET /api/games/{id}
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<GameId>,
) -> GameResult<Json<GameView>> {
    state.game_view(&game_id, None).await.map(Json)
}

/// Resolve a join code before asking for a name.
///
/// GET /api/games/code/{code}
pub async fn lookup_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> GameResult<Json<CodeLookupResponse>> {
    let game = state.find_game_by_code(&code).await?;

    Ok(Json(CodeLookupResponse {
        player_count: game.players.len(),
        game_id: game.id,
        status: game.status,
    }))
}

/// POST /api/join/{code}
pub async fn join_game(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<JoinRequest>,
) -> GameResult<Json<JoinResponse>> {
    let (game_id, player) = state.join_game(&code, &req.display_name).await?;

    Ok(Json(JoinResponse {
        game_id,
        player_id: player.id,
        token: player.token,
    }))
}

/// GET /api/techniques
pub async fn list_techniques() -> Json<Vec<TechniqueInfo>> {
    Json(
        Technique::ALL
            .iter()
            .map(|t| TechniqueInfo {
                tag: t.tag(),
                label: t.label(),
                description: t.description(),
            })
            .collect(),
    )
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        llm: state.content.has_llm(),
    })
}

/// API and WebSocket routes; static files are layered on by the binary
pub fn router(state: Arc<AppState>, auth_config: Arc<AuthConfig>) -> Router {
    let host_routes = Router::new()
        .route("/api/games", post(create_game))
        .layer(middleware::from_fn_with_state(
            auth_config,
            auth::host_auth_middleware,
        ));

    Router::new()
        .merge(host_routes)
        .route("/api/games/{id}", get(get_game))
        .route("/api/games/code/{code}", get(lookup_code))
        .route("/api/join/{code}", post(join_game))
        .route("/api/techniques", get(list_techniques))
        .route("/api/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}
