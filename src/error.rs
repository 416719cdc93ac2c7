use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

/// Errors from game operations, shared by the HTTP API and the WebSocket protocol.
#[derive(Debug, Error, PartialEq)]
pub enum GameError {
    #[error("Game not found")]
    GameNotFound,
    #[error("No open game found for code {0}")]
    CodeNotFound(String),
    #[error("Player not found")]
    PlayerNotFound,
    #[error("Round not found")]
    RoundNotFound,
    /// Carries the action that was refused
    #[error("Only the host can {0}")]
    NotHost(&'static str),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Operation is not allowed in the current game or round state
    #[error("{0}")]
    InvalidState(String),
}

impl GameError {
    /// Stable machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::GameNotFound => "GAME_NOT_FOUND",
            GameError::CodeNotFound(_) => "CODE_NOT_FOUND",
            GameError::PlayerNotFound => "PLAYER_NOT_FOUND",
            GameError::RoundNotFound => "ROUND_NOT_FOUND",
            GameError::NotHost(_) => "UNAUTHORIZED",
            GameError::InvalidInput(_) => "INVALID_INPUT",
            GameError::InvalidState(_) => "INVALID_STATE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GameError::GameNotFound
            | GameError::CodeNotFound(_)
            | GameError::PlayerNotFound
            | GameError::RoundNotFound => StatusCode::NOT_FOUND,
            GameError::NotHost(_) => StatusCode::FORBIDDEN,
            GameError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GameError::InvalidState(_) => StatusCode::CONFLICT,
        }
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        GameError::InvalidState(msg.into())
    }
}

pub type GameResult<T> = Result<T, GameError>;

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for GameError {
    fn into_response(self) -> axum::response::Response {
        let payload = Json(ErrorBody {
            code: self.code(),
            message: self.to_string(),
        });

        (self.status(), payload).into_response()
    }
}
