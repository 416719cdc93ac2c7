use super::AppState;
use crate::content::ai_guess_delay;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::technique::{dedup_techniques, Technique};
use crate::types::*;
use chrono::{DateTime, Utc};

impl AppState {
    pub async fn submit_guess(
        &self,
        game_id: &str,
        player_id: &str,
        techniques: Vec<Technique>,
    ) -> GameResult<(u32, Guess)> {
        self.submit_guess_at(game_id, player_id, techniques, Utc::now())
            .await
    }

    /// Record a player's one guess for the current round. Returns the
    /// round number the guess counted for.
    pub async fn submit_guess_at(
        &self,
        game_id: &str,
        player_id: &str,
        techniques: Vec<Technique>,
        now: DateTime<Utc>,
    ) -> GameResult<(u32, Guess)> {
        self.record_guess(game_id, player_id, techniques, None, now)
            .await
    }

    /// Store the guess, and the AI player's comment with it, under one lock
    async fn record_guess(
        &self,
        game_id: &str,
        player_id: &str,
        techniques: Vec<Technique>,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> GameResult<(u32, Guess)> {
        let techniques = dedup_techniques(&techniques);
        if techniques.is_empty() {
            return Err(GameError::InvalidInput(
                "Pick at least one technique".to_string(),
            ));
        }

        let (guess, round_number, guessed, total) = {
            let mut games = self.games.write().await;
            let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
            if !game.players.contains_key(player_id) {
                return Err(GameError::PlayerNotFound);
            }
            let total = game.players.len();
            let round = game.current_round_mut().ok_or(GameError::RoundNotFound)?;

            if round.phase != RoundPhase::Guessing {
                return Err(GameError::invalid_state("Guessing is closed"));
            }
            if round.guessing_ends_at.is_some_and(|ends| now > ends) {
                return Err(GameError::invalid_state("Time is up"));
            }
            if round.guesses.contains_key(player_id) {
                return Err(GameError::invalid_state(
                    "You already submitted a guess this round",
                ));
            }

            let guess = Guess {
                techniques,
                timestamp: now,
            };
            round.guesses.insert(player_id.to_string(), guess.clone());
            if comment.is_some() {
                round.ai_player_comment = comment;
            }
            (guess, round.number, round.guesses.len(), total)
        };

        tracing::debug!(
            "Guess from {} in game {}: {:?}",
            player_id,
            game_id,
            guess.techniques
        );

        self.broadcast(
            game_id,
            ServerMessage::GuessProgress {
                round_number,
                guessed,
                total,
            },
        )
        .await;

        if self.config.end_guessing_when_all_guessed && guessed >= total {
            self.end_guessing_at(game_id, now).await?;
        }

        Ok((round_number, guess))
    }

    /// Let the AI player guess the given round, if it is still open
    pub async fn play_ai_guess(&self, game_id: &str, round_id: &str) -> GameResult<Guess> {
        let (ai_id, post) = {
            let games = self.games.read().await;
            let game = games.get(game_id).ok_or(GameError::GameNotFound)?;
            let ai = game.ai_player().ok_or(GameError::PlayerNotFound)?;
            let round = game
                .current_round()
                .filter(|r| r.id == round_id)
                .ok_or(GameError::RoundNotFound)?;
            if round.phase != RoundPhase::Guessing {
                return Err(GameError::invalid_state("Guessing is closed"));
            }
            (ai.id.clone(), round.manipulative_post.clone())
        };

        let ai_guess = self.content.ai_player_guess(&post).await;
        let (_, guess) = self
            .record_guess(
                game_id,
                &ai_id,
                ai_guess.techniques,
                Some(ai_guess.analysis),
                Utc::now(),
            )
            .await?;

        Ok(guess)
    }

    pub(super) fn spawn_ai_guess(&self, game_id: &str, round_id: &str) {
        let state = self.clone();
        let game_id = game_id.to_string();
        let round_id = round_id.to_string();
        let delay = ai_guess_delay();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match state.play_ai_guess(&game_id, &round_id).await {
                Ok(guess) => tracing::info!(
                    "AI player guessed {:?} in {} of game {}",
                    guess.techniques,
                    round_id,
                    game_id
                ),
                Err(e) => tracing::debug!("AI player skipped {} of game {}: {}", round_id, game_id, e),
            }
        });
    }
}
