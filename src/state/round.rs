use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// What the phase watcher has to do for a game
#[derive(Debug, Clone, PartialEq)]
enum DueTransition {
    EndGuessing,
    ToComparison,
}

impl AppState {
    /// Generate a post and open guessing for round `number`.
    ///
    /// A round with the same number can only be created once, so repeated
    /// clicks are rejected instead of starting a second round.
    pub async fn begin_round(&self, game_id: &str, number: u32) -> GameResult<()> {
        let round_id = Round::round_id(number);

        {
            let games = self.games.read().await;
            let game = games.get(game_id).ok_or(GameError::GameNotFound)?;
            check_can_begin(game, &round_id, number)?;
        }

        // No lock is held while the content is generated
        let post = self.content.generate_post().await;

        let has_ai = {
            let mut games = self.games.write().await;
            let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
            check_can_begin(game, &round_id, number)?;

            let mut round = Round {
                id: round_id.clone(),
                number,
                topic: post.topic,
                manipulative_post: post.post,
                correct_techniques: post.techniques,
                ai_analysis: None,
                ai_player_comment: None,
                guesses: HashMap::new(),
                phase: RoundPhase::Waiting,
                started_at: None,
                guessing_ends_at: None,
                revealed_at: None,
                scored_at: None,
                points: HashMap::new(),
            };

            let now = Utc::now();
            round.phase = RoundPhase::Guessing;
            round.started_at = Some(now);
            round.guessing_ends_at = Some(now + self.config.guessing_duration());

            tracing::info!(
                "Round {} of game {} on {} using {:?}",
                number,
                game_id,
                round.topic,
                round.correct_techniques
            );

            game.rounds.insert(round_id.clone(), round);
            game.current_round_id = Some(round_id.clone());
            game.current_round_number = number;
            game.ai_player().is_some()
        };

        self.broadcast_state(game_id).await;
        self.broadcast_phase(game_id).await;

        if has_ai {
            self.spawn_ai_guess(game_id, &round_id);
        }

        Ok(())
    }

    /// Close guessing on the current round. Returns false if it was
    /// already closed.
    pub async fn end_guessing_at(&self, game_id: &str, now: DateTime<Utc>) -> GameResult<bool> {
        let round_id = {
            let mut games = self.games.write().await;
            let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
            let round = game.current_round_mut().ok_or(GameError::RoundNotFound)?;

            match round.phase {
                RoundPhase::Guessing => {}
                RoundPhase::Waiting => {
                    return Err(GameError::invalid_state("Guessing has not started yet"))
                }
                _ => return Ok(false),
            }

            round.phase = RoundPhase::Reveal;
            round.revealed_at = Some(now);
            tracing::info!(
                "Guessing closed for {} of game {} with {} guesses",
                round.id,
                game_id,
                round.guesses.len()
            );
            round.id.clone()
        };

        self.broadcast_state(game_id).await;
        self.broadcast_phase(game_id).await;
        self.spawn_analysis(game_id, &round_id);

        Ok(true)
    }

    /// Move from reveal to comparison, scoring with the canned analysis if
    /// the real one has not arrived
    pub async fn to_comparison(&self, game_id: &str) -> GameResult<bool> {
        let (round_id, round_number, stored, scored) = {
            let mut games = self.games.write().await;
            let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
            let round = game.current_round().ok_or(GameError::RoundNotFound)?;

            match round.phase {
                RoundPhase::Reveal => {}
                RoundPhase::Comparison | RoundPhase::Complete => return Ok(false),
                _ => return Err(GameError::invalid_state("Guessing is still open")),
            }
            let round_id = round.id.clone();
            let round_number = round.number;

            let (stored, scored) = self.ensure_analysis(game, &round_id)?;
            if let Some(round) = game.rounds.get_mut(&round_id) {
                round.phase = RoundPhase::Comparison;
            }
            (round_id, round_number, stored, scored)
        };

        tracing::info!("Comparison for {} of game {}", round_id, game_id);
        self.announce_results(game_id, &round_id, round_number, stored, scored)
            .await;
        self.broadcast_state(game_id).await;
        self.broadcast_phase(game_id).await;

        Ok(true)
    }

    /// Complete the current round, then start the next one or finish the game
    pub async fn next_round(&self, game_id: &str) -> GameResult<()> {
        let (number, finished) = {
            let mut games = self.games.write().await;
            let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
            let total_rounds = game.total_rounds;
            let round = game.current_round_mut().ok_or(GameError::RoundNotFound)?;

            match round.phase {
                RoundPhase::Comparison => {}
                RoundPhase::Complete => {
                    return Err(GameError::invalid_state(
                        "The next round is already being prepared",
                    ))
                }
                _ => return Err(GameError::invalid_state("The round is not over yet")),
            }

            round.phase = RoundPhase::Complete;
            let number = round.number;
            let finished = number >= total_rounds;
            if finished {
                game.status = GameStatus::Finished;
            }
            (number, finished)
        };

        self.broadcast_phase(game_id).await;

        if finished {
            self.announce_finish(game_id).await;
            Ok(())
        } else {
            self.begin_round(game_id, number + 1).await
        }
    }

    /// The host's "next" button
    pub async fn advance(&self, game_id: &str, by: &str) -> GameResult<()> {
        let phase = {
            let games = self.games.read().await;
            let game = games.get(game_id).ok_or(GameError::GameNotFound)?;
            super::ensure_host(game, by, "advance the game")?;

            match game.status {
                GameStatus::Lobby => return Err(GameError::invalid_state("Start the game first")),
                GameStatus::Finished => return Err(GameError::invalid_state("The game is over")),
                GameStatus::Playing => {}
            }

            game.current_round()
                .map(|r| r.phase)
                .ok_or_else(|| GameError::invalid_state("The first round is being prepared"))?
        };

        match phase {
            RoundPhase::Guessing => self.end_guessing_at(game_id, Utc::now()).await.map(|_| ()),
            RoundPhase::Reveal => self.to_comparison(game_id).await.map(|_| ()),
            RoundPhase::Comparison => self.next_round(game_id).await,
            RoundPhase::Waiting | RoundPhase::Complete => Err(GameError::invalid_state(
                "The next round is being prepared",
            )),
        }
    }

    /// Enforce phase deadlines for every running game
    pub async fn tick(&self, now: DateTime<Utc>) {
        let due: Vec<(GameId, DueTransition)> = {
            let games = self.games.read().await;
            games
                .values()
                .filter(|g| g.status == GameStatus::Playing)
                .filter_map(|g| self.due_transition(g, now).map(|t| (g.id.clone(), t)))
                .collect()
        };

        for (game_id, transition) in due {
            let result = match transition {
                DueTransition::EndGuessing => self.end_guessing_at(&game_id, now).await,
                DueTransition::ToComparison => self.to_comparison(&game_id).await,
            };
            if let Err(e) = result {
                tracing::warn!("Deadline transition for game {} failed: {}", game_id, e);
            }
        }
    }

    fn due_transition(&self, game: &Game, now: DateTime<Utc>) -> Option<DueTransition> {
        let round = game.current_round()?;

        match round.phase {
            RoundPhase::Guessing => {
                let deadline_passed = round.guessing_ends_at.is_some_and(|ends| now >= ends);
                let all_guessed = self.config.end_guessing_when_all_guessed
                    && !game.players.is_empty()
                    && game.players.keys().all(|id| round.guesses.contains_key(id));

                (deadline_passed || all_guessed).then_some(DueTransition::EndGuessing)
            }
            RoundPhase::Reveal => {
                let seconds = if round.ai_analysis.is_some() {
                    self.config.reveal_seconds
                } else {
                    self.config.reveal_fallback_seconds
                };
                let revealed_at = round.revealed_at?;
                let due = now >= revealed_at + chrono::Duration::seconds(i64::from(seconds));

                due.then_some(DueTransition::ToComparison)
            }
            _ => None,
        }
    }
}

fn check_can_begin(game: &Game, round_id: &str, number: u32) -> GameResult<()> {
    if game.status != GameStatus::Playing {
        return Err(GameError::invalid_state("The game is not running"));
    }
    if number == 0 || number > game.total_rounds {
        return Err(GameError::InvalidInput(format!(
            "Round {} is outside 1..={}",
            number, game.total_rounds
        )));
    }
    if game.rounds.contains_key(round_id) {
        return Err(GameError::invalid_state(format!(
            "Round {} already exists",
            number
        )));
    }
    Ok(())
}
