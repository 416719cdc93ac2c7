use super::AppState;
use crate::content::fallback;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::scoring::{calculate_score, ScoringRules};
use crate::types::*;
use crate::view::leaderboard;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Score every guess of a round and add the points to the player totals.
///
/// Returns false if the round was already scored.
pub fn score_round(
    game: &mut Game,
    round_id: &str,
    rules: &ScoringRules,
    total_time: Duration,
    now: DateTime<Utc>,
) -> GameResult<bool> {
    let round = game.rounds.get_mut(round_id).ok_or(GameError::RoundNotFound)?;
    if round.scored_at.is_some() {
        return Ok(false);
    }

    for (player_id, guess) in &round.guesses {
        let time_remaining = round
            .guessing_ends_at
            .map(|ends| (ends - guess.timestamp).to_std().unwrap_or(Duration::ZERO))
            .unwrap_or(Duration::ZERO);

        let points = calculate_score(
            &guess.techniques,
            &round.correct_techniques,
            time_remaining,
            total_time,
            rules,
        );
        round.points.insert(player_id.clone(), points);

        // Players removed mid-round keep their round points but no total
        if let Some(player) = game.players.get_mut(player_id) {
            player.score += points;
        }
    }

    round.scored_at = Some(now);
    Ok(true)
}

impl AppState {
    fn guessing_time(&self) -> Duration {
        Duration::from_secs(u64::from(self.config.guessing_seconds))
    }

    /// Store the analysis of a revealed round and score it.
    ///
    /// The first analysis wins; later ones are ignored. Returns whether
    /// anything changed.
    pub async fn apply_analysis(
        &self,
        game_id: &str,
        round_id: &str,
        analysis: AiAnalysis,
    ) -> GameResult<bool> {
        let now = Utc::now();
        let (stored, scored, round_number) = {
            let mut games = self.games.write().await;
            let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
            let round = game.rounds.get_mut(round_id).ok_or(GameError::RoundNotFound)?;

            if !round.phase.is_revealed() {
                return Err(GameError::invalid_state(
                    "Analysis can only be applied after guessing closed",
                ));
            }

            let stored = round.ai_analysis.is_none();
            if stored {
                round.ai_analysis = Some(analysis);
            }
            let round_number = round.number;

            let scored = score_round(game, round_id, &self.scoring, self.guessing_time(), now)?;
            (stored, scored, round_number)
        };

        if stored {
            tracing::info!("Analysis stored for {} of game {}", round_id, game_id);
        }
        self.announce_results(game_id, round_id, round_number, stored, scored)
            .await;

        Ok(stored || scored)
    }

    /// Store the canned analysis if none arrived yet, and make sure the
    /// round is scored. Runs under the caller's write lock.
    pub(super) fn ensure_analysis(&self, game: &mut Game, round_id: &str) -> GameResult<(bool, bool)> {
        let now = Utc::now();
        let round = game.rounds.get_mut(round_id).ok_or(GameError::RoundNotFound)?;

        let stored = round.ai_analysis.is_none();
        if stored {
            tracing::warn!("No analysis for {} yet, using the canned one", round_id);
            round.ai_analysis = Some(fallback::fallback_analysis(
                &round.topic,
                &round.correct_techniques,
            ));
        }

        let scored = score_round(game, round_id, &self.scoring, self.guessing_time(), now)?;
        Ok((stored, scored))
    }

    /// Broadcast analysis and scores after they changed
    pub(super) async fn announce_results(
        &self,
        game_id: &str,
        round_id: &str,
        round_number: u32,
        stored: bool,
        scored: bool,
    ) {
        let (analysis, points, board) = {
            let games = self.games.read().await;
            let Some(game) = games.get(game_id) else {
                return;
            };
            let Some(round) = game.rounds.get(round_id) else {
                return;
            };
            (
                round.ai_analysis.clone(),
                round.points.clone(),
                leaderboard(game),
            )
        };

        if stored {
            if let Some(analysis) = analysis {
                self.broadcast(
                    game_id,
                    ServerMessage::Analysis {
                        round_number,
                        analysis,
                    },
                )
                .await;
            }
        }
        if scored {
            self.broadcast(
                game_id,
                ServerMessage::Scores {
                    round_number,
                    points,
                    leaderboard: board,
                },
            )
            .await;
        }
        if stored || scored {
            self.broadcast_state(game_id).await;
        }
    }

    /// Ask for the analysis of a round and apply it. Meant to run in the
    /// background after guessing closed.
    pub async fn run_analysis(&self, game_id: &str, round_id: &str) -> GameResult<bool> {
        let (post, topic, techniques) = {
            let games = self.games.read().await;
            let game = games.get(game_id).ok_or(GameError::GameNotFound)?;
            let round = game.rounds.get(round_id).ok_or(GameError::RoundNotFound)?;
            if round.ai_analysis.is_some() {
                return Ok(false);
            }
            (
                round.manipulative_post.clone(),
                round.topic.clone(),
                round.correct_techniques.clone(),
            )
        };

        let analysis = self.content.analyze_post(&post, &topic, &techniques).await;
        self.apply_analysis(game_id, round_id, analysis).await
    }

    pub(super) fn spawn_analysis(&self, game_id: &str, round_id: &str) {
        let state = self.clone();
        let game_id = game_id.to_string();
        let round_id = round_id.to_string();

        tokio::spawn(async move {
            if let Err(e) = state.run_analysis(&game_id, &round_id).await {
                tracing::warn!("Analysis for {} of game {} failed: {}", round_id, game_id, e);
            }
        });
    }

    pub async fn leaderboard(&self, game_id: &str) -> GameResult<Vec<crate::view::LeaderboardEntry>> {
        let games = self.games.read().await;
        let game = games.get(game_id).ok_or(GameError::GameNotFound)?;
        Ok(leaderboard(game))
    }
}
