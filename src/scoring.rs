//! Points for a single guess.

use crate::technique::{dedup_techniques, Technique};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ScoringRules {
    pub points_per_correct: u32,
    /// Awarded when every correct technique was found and nothing else was guessed
    pub perfect_bonus: u32,
    pub max_speed_bonus: u32,
    pub penalty_per_wrong: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            points_per_correct: 10,
            perfect_bonus: 20,
            max_speed_bonus: 10,
            penalty_per_wrong: 5,
        }
    }
}

/// Score a guess against the correct techniques.
///
/// `time_remaining` is how much of the guessing window was left when the
/// guess came in; the speed bonus scales linearly with it.
pub fn calculate_score(
    guess: &[Technique],
    correct: &[Technique],
    time_remaining: Duration,
    total_time: Duration,
    rules: &ScoringRules,
) -> u32 {
    let guess = dedup_techniques(guess);

    let correct_count = guess.iter().filter(|t| correct.contains(t)).count() as u32;
    let wrong_count = guess.len() as u32 - correct_count;

    let mut score = correct_count * rules.points_per_correct;

    let distinct_correct = dedup_techniques(correct).len() as u32;
    if correct_count == distinct_correct && wrong_count == 0 {
        score += rules.perfect_bonus;
    }

    score += speed_bonus(time_remaining, total_time, rules.max_speed_bonus);

    score.saturating_sub(wrong_count * rules.penalty_per_wrong)
}

fn speed_bonus(time_remaining: Duration, total_time: Duration, max_bonus: u32) -> u32 {
    if total_time.is_zero() {
        return 0;
    }
    let ratio = (time_remaining.as_secs_f64() / total_time.as_secs_f64()).clamp(0.0, 1.0);
    (ratio * f64::from(max_bonus)).floor() as u32
}
