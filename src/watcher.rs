use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;

/// Spawn a background task that moves rounds along when their deadlines pass.
/// Guessing closes at its deadline, and the reveal turns into the comparison.
pub fn spawn_phase_watcher(state: Arc<AppState>, interval: Duration) {
    tokio::spawn(async move {
        tracing::info!("Phase watcher running every {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;
            state.tick(chrono::Utc::now()).await;
        }
    });
}
