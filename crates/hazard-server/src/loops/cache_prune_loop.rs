//! Periodic analysis-cache pruning.
//!
//! Expired entries are never served, but they hold memory until removed.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

use crate::state::AppState;

const PRUNE_INTERVAL_SECS: u64 = 60;

pub async fn run_cache_prune_loop(state: Arc<AppState>) {
    let Some(cache) = state.analyzer().cache() else {
        tracing::debug!("Analysis cache disabled; prune loop not started");
        return;
    };
    let mut ticker = interval(Duration::from_secs(PRUNE_INTERVAL_SECS));
    loop {
        ticker.tick().await;
        let before = cache.len();
        cache.prune();
        let removed = before.saturating_sub(cache.len());
        if removed > 0 {
            tracing::debug!("Pruned {} cached analyses", removed);
        }
    }
}
