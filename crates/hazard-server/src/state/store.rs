//! Application state: database, analyzer and batch progress.

use anyhow::Result;
use dashmap::DashMap;
use hazard_core::{Route, RouteAnalysis};
use std::sync::Arc;

use super::batches::{run_batch, BatchProgress, RouteSubmission};
use crate::analysis::{AnalyzeOptions, RouteAnalyzer};
use crate::config::Config;
use crate::persistence::{hazards, routes, Database};

/// Finished batch runs kept for progress queries.
const MAX_FINISHED_BATCHES: usize = 100;

pub struct AppState {
    db: Database,
    config: Config,
    analyzer: RouteAnalyzer,
    batches: DashMap<String, BatchProgress>,
}

impl AppState {
    pub fn new(db: Database, config: Config, analyzer: RouteAnalyzer) -> Self {
        Self {
            db,
            config,
            analyzer,
            batches: DashMap::new(),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn analyzer(&self) -> &RouteAnalyzer {
        &self.analyzer
    }

    /// Options for a request, filling unset flags from configuration.
    pub fn analyze_options(&self, enhanced: Option<bool>, use_cache: Option<bool>) -> AnalyzeOptions {
        AnalyzeOptions {
            enhanced: enhanced.unwrap_or(self.config.enhanced_default),
            use_cache: use_cache.unwrap_or(self.config.cache_enabled),
        }
    }

    /// Analyze and persist one route. Cached results are not written again.
    pub async fn analyze_route(&self, route: Route, options: AnalyzeOptions) -> RouteAnalysis {
        let mut analysis = self.analyzer.analyze(route, options).await;
        if !analysis.cached {
            let notes = hazards::save_analysis(self.db.pool(), &analysis).await;
            analysis.errors.extend(notes);
        }
        analysis
    }

    pub async fn delete_route(&self, route_key: &str) -> Result<bool> {
        if let Some(cache) = self.analyzer.cache() {
            cache.invalidate(route_key);
        }
        routes::delete_route(self.db.pool(), route_key).await
    }

    /// Register a batch run and start it in the background.
    pub fn start_batch(
        self: &Arc<Self>,
        submissions: Vec<RouteSubmission>,
        options: AnalyzeOptions,
    ) -> BatchProgress {
        self.prune_batches();
        let run_id = uuid::Uuid::new_v4().to_string();
        let progress = BatchProgress::new(run_id.clone(), submissions.len(), options.enhanced);
        self.batches.insert(run_id.clone(), progress.clone());

        tokio::spawn(run_batch(self.clone(), run_id, submissions, options));
        progress
    }

    pub fn batch(&self, run_id: &str) -> Option<BatchProgress> {
        self.batches.get(run_id).map(|entry| entry.value().clone())
    }

    /// All known runs, newest first.
    pub fn batches(&self) -> Vec<BatchProgress> {
        let mut runs: Vec<BatchProgress> = self.batches.iter().map(|r| r.value().clone()).collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs
    }

    pub(crate) fn update_batch(&self, run_id: &str, update: impl FnOnce(&mut BatchProgress)) {
        if let Some(mut progress) = self.batches.get_mut(run_id) {
            update(progress.value_mut());
        }
    }

    fn prune_batches(&self) {
        let mut finished: Vec<(String, chrono::DateTime<chrono::Utc>)> = self
            .batches
            .iter()
            .filter(|entry| entry.value().is_finished())
            .map(|entry| (entry.key().clone(), entry.value().started_at))
            .collect();
        if finished.len() <= MAX_FINISHED_BATCHES {
            return;
        }
        finished.sort_by_key(|(_, started_at)| *started_at);
        let excess = finished.len() - MAX_FINISHED_BATCHES;
        for (run_id, _) in finished.into_iter().take(excess) {
            self.batches.remove(&run_id);
        }
    }
}
