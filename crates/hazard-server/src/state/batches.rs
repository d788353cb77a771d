//! Batch runs over several routes.
//!
//! Every run has its own progress record keyed by run id, so concurrent runs
//! never share counters. Routes inside one run are processed one at a time.

use chrono::{DateTime, Utc};
use hazard_core::{AnalysisStatus, Route, RouteAnalysis, RouteMetadata, Waypoint};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::AppState;
use crate::analysis::AnalyzeOptions;

/// A route as submitted by a client: metadata plus raw waypoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSubmission {
    #[serde(flatten)]
    pub metadata: RouteMetadata,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

impl RouteSubmission {
    /// Name for progress reporting, even when no key can be derived.
    pub fn label(&self, position: usize) -> String {
        self.metadata
            .route_key()
            .unwrap_or_else(|_| format!("route #{}", position + 1))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub route_key: String,
    pub status: AnalysisStatus,
    pub hazard_count: usize,
    pub sharp_turns: usize,
    pub accident_prone_areas: usize,
    pub errors: Vec<String>,
}

impl BatchItem {
    fn from_analysis(analysis: &RouteAnalysis) -> Self {
        Self {
            route_key: analysis.route.route_key.clone(),
            status: analysis.status,
            hazard_count: analysis.hazard_count(),
            sharp_turns: analysis.sharp_turns.len(),
            accident_prone_areas: analysis.accident_prone_areas.len(),
            errors: analysis.errors.clone(),
        }
    }

    fn failed(route_key: String, error: String) -> Self {
        Self {
            route_key,
            status: AnalysisStatus::Error,
            hazard_count: 0,
            sharp_turns: 0,
            accident_prone_areas: 0,
            errors: vec![error],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub run_id: String,
    pub status: AnalysisStatus,
    pub enhanced: bool,
    pub total_routes: usize,
    pub processed_routes: usize,
    pub current_route: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Vec<BatchItem>,
}

impl BatchProgress {
    pub fn new(run_id: String, total_routes: usize, enhanced: bool) -> Self {
        Self {
            run_id,
            status: AnalysisStatus::Idle,
            enhanced,
            total_routes,
            processed_routes: 0,
            current_route: None,
            started_at: Utc::now(),
            finished_at: None,
            results: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, AnalysisStatus::Complete | AnalysisStatus::Error)
    }
}

/// Process `submissions` in order, updating the run's progress as it goes.
pub async fn run_batch(
    state: Arc<AppState>,
    run_id: String,
    submissions: Vec<RouteSubmission>,
    options: AnalyzeOptions,
) {
    info!("Batch {} started with {} routes", run_id, submissions.len());
    state.update_batch(&run_id, |progress| progress.status = AnalysisStatus::Running);

    for (position, submission) in submissions.into_iter().enumerate() {
        let label = submission.label(position);
        state.update_batch(&run_id, |progress| progress.current_route = Some(label.clone()));

        let item = match Route::build(submission.metadata, submission.waypoints) {
            Ok(route) => BatchItem::from_analysis(&state.analyze_route(route, options).await),
            Err(err) => {
                warn!("Batch {}: skipping {}: {}", run_id, label, err);
                BatchItem::failed(label, err.to_string())
            }
        };

        state.update_batch(&run_id, |progress| {
            progress.processed_routes += 1;
            progress.results.push(item);
        });
    }

    state.update_batch(&run_id, |progress| {
        progress.status = AnalysisStatus::Complete;
        progress.current_route = None;
        progress.finished_at = Some(Utc::now());
    });
    info!("Batch {} complete", run_id);
}
