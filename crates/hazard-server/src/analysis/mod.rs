//! Route analysis orchestration.
//!
//! Geometric detectors run on the blocking pool over a shared waypoint
//! slice. Road-tag lookups and, when the caller grants it, enrichment run as
//! concurrent async fan-outs. Any branch failure becomes a note in
//! `errors`; the analysis itself always completes.

pub mod enrichment;

use chrono::Utc;
use hazard_core::{
    derive_accident_prone_areas, detect_blind_spots, detect_sharp_turns, road_condition_from_tags,
    road_sample_indices, sample_network_coverage, AnalysisStatus, CoverageModel, ElevationGate,
    GeometryOnlyGate, HazardRules, RoadCondition, Route, RouteAnalysis, RouteContext,
    SimulatedCoverage, Waypoint,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::AnalysisCache;
use crate::config::Config;
use crate::providers::Providers;
use enrichment::{sample_waypoints, EnrichmentLimits};

pub use enrichment::Enrichment;

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeOptions {
    /// Permission to call paid or rate-limited enrichment providers.
    pub enhanced: bool,
    pub use_cache: bool,
}

pub struct RouteAnalyzer {
    providers: Providers,
    rules: HazardRules,
    limits: EnrichmentLimits,
    coverage: Arc<dyn CoverageModel>,
    elevation: Arc<dyn ElevationGate>,
    cache: Option<AnalysisCache>,
}

impl RouteAnalyzer {
    pub fn new(providers: Providers, rules: HazardRules, limits: EnrichmentLimits) -> Self {
        Self {
            providers,
            rules,
            limits,
            coverage: Arc::new(SimulatedCoverage::new()),
            elevation: Arc::new(GeometryOnlyGate),
            cache: None,
        }
    }

    pub fn from_config(providers: Providers, config: &Config) -> Self {
        let mut analyzer = Self::new(
            providers,
            config.rules.clone(),
            EnrichmentLimits::from_config(config),
        );
        if let Some(seed) = config.coverage_seed {
            analyzer = analyzer.with_coverage(Arc::new(SimulatedCoverage::seeded(seed)));
        }
        if config.cache_enabled {
            analyzer = analyzer.with_cache(AnalysisCache::new(
                config.cache_ttl(),
                config.cache_max_entries,
            ));
        }
        analyzer
    }

    pub fn with_coverage(mut self, coverage: Arc<dyn CoverageModel>) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn with_elevation_gate(mut self, gate: Arc<dyn ElevationGate>) -> Self {
        self.elevation = gate;
        self
    }

    pub fn with_cache(mut self, cache: AnalysisCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&AnalysisCache> {
        self.cache.as_ref()
    }

    /// Analyze one route. Never fails; branch failures are listed in
    /// `errors` of the returned analysis.
    pub async fn analyze(&self, route: Route, options: AnalyzeOptions) -> RouteAnalysis {
        if options.use_cache {
            if let Some(mut hit) = self
                .cache
                .as_ref()
                .and_then(|cache| cache.get(&route.route_key, options.enhanced))
            {
                debug!("Serving analysis for {} from cache", route.route_key);
                hit.cached = true;
                return hit;
            }
        }

        let started = Instant::now();
        let analyzed_at = Utc::now();
        let mut analysis =
            RouteAnalysis::empty(uuid::Uuid::new_v4().to_string(), route, analyzed_at);
        analysis.status = AnalysisStatus::Running;
        analysis.enhanced = options.enhanced;

        let waypoints: Arc<[Waypoint]> = analysis.route.waypoints.clone().into();
        let ctx = Arc::new(RouteContext::new(
            analysis.route.route_key.clone(),
            &waypoints,
            analyzed_at,
        ));

        let sharp_turns = run_detector("sharp_turns", {
            let (waypoints, ctx, rules) = (waypoints.clone(), ctx.clone(), self.rules.clone());
            move || detect_sharp_turns(&waypoints, &ctx, &rules)
        });
        let blind_spots = run_detector("blind_spots", {
            let (waypoints, ctx, rules) = (waypoints.clone(), ctx.clone(), self.rules.clone());
            let gate = self.elevation.clone();
            move || detect_blind_spots(&waypoints, &ctx, &rules, gate.as_ref())
        });
        let coverage = run_detector("network_coverages", {
            let (waypoints, ctx, rules) = (waypoints.clone(), ctx.clone(), self.rules.clone());
            let model = self.coverage.clone();
            move || sample_network_coverage(&waypoints, &ctx, &rules, model.as_ref())
        });
        let enrich = async {
            if options.enhanced {
                Some(enrichment::enrich(&self.providers, &self.limits, &waypoints, &ctx).await)
            } else {
                None
            }
        };

        let (sharp_turns, blind_spots, coverage, roads, enrichment) = tokio::join!(
            sharp_turns,
            blind_spots,
            coverage,
            self.road_conditions(&waypoints, &ctx),
            enrich,
        );

        let mut errors = Vec::new();
        analysis.sharp_turns = sharp_turns.unwrap_or_else(|note| push_note(&mut errors, note));
        analysis.blind_spots = blind_spots.unwrap_or_else(|note| push_note(&mut errors, note));
        analysis.network_coverages = coverage.unwrap_or_else(|note| push_note(&mut errors, note));
        let (road_conditions, road_note) = roads;
        errors.extend(road_note);
        analysis.road_conditions = road_conditions;
        analysis.accident_prone_areas = derive_accident_prone_areas(
            &analysis.sharp_turns,
            &analysis.road_conditions,
            &self.rules,
        );

        if let Some(enrichment) = enrichment {
            analysis.emergency_services = Some(enrichment.emergency_services);
            analysis.eco_zones = Some(enrichment.eco_zones);
            analysis.weather_conditions = Some(enrichment.weather);
            analysis.traffic_data = Some(enrichment.traffic);
            analysis.route.start_address = enrichment.start_address;
            analysis.route.end_address = enrichment.end_address;
            errors.extend(enrichment.errors);
        }

        analysis.errors = errors;
        analysis.status = AnalysisStatus::Complete;
        info!(
            "Analyzed route {} ({} waypoints): {} hazards, {} notes in {:?}",
            analysis.route.route_key,
            analysis.route.waypoints.len(),
            analysis.hazard_count(),
            analysis.errors.len(),
            started.elapsed()
        );

        if options.use_cache {
            if let Some(cache) = &self.cache {
                cache.insert(analysis.clone());
            }
        }
        analysis
    }

    /// Classify sampled waypoints from road-tag lookups. Individual failed
    /// lookups are skipped; a note is added only when every lookup failed.
    async fn road_conditions(
        &self,
        waypoints: &[Waypoint],
        ctx: &RouteContext,
    ) -> (Vec<RoadCondition>, Option<String>) {
        let indices = road_sample_indices(waypoints.len(), &self.rules);
        let radius_m = self.rules.road_lookup_radius_m;
        let outcome = sample_waypoints(
            "road_conditions",
            waypoints,
            &indices,
            self.limits.road_tags_timeout,
            |lat, lng| self.providers.road_tags.road_tags(lat, lng, radius_m),
        )
        .await;

        let note = (outcome.total > 0 && outcome.failed == outcome.total)
            .then(|| format!("road_conditions: all {} lookups failed", outcome.total));
        let records = outcome
            .found
            .iter()
            .filter_map(|(idx, tags)| road_condition_from_tags(*idx, &waypoints[*idx], ctx, tags))
            .collect();
        (records, note)
    }
}

async fn run_detector<T, F>(name: &'static str, job: F) -> Result<Vec<T>, String>
where
    T: Send + 'static,
    F: FnOnce() -> Vec<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job).await.map_err(|err| {
        warn!("Detector {} failed: {}", name, err);
        format!("{name}: detector failed")
    })
}

fn push_note<T>(errors: &mut Vec<String>, note: String) -> Vec<T> {
    errors.push(note);
    Vec::new()
}
