//! End-to-end analyzer behavior against in-process providers.

use futures::future::BoxFuture;
use hazard_core::{
    AnalysisStatus, BoundingBox, ElevationGate, FixedCoverage, HazardRules, RoadTags, Route,
    RouteAnalysis, RouteMetadata, Waypoint,
};
use hazard_core::models::TurnDirection;
use hazard_server::analysis::enrichment::EnrichmentLimits;
use hazard_server::analysis::{AnalyzeOptions, RouteAnalyzer};
use hazard_server::cache::AnalysisCache;
use hazard_server::providers::{
    Geocoder, PoiCategory, PoiProvider, PointOfInterest, ProviderError, ProviderResult, Providers,
    RoadTagProvider, TrafficFlow, TrafficProvider, WeatherProvider, WeatherReading,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted provider set that counts every call it receives.
#[derive(Default)]
struct Scripted {
    calls: AtomicUsize,
    fail_roads: bool,
    /// Weather lookups at or above this latitude hang past any timeout
    slow_weather_from_lat: Option<f64>,
}

impl Scripted {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl RoadTagProvider for Scripted {
    fn road_tags(&self, _lat: f64, _lng: f64, _radius_m: f64) -> BoxFuture<'_, ProviderResult<Option<RoadTags>>> {
        self.tick();
        Box::pin(async move {
            if self.fail_roads {
                return Err(ProviderError::Http(502));
            }
            let mut tags = RoadTags::new();
            tags.insert("highway".into(), "primary".into());
            tags.insert("surface".into(), "asphalt".into());
            Ok(Some(tags))
        })
    }
}

impl PoiProvider for Scripted {
    fn points_of_interest(
        &self,
        _bounds: BoundingBox,
        _categories: &'static [PoiCategory],
    ) -> BoxFuture<'_, ProviderResult<Vec<PointOfInterest>>> {
        self.tick();
        Box::pin(async { Ok(Vec::new()) })
    }
}

impl Geocoder for Scripted {
    fn reverse_geocode(&self, _lat: f64, _lng: f64) -> BoxFuture<'_, ProviderResult<Option<String>>> {
        self.tick();
        Box::pin(async { Ok(None) })
    }
}

impl WeatherProvider for Scripted {
    fn current_weather(&self, lat: f64, _lng: f64) -> BoxFuture<'_, ProviderResult<Option<WeatherReading>>> {
        self.tick();
        let slow = self.slow_weather_from_lat.is_some_and(|from| lat >= from);
        Box::pin(async move {
            if slow {
                tokio::time::sleep(Duration::from_secs(120)).await;
            }
            Ok(Some(WeatherReading {
                temperature_c: 18.0,
                condition: "Moderate rain".into(),
                humidity_percent: 88.0,
                wind_speed_kmh: 45.0,
            }))
        })
    }
}

impl TrafficProvider for Scripted {
    fn traffic_flow(&self, _lat: f64, _lng: f64) -> BoxFuture<'_, ProviderResult<Option<TrafficFlow>>> {
        self.tick();
        Box::pin(async {
            Ok(Some(TrafficFlow {
                current_speed_kmh: 20.0,
                free_flow_speed_kmh: 60.0,
                confidence: 0.9,
            }))
        })
    }
}

fn analyzer_for(scripted: Arc<Scripted>) -> RouteAnalyzer {
    let providers = Providers {
        road_tags: scripted.clone(),
        pois: scripted.clone(),
        geocoder: scripted.clone(),
        weather: scripted.clone(),
        traffic: scripted,
    };
    RouteAnalyzer::new(providers, HazardRules::default(), EnrichmentLimits::default())
        .with_coverage(Arc::new(FixedCoverage(1)))
}

/// Straight five-point route heading north.
fn straight_route(key: &str) -> Route {
    let metadata = RouteMetadata {
        file_name: Some(format!("{key}.csv")),
        ..Default::default()
    };
    let waypoints = (0..5)
        .map(|i| Waypoint::new(20.0 + i as f64 * 0.01, 78.0))
        .collect();
    Route::build(metadata, waypoints).unwrap()
}

/// North, a right turn east, then a right turn back south.
fn hairpin_route(key: &str) -> Route {
    let metadata = RouteMetadata {
        file_name: Some(format!("{key}.csv")),
        ..Default::default()
    };
    let waypoints = vec![
        Waypoint::new(20.00, 78.00),
        Waypoint::new(20.01, 78.00),
        Waypoint::new(20.02, 78.00),
        Waypoint::new(20.02, 78.01),
        Waypoint::new(20.02, 78.02),
        Waypoint::new(20.01, 78.02),
        Waypoint::new(20.00, 78.02),
    ];
    Route::build(metadata, waypoints).unwrap()
}

const PLAIN: AnalyzeOptions = AnalyzeOptions {
    enhanced: false,
    use_cache: false,
};

const ENHANCED: AnalyzeOptions = AnalyzeOptions {
    enhanced: true,
    use_cache: false,
};

#[tokio::test(start_paused = true)]
async fn slow_weather_samples_become_one_note() {
    let scripted = Arc::new(Scripted {
        slow_weather_from_lat: Some(20.025),
        ..Default::default()
    });
    let analyzer = analyzer_for(scripted);

    let analysis = analyzer.analyze(straight_route("rainy"), ENHANCED).await;

    assert_eq!(analysis.status, AnalysisStatus::Complete);
    let weather = analysis.weather_conditions.as_ref().unwrap();
    assert_eq!(weather.len(), 3);
    // rain scores 5, wind above 40 km/h scores 6
    assert!(weather.iter().all(|w| w.meta.risk_score == 6));
    assert_eq!(analysis.errors, vec!["weather: 2 of 5 samples failed".to_string()]);

    let traffic = analysis.traffic_data.as_ref().unwrap();
    assert_eq!(traffic.len(), 5);
    assert!(traffic.iter().all(|t| t.meta.risk_score == 7));
}

#[tokio::test]
async fn plain_analysis_never_calls_enrichment_providers() {
    let scripted = Arc::new(Scripted::default());
    let analyzer = analyzer_for(scripted.clone());

    let analysis = analyzer.analyze(straight_route("plain"), PLAIN).await;
    // road tag lookups only, one per waypoint
    assert_eq!(scripted.calls(), 5);
    assert!(analysis.emergency_services.is_none());
    assert!(analysis.eco_zones.is_none());
    assert!(analysis.weather_conditions.is_none());
    assert!(analysis.traffic_data.is_none());
    assert!(analysis.route.start_address.is_none());

    let before = scripted.calls();
    let analysis = analyzer.analyze(straight_route("plain"), ENHANCED).await;
    // 2 POI queries, 5 weather, 5 traffic, 2 geocodes on top of the road lookups
    assert_eq!(scripted.calls() - before, 5 + 2 + 5 + 5 + 2);
    assert_eq!(analysis.emergency_services.as_deref().map(<[_]>::len), Some(0));
    assert!(analysis.errors.is_empty());
}

#[tokio::test]
async fn uncached_reruns_produce_the_same_hazards() {
    let analyzer = analyzer_for(Arc::new(Scripted::default()));
    let first = analyzer.analyze(hairpin_route("again"), PLAIN).await;
    let second = analyzer.analyze(hairpin_route("again"), PLAIN).await;

    assert_ne!(first.run_id, second.run_id);
    assert!(!second.cached);

    let turns = |analysis: &RouteAnalysis| {
        analysis
            .sharp_turns
            .iter()
            .map(|t| (t.meta.location, t.turn_angle_deg, t.direction, t.meta.risk_score))
            .collect::<Vec<_>>()
    };
    let spots = |analysis: &RouteAnalysis| {
        analysis
            .blind_spots
            .iter()
            .map(|b| (b.meta.location, b.bearing_change_deg, b.spot_type, b.meta.risk_score))
            .collect::<Vec<_>>()
    };
    assert_eq!(first.sharp_turns.len(), 2);
    assert!(first.sharp_turns.iter().all(|t| t.direction == TurnDirection::Right));
    assert_eq!(turns(&first), turns(&second));
    assert_eq!(first.blind_spots.len(), 3);
    assert_eq!(spots(&first), spots(&second));
    assert_eq!(
        first.accident_prone_areas.len(),
        second.accident_prone_areas.len()
    );
}

/// Fails every candidate check, as a broken terrain source would.
struct PanickingGate;

impl ElevationGate for PanickingGate {
    fn confirms(&self, _window: &[Waypoint]) -> bool {
        panic!("terrain source unavailable");
    }
}

#[tokio::test]
async fn failed_detector_leaves_other_branches_intact() {
    let analyzer =
        analyzer_for(Arc::new(Scripted::default())).with_elevation_gate(Arc::new(PanickingGate));
    let analysis = analyzer.analyze(hairpin_route("crest"), PLAIN).await;

    assert_eq!(analysis.status, AnalysisStatus::Complete);
    assert_eq!(analysis.errors, vec!["blind_spots: detector failed".to_string()]);
    assert!(analysis.blind_spots.is_empty());
    assert_eq!(analysis.sharp_turns.len(), 2);
    assert_eq!(analysis.road_conditions.len(), 7);
    assert_eq!(analysis.network_coverages.len(), 7);
}

#[tokio::test]
async fn cache_serves_matching_enhanced_flag_only() {
    let scripted = Arc::new(Scripted::default());
    let analyzer = analyzer_for(scripted.clone())
        .with_cache(AnalysisCache::new(Duration::from_secs(60), 8));
    let cached = AnalyzeOptions {
        enhanced: false,
        use_cache: true,
    };

    let first = analyzer.analyze(straight_route("hot"), cached).await;
    let calls = scripted.calls();
    let second = analyzer.analyze(straight_route("hot"), cached).await;
    assert!(second.cached);
    assert_eq!(second.run_id, first.run_id);
    assert_eq!(scripted.calls(), calls);

    let upgraded = analyzer
        .analyze(
            straight_route("hot"),
            AnalyzeOptions {
                enhanced: true,
                use_cache: true,
            },
        )
        .await;
    assert!(!upgraded.cached);
    assert!(upgraded.weather_conditions.is_some());
}

#[tokio::test]
async fn total_road_lookup_failure_is_noted() {
    let analyzer = analyzer_for(Arc::new(Scripted {
        fail_roads: true,
        ..Default::default()
    }));
    let analysis = analyzer.analyze(straight_route("closed"), PLAIN).await;

    assert_eq!(analysis.status, AnalysisStatus::Complete);
    assert!(analysis.road_conditions.is_empty());
    assert_eq!(analysis.errors, vec!["road_conditions: all 5 lookups failed".to_string()]);
    assert_eq!(analysis.network_coverages.len(), 5);
}

#[tokio::test]
async fn empty_route_completes_with_no_records() {
    let scripted = Arc::new(Scripted::default());
    let analyzer = analyzer_for(scripted.clone());
    let route = Route::build(
        RouteMetadata {
            depot_code: Some("D9".into()),
            consumer_code: Some("C9".into()),
            ..Default::default()
        },
        Vec::new(),
    )
    .unwrap();

    let analysis = analyzer.analyze(route, ENHANCED).await;
    assert_eq!(analysis.status, AnalysisStatus::Complete);
    assert_eq!(analysis.hazard_count(), 0);
    assert!(analysis.errors.is_empty());
    assert_eq!(scripted.calls(), 0);
}
