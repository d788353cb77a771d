//! Offline inspection and plain-text summaries.

use chrono::Utc;
use hazard_core::{
    derive_accident_prone_areas, detect_blind_spots, detect_sharp_turns, sample_network_coverage,
    AnalysisStatus, CoverageModel, GeometryOnlyGate, HazardRules, Route, RouteAnalysis,
    RouteContext,
};
use std::fmt::Write;

/// Run the detectors that need no network access. Road conditions and
/// enrichment stay empty, so accident-prone areas come from turns only.
pub fn inspect_offline(route: Route, rules: &HazardRules, coverage: &dyn CoverageModel) -> RouteAnalysis {
    let analyzed_at = Utc::now();
    let mut analysis = RouteAnalysis::empty("offline", route, analyzed_at);
    let waypoints = &analysis.route.waypoints;
    let ctx = RouteContext::new(analysis.route.route_key.clone(), waypoints, analyzed_at);

    let sharp_turns = detect_sharp_turns(waypoints, &ctx, rules);
    let blind_spots = detect_blind_spots(waypoints, &ctx, rules, &GeometryOnlyGate);
    let network_coverages = sample_network_coverage(waypoints, &ctx, rules, coverage);
    let accident_prone_areas = derive_accident_prone_areas(&sharp_turns, &[], rules);

    analysis.sharp_turns = sharp_turns;
    analysis.blind_spots = blind_spots;
    analysis.network_coverages = network_coverages;
    analysis.accident_prone_areas = accident_prone_areas;
    analysis.status = AnalysisStatus::Complete;
    analysis
}

pub fn summarize(analysis: &RouteAnalysis) -> String {
    let route = &analysis.route;
    let mut out = String::new();
    let _ = writeln!(out, "Route {} ({:?})", route.route_key, analysis.status);
    let _ = writeln!(
        out,
        "  {} waypoints, {:.2} km",
        route.waypoints.len(),
        route.total_distance_km
    );
    if let Some(start) = &route.start_address {
        let _ = writeln!(out, "  from: {start}");
    }
    if let Some(end) = &route.end_address {
        let _ = writeln!(out, "  to:   {end}");
    }

    let _ = writeln!(out, "  sharp turns:          {}", analysis.sharp_turns.len());
    let _ = writeln!(out, "  blind spots:          {}", analysis.blind_spots.len());
    let _ = writeln!(out, "  accident-prone areas: {}", analysis.accident_prone_areas.len());
    let _ = writeln!(out, "  road conditions:      {}", analysis.road_conditions.len());
    let dead_zones = analysis
        .network_coverages
        .iter()
        .filter(|c| c.is_dead_zone)
        .count();
    let _ = writeln!(
        out,
        "  coverage samples:     {} ({} dead zones)",
        analysis.network_coverages.len(),
        dead_zones
    );

    if analysis.enhanced {
        let count = |len: Option<usize>| len.map_or_else(|| "-".to_string(), |n| n.to_string());
        let _ = writeln!(out, "  emergency services:   {}", count(analysis.emergency_services.as_ref().map(Vec::len)));
        let _ = writeln!(out, "  eco zones:            {}", count(analysis.eco_zones.as_ref().map(Vec::len)));
        let _ = writeln!(out, "  weather samples:      {}", count(analysis.weather_conditions.as_ref().map(Vec::len)));
        let _ = writeln!(out, "  traffic samples:      {}", count(analysis.traffic_data.as_ref().map(Vec::len)));
    }

    for turn in &analysis.sharp_turns {
        let _ = writeln!(
            out,
            "  turn {:>5.1} deg {:?} at ({:.5}, {:.5}), km {:.2}, risk {}",
            turn.turn_angle_deg,
            turn.direction,
            turn.meta.location.lat,
            turn.meta.location.lng,
            turn.meta.distance_from_start_km,
            turn.meta.risk_score
        );
    }
    for note in &analysis.errors {
        let _ = writeln!(out, "  note: {note}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazard_core::{FixedCoverage, RouteMetadata, Waypoint};

    fn corner() -> Route {
        Route::build(
            RouteMetadata {
                file_name: Some("corner.json".into()),
                ..Default::default()
            },
            vec![
                Waypoint::new(12.50, 77.00),
                Waypoint::new(12.51, 77.00),
                Waypoint::new(12.52, 77.00),
                Waypoint::new(12.52, 77.01),
                Waypoint::new(12.52, 77.02),
            ],
        )
        .unwrap()
    }

    #[test]
    fn offline_inspection_finds_the_corner() {
        let analysis = inspect_offline(corner(), &HazardRules::default(), &FixedCoverage(0));
        assert_eq!(analysis.status, AnalysisStatus::Complete);
        assert_eq!(analysis.sharp_turns.len(), 1);
        assert_eq!(analysis.accident_prone_areas.len(), 1);
        assert!(analysis.road_conditions.is_empty());
        assert!(analysis.network_coverages.iter().all(|c| c.is_dead_zone));
    }

    #[test]
    fn summary_lists_counts_and_turns() {
        let analysis = inspect_offline(corner(), &HazardRules::default(), &FixedCoverage(3));
        let text = summarize(&analysis);
        assert!(text.starts_with("Route corner (Complete)"));
        assert!(text.contains("sharp turns:          1"));
        assert!(text.contains("(0 dead zones)"));
        assert!(!text.contains("weather samples"));
    }
}
