//! Route hazard analysis core: geometry, detectors and risk aggregation.
//!
//! Everything here is synchronous and free of I/O. Remote lookups (road tags,
//! points of interest, weather) are done by callers, which hand the results
//! to the functions in [`detectors`] and [`risk`].

pub mod detectors;
pub mod models;
pub mod risk;
pub mod rules;
pub mod spatial;

pub use detectors::{
    blind_spot::{detect_blind_spots, ElevationGate, GeometryOnlyGate},
    network_coverage::{sample_network_coverage, CoverageModel, FixedCoverage, SimulatedCoverage},
    road_condition::{classify_road_tags, road_condition_from_tags, road_sample_indices, RoadTags},
    sharp_turn::detect_sharp_turns,
    RouteContext,
};
pub use models::{
    AccidentProneArea, AnalysisStatus, BlindSpot, BoundingBox, EcoZone, EmergencyService,
    GeoPoint, HazardCollection, HazardMeta, HazardRecord, NetworkCoverage, RoadCondition, Route,
    RouteAnalysis, RouteError, RouteMetadata, SharpTurn, TrafficSample, Waypoint, WeatherSample,
};
pub use models::sanitize_waypoints;
pub use risk::{classify_congestion, derive_accident_prone_areas, weather_risk_score};
pub use rules::HazardRules;
pub use spatial::{bearing_deg, cumulative_distance_km, distance_km, expand_bounds_km};
