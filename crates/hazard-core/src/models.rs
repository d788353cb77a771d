//! Core data models for route hazard analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::spatial::{bounding_box, cumulative_distance_km};

/// A single GPS sample along a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    #[serde(default = "missing_coordinate", deserialize_with = "coordinate")]
    pub lat: f64,
    #[serde(default = "missing_coordinate", deserialize_with = "coordinate")]
    pub lng: f64,
    /// Step identifier from the source file, if it had one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

// Absent or null coordinates parse as NaN and are dropped by
// `sanitize_waypoints` instead of failing the whole route.
fn missing_coordinate() -> f64 {
    f64::NAN
}

fn coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl Waypoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            sequence_id: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_sequence(mut self, sequence_id: i64) -> Self {
        self.sequence_id = Some(sequence_id);
        self
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }

    /// Usable for analysis: finite, non-zero and inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat != 0.0
            && self.lng != 0.0
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Drop unusable points and restore step order.
///
/// Ordering by `sequence_id` only applies when every remaining point carries
/// one; otherwise the file order is kept as the travel direction.
pub fn sanitize_waypoints(waypoints: Vec<Waypoint>) -> Vec<Waypoint> {
    let mut points: Vec<Waypoint> = waypoints.into_iter().filter(Waypoint::is_valid).collect();
    if !points.is_empty() && points.iter().all(|p| p.sequence_id.is_some()) {
        points.sort_by_key(|p| p.sequence_id);
    }
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.north + self.south) / 2.0,
            lng: (self.east + self.west) / 2.0,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route key requires depot and consumer codes or a file name")]
    MissingKey,
}

/// Descriptive data that arrives with a route file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMetadata {
    #[serde(default)]
    pub depot_code: Option<String>,
    #[serde(default)]
    pub consumer_code: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl RouteMetadata {
    /// Stable route identifier: `{depot}-{consumer}`, else the file stem.
    pub fn route_key(&self) -> Result<String, RouteError> {
        let depot = non_blank(self.depot_code.as_deref());
        let consumer = non_blank(self.consumer_code.as_deref());
        if let (Some(depot), Some(consumer)) = (depot, consumer) {
            return Ok(format!("{depot}-{consumer}"));
        }

        let file_name = non_blank(self.file_name.as_deref()).ok_or(RouteError::MissingKey)?;
        let stem = std::path::Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(RouteError::MissingKey)?;
        Ok(stem.to_string())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub route_key: String,
    #[serde(flatten)]
    pub metadata: RouteMetadata,
    pub waypoints: Vec<Waypoint>,
    pub total_distance_km: f64,
    pub bounds: BoundingBox,
    #[serde(default)]
    pub start_address: Option<String>,
    #[serde(default)]
    pub end_address: Option<String>,
}

impl Route {
    /// Build a route from already-parsed waypoints.
    pub fn build(metadata: RouteMetadata, waypoints: Vec<Waypoint>) -> Result<Self, RouteError> {
        let route_key = metadata.route_key()?;
        let waypoints = sanitize_waypoints(waypoints);
        let total_distance_km = cumulative_distance_km(&waypoints);
        let bounds = bounding_box(&waypoints).unwrap_or_default();
        Ok(Self {
            route_key,
            metadata,
            waypoints,
            total_distance_km,
            bounds,
            start_address: None,
            end_address: None,
        })
    }
}

/// Fields shared by every hazard record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardMeta {
    pub route_key: String,
    pub location: GeoPoint,
    /// 0-10
    pub risk_score: u8,
    pub distance_from_start_km: f64,
    pub created_at: DateTime<Utc>,
}

/// Storage collections, one per hazard kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardCollection {
    SharpTurns,
    BlindSpots,
    AccidentProneAreas,
    RoadConditions,
    NetworkCoverages,
    EmergencyServices,
    EcoZones,
    TrafficData,
    WeatherConditions,
}

impl HazardCollection {
    pub const ALL: [HazardCollection; 9] = [
        Self::SharpTurns,
        Self::BlindSpots,
        Self::AccidentProneAreas,
        Self::RoadConditions,
        Self::NetworkCoverages,
        Self::EmergencyServices,
        Self::EcoZones,
        Self::TrafficData,
        Self::WeatherConditions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SharpTurns => "sharp_turns",
            Self::BlindSpots => "blind_spots",
            Self::AccidentProneAreas => "accident_prone_areas",
            Self::RoadConditions => "road_conditions",
            Self::NetworkCoverages => "network_coverages",
            Self::EmergencyServices => "emergency_services",
            Self::EcoZones => "eco_zones",
            Self::TrafficData => "traffic_data",
            Self::WeatherConditions => "weather_conditions",
        }
    }
}

impl fmt::Display for HazardCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HazardCollection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("unknown hazard collection '{s}'"))
    }
}

/// Implemented by every record that can be stored in a hazard collection.
pub trait HazardRecord {
    const COLLECTION: HazardCollection;

    fn meta(&self) -> &HazardMeta;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Poor,
    Moderate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharpTurn {
    #[serde(flatten)]
    pub meta: HazardMeta,
    pub turn_angle_deg: f64,
    pub direction: TurnDirection,
    pub recommended_speed_kmh: u32,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotType {
    Curve,
    SharpCurve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlindSpot {
    #[serde(flatten)]
    pub meta: HazardMeta,
    pub spot_type: SpotType,
    pub bearing_change_deg: f64,
    pub visibility_distance_m: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceQuality {
    Good,
    Moderate,
    Poor,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadCondition {
    #[serde(flatten)]
    pub meta: HazardMeta,
    pub surface_quality: SurfaceQuality,
    pub surface: Option<String>,
    pub road_type: String,
    pub lanes: u32,
    pub max_speed_kmh: u32,
    pub under_construction: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationRisk {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCoverage {
    #[serde(flatten)]
    pub meta: HazardMeta,
    /// 0 (none) to 4 (full)
    pub signal_strength: u8,
    pub is_dead_zone: bool,
    pub communication_risk: CommunicationRisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    Rollover,
    Skidding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentProneArea {
    #[serde(flatten)]
    pub meta: HazardMeta,
    pub area_type: AreaType,
    pub severity_level: SeverityLevel,
    pub contributing_factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyService {
    #[serde(flatten)]
    pub meta: HazardMeta,
    pub service_type: String,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcoZone {
    #[serde(flatten)]
    pub meta: HazardMeta,
    pub zone_type: String,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Free,
    Moderate,
    Heavy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSample {
    #[serde(flatten)]
    pub meta: HazardMeta,
    pub current_speed_kmh: f64,
    pub free_flow_speed_kmh: f64,
    pub confidence: f64,
    pub congestion_level: CongestionLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSample {
    #[serde(flatten)]
    pub meta: HazardMeta,
    pub temperature_c: f64,
    pub condition: String,
    pub humidity_percent: f64,
    pub wind_speed_kmh: f64,
}

impl HazardRecord for SharpTurn {
    const COLLECTION: HazardCollection = HazardCollection::SharpTurns;
    fn meta(&self) -> &HazardMeta {
        &self.meta
    }
}

impl HazardRecord for BlindSpot {
    const COLLECTION: HazardCollection = HazardCollection::BlindSpots;
    fn meta(&self) -> &HazardMeta {
        &self.meta
    }
}

impl HazardRecord for AccidentProneArea {
    const COLLECTION: HazardCollection = HazardCollection::AccidentProneAreas;
    fn meta(&self) -> &HazardMeta {
        &self.meta
    }
}

impl HazardRecord for RoadCondition {
    const COLLECTION: HazardCollection = HazardCollection::RoadConditions;
    fn meta(&self) -> &HazardMeta {
        &self.meta
    }
}

impl HazardRecord for NetworkCoverage {
    const COLLECTION: HazardCollection = HazardCollection::NetworkCoverages;
    fn meta(&self) -> &HazardMeta {
        &self.meta
    }
}

impl HazardRecord for EmergencyService {
    const COLLECTION: HazardCollection = HazardCollection::EmergencyServices;
    fn meta(&self) -> &HazardMeta {
        &self.meta
    }
}

impl HazardRecord for EcoZone {
    const COLLECTION: HazardCollection = HazardCollection::EcoZones;
    fn meta(&self) -> &HazardMeta {
        &self.meta
    }
}

impl HazardRecord for TrafficSample {
    const COLLECTION: HazardCollection = HazardCollection::TrafficData;
    fn meta(&self) -> &HazardMeta {
        &self.meta
    }
}

impl HazardRecord for WeatherSample {
    const COLLECTION: HazardCollection = HazardCollection::WeatherConditions;
    fn meta(&self) -> &HazardMeta {
        &self.meta
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    #[default]
    Idle,
    Running,
    Complete,
    Error,
}

/// Result document for one route analysis.
///
/// Enrichment collections are `None` unless the caller granted the enhanced
/// permission for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAnalysis {
    pub run_id: String,
    pub status: AnalysisStatus,
    pub analyzed_at: DateTime<Utc>,
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub enhanced: bool,
    pub route: Route,
    pub sharp_turns: Vec<SharpTurn>,
    pub blind_spots: Vec<BlindSpot>,
    pub accident_prone_areas: Vec<AccidentProneArea>,
    pub road_conditions: Vec<RoadCondition>,
    pub network_coverages: Vec<NetworkCoverage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_services: Option<Vec<EmergencyService>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eco_zones: Option<Vec<EcoZone>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_data: Option<Vec<TrafficSample>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_conditions: Option<Vec<WeatherSample>>,
    pub errors: Vec<String>,
}

impl RouteAnalysis {
    /// An analysis with no hazards yet, for `route`.
    pub fn empty(run_id: impl Into<String>, route: Route, analyzed_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            status: AnalysisStatus::Idle,
            analyzed_at,
            cached: false,
            enhanced: false,
            route,
            sharp_turns: Vec::new(),
            blind_spots: Vec::new(),
            accident_prone_areas: Vec::new(),
            road_conditions: Vec::new(),
            network_coverages: Vec::new(),
            emergency_services: None,
            eco_zones: None,
            traffic_data: None,
            weather_conditions: None,
            errors: Vec::new(),
        }
    }

    pub fn hazard_count(&self) -> usize {
        self.sharp_turns.len()
            + self.blind_spots.len()
            + self.accident_prone_areas.len()
            + self.road_conditions.len()
            + self.network_coverages.len()
            + self.emergency_services.as_ref().map_or(0, Vec::len)
            + self.eco_zones.as_ref().map_or(0, Vec::len)
            + self.traffic_data.as_ref().map_or(0, Vec::len)
            + self.weather_conditions.as_ref().map_or(0, Vec::len)
    }
}
