//! Hazard detectors.
//!
//! Each detector reads the same immutable waypoint sequence and returns its
//! own record list; none of them keeps state between calls.

pub mod blind_spot;
pub mod network_coverage;
pub mod road_condition;
pub mod sharp_turn;

use chrono::{DateTime, Utc};

use crate::models::{GeoPoint, HazardMeta, Waypoint};
use crate::spatial::distances_from_start_km;

/// Per-route values every detector stamps onto its records.
#[derive(Debug, Clone)]
pub struct RouteContext {
    pub route_key: String,
    pub created_at: DateTime<Utc>,
    distances_km: Vec<f64>,
}

impl RouteContext {
    pub fn new(route_key: impl Into<String>, waypoints: &[Waypoint], created_at: DateTime<Utc>) -> Self {
        Self {
            route_key: route_key.into(),
            created_at,
            distances_km: distances_from_start_km(waypoints),
        }
    }

    /// Path distance from the first waypoint to waypoint `index`.
    pub fn distance_at(&self, index: usize) -> f64 {
        self.distances_km.get(index).copied().unwrap_or(0.0)
    }

    /// Index of the waypoint closest (straight-line) to `lat/lng`.
    pub fn nearest_index(&self, waypoints: &[Waypoint], lat: f64, lng: f64) -> Option<usize> {
        waypoints
            .iter()
            .enumerate()
            .map(|(idx, p)| (idx, crate::spatial::distance_km(p.lat, p.lng, lat, lng)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, _)| idx)
    }

    pub fn meta(&self, index: usize, waypoint: &Waypoint, risk_score: u8) -> HazardMeta {
        HazardMeta {
            route_key: self.route_key.clone(),
            location: waypoint.position(),
            risk_score: risk_score.min(10),
            distance_from_start_km: self.distance_at(index),
            created_at: self.created_at,
        }
    }

    /// Metadata for an off-route location (a POI), measured along the path to
    /// its nearest waypoint.
    pub fn meta_near(&self, waypoints: &[Waypoint], location: GeoPoint, risk_score: u8) -> HazardMeta {
        let distance_from_start_km = self
            .nearest_index(waypoints, location.lat, location.lng)
            .map(|idx| self.distance_at(idx))
            .unwrap_or(0.0);
        HazardMeta {
            route_key: self.route_key.clone(),
            location,
            risk_score: risk_score.min(10),
            distance_from_start_km,
            created_at: self.created_at,
        }
    }
}
