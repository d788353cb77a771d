//! Blind-spot detection over a two-point bearing window.
//!
//! Terrain-occluded crests need elevation data that is not wired in yet, so
//! the elevation check sits behind [`ElevationGate`]. The default gate
//! confirms every geometric candidate.

use crate::detectors::RouteContext;
use crate::models::{BlindSpot, SpotType, Waypoint};
use crate::rules::HazardRules;
use crate::spatial::{turn_angle_deg, waypoint_bearing_deg};

/// Secondary check applied to each geometric blind-spot candidate.
pub trait ElevationGate: Send + Sync {
    /// `window` holds the five waypoints centered on the candidate.
    fn confirms(&self, window: &[Waypoint]) -> bool;
}

/// Accepts every candidate; detection relies on geometry alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryOnlyGate;

impl ElevationGate for GeometryOnlyGate {
    fn confirms(&self, _window: &[Waypoint]) -> bool {
        true
    }
}

pub fn blind_spot_profile(spot_type: SpotType) -> (u8, u32) {
    match spot_type {
        SpotType::SharpCurve => (8, 50),
        SpotType::Curve => (6, 100),
    }
}

pub fn detect_blind_spots(
    waypoints: &[Waypoint],
    ctx: &RouteContext,
    rules: &HazardRules,
    gate: &dyn ElevationGate,
) -> Vec<BlindSpot> {
    if waypoints.len() < 5 {
        return Vec::new();
    }

    let mut spots = Vec::new();
    for i in 2..waypoints.len() - 2 {
        let before = waypoint_bearing_deg(&waypoints[i - 2], &waypoints[i]);
        let after = waypoint_bearing_deg(&waypoints[i], &waypoints[i + 2]);
        let change = turn_angle_deg(before, after);
        if change <= rules.blind_spot_threshold_deg {
            continue;
        }
        if !gate.confirms(&waypoints[i - 2..=i + 2]) {
            continue;
        }

        let spot_type = if change > rules.sharp_curve_threshold_deg {
            SpotType::SharpCurve
        } else {
            SpotType::Curve
        };
        let (risk, visibility_distance_m) = blind_spot_profile(spot_type);
        spots.push(BlindSpot {
            meta: ctx.meta(i, &waypoints[i], risk),
            spot_type,
            bearing_change_deg: change,
            visibility_distance_m,
        });
    }
    spots
}
