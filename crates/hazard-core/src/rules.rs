//! Detector thresholds and sampling targets.

use serde::{Deserialize, Serialize};

/// Configuration for hazard detection rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardRules {
    /// Turn angle (degrees) above which an interior waypoint is a sharp turn
    pub sharp_turn_threshold_deg: f64,
    /// Bearing change (degrees) across a 2-point window that marks a curve
    pub blind_spot_threshold_deg: f64,
    /// Bearing change above which a curve is a sharp curve
    pub sharp_curve_threshold_deg: f64,
    /// Road-condition lookups aim for roughly this many samples per route
    pub road_sample_target: usize,
    /// Network-coverage samples per route
    pub coverage_sample_target: usize,
    /// Minimum source risk score that produces an accident-prone area.
    /// Values below 7 are treated as 7.
    pub accident_risk_threshold: u8,
    /// Radius for road attribute lookups around a sample, in meters
    pub road_lookup_radius_m: f64,
}

impl Default for HazardRules {
    fn default() -> Self {
        Self {
            sharp_turn_threshold_deg: 60.0,
            blind_spot_threshold_deg: 30.0,
            sharp_curve_threshold_deg: 60.0,
            road_sample_target: 20,
            coverage_sample_target: 15,
            accident_risk_threshold: 7,
            road_lookup_radius_m: 50.0,
        }
    }
}

/// Indices visited when sampling `len` points at stride `max(1, len / target)`.
pub fn stride_indices(len: usize, target: usize) -> impl Iterator<Item = usize> {
    let stride = (len / target.max(1)).max(1);
    (0..len).step_by(stride)
}
