//! Sharp-turn detection from consecutive bearings.

use crate::detectors::RouteContext;
use crate::models::{SharpTurn, TurnDirection, Visibility, Waypoint};
use crate::rules::HazardRules;
use crate::spatial::{turn_angle_deg, turn_delta_deg, waypoint_bearing_deg};

/// Risk score for a turn angle: 9 above 90°, 7 above 75°, otherwise 5.
pub fn turn_risk_score(angle_deg: f64) -> u8 {
    if angle_deg > 90.0 {
        9
    } else if angle_deg > 75.0 {
        7
    } else {
        5
    }
}

pub fn recommended_speed_kmh(angle_deg: f64) -> u32 {
    if angle_deg > 90.0 {
        20
    } else {
        30
    }
}

/// Scan interior waypoints for turns sharper than the configured threshold.
pub fn detect_sharp_turns(
    waypoints: &[Waypoint],
    ctx: &RouteContext,
    rules: &HazardRules,
) -> Vec<SharpTurn> {
    if waypoints.len() < 3 {
        return Vec::new();
    }

    let mut turns = Vec::new();
    for i in 1..waypoints.len() - 1 {
        let incoming = waypoint_bearing_deg(&waypoints[i - 1], &waypoints[i]);
        let outgoing = waypoint_bearing_deg(&waypoints[i], &waypoints[i + 1]);
        let angle = turn_angle_deg(incoming, outgoing);
        if angle <= rules.sharp_turn_threshold_deg {
            continue;
        }

        let direction = if turn_delta_deg(incoming, outgoing) > 0.0 {
            TurnDirection::Right
        } else {
            TurnDirection::Left
        };
        let visibility = if angle > 90.0 {
            Visibility::Poor
        } else {
            Visibility::Moderate
        };

        turns.push(SharpTurn {
            meta: ctx.meta(i, &waypoints[i], turn_risk_score(angle)),
            turn_angle_deg: angle,
            direction,
            recommended_speed_kmh: recommended_speed_kmh(angle),
            visibility,
        });
    }
    turns
}
