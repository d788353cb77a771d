//! Road surface classification from map tags.
//!
//! The lookups themselves are remote calls made by the caller; this module
//! chooses which waypoints to sample and turns returned tags into records.

use std::collections::HashMap;

use crate::detectors::RouteContext;
use crate::models::{RoadCondition, SurfaceQuality, Waypoint};
use crate::rules::{stride_indices, HazardRules};

/// Key/value attributes of the road nearest a sample point.
pub type RoadTags = HashMap<String, String>;

const DEFAULT_LANES: u32 = 2;
const DEFAULT_MAX_SPEED_KMH: u32 = 50;
const KMH_PER_MPH: f64 = 1.609_344;

/// Waypoint indices to look up, at stride `max(1, n / road_sample_target)`.
pub fn road_sample_indices(len: usize, rules: &HazardRules) -> Vec<usize> {
    stride_indices(len, rules.road_sample_target).collect()
}

fn is_under_construction(tags: &RoadTags) -> bool {
    tags.contains_key("construction")
        || tags.get("highway").is_some_and(|v| v == "construction")
}

/// Surface quality and risk score for a tag set.
pub fn classify_road_tags(tags: &RoadTags) -> (SurfaceQuality, u8) {
    if is_under_construction(tags) {
        return (SurfaceQuality::Critical, 8);
    }
    match tags.get("surface").map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("unpaved" | "dirt" | "gravel") => (SurfaceQuality::Poor, 7),
        Some("compacted" | "fine_gravel") => (SurfaceQuality::Moderate, 5),
        _ => (SurfaceQuality::Good, 3),
    }
}

/// Parse an OSM `maxspeed` value ("50", "30 mph", "80 km/h") into km/h.
pub fn parse_max_speed_kmh(value: &str) -> Option<u32> {
    let value = value.trim().to_ascii_lowercase();
    let numeric: String = value
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let speed: f64 = numeric.parse().ok()?;
    if !speed.is_finite() || speed <= 0.0 {
        return None;
    }
    let kmh = if value.contains("mph") {
        speed * KMH_PER_MPH
    } else {
        speed
    };
    Some(kmh.round() as u32)
}

/// Build a record for sample `index` from the tags returned for it.
///
/// Returns `None` for an empty tag set, which callers treat like a failed
/// lookup.
pub fn road_condition_from_tags(
    index: usize,
    waypoint: &Waypoint,
    ctx: &RouteContext,
    tags: &RoadTags,
) -> Option<RoadCondition> {
    if tags.is_empty() {
        return None;
    }
    let (surface_quality, risk) = classify_road_tags(tags);
    let lanes = tags
        .get("lanes")
        .and_then(|v| v.split(';').next())
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&l| l > 0)
        .unwrap_or(DEFAULT_LANES);
    let max_speed_kmh = tags
        .get("maxspeed")
        .and_then(|v| parse_max_speed_kmh(v))
        .unwrap_or(DEFAULT_MAX_SPEED_KMH);

    Some(RoadCondition {
        meta: ctx.meta(index, waypoint, risk),
        surface_quality,
        surface: tags.get("surface").cloned(),
        road_type: tags
            .get("highway")
            .cloned()
            .unwrap_or_else(|| "unknown".to_string()),
        lanes,
        max_speed_kmh,
        under_construction: is_under_construction(tags),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tags(pairs: &[(&str, &str)]) -> RoadTags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn surface_mapping() {
        assert_eq!(classify_road_tags(&tags(&[("surface", "gravel")])), (SurfaceQuality::Poor, 7));
        assert_eq!(classify_road_tags(&tags(&[("surface", "Dirt")])), (SurfaceQuality::Poor, 7));
        assert_eq!(
            classify_road_tags(&tags(&[("surface", "fine_gravel")])),
            (SurfaceQuality::Moderate, 5)
        );
        assert_eq!(classify_road_tags(&tags(&[("surface", "asphalt")])), (SurfaceQuality::Good, 3));
        assert_eq!(classify_road_tags(&tags(&[("highway", "primary")])), (SurfaceQuality::Good, 3));
    }

    #[test]
    fn construction_overrides_surface() {
        let unpaved_works = tags(&[("surface", "unpaved"), ("construction", "minor")]);
        assert_eq!(classify_road_tags(&unpaved_works), (SurfaceQuality::Critical, 8));
        let highway_works = tags(&[("highway", "construction")]);
        assert_eq!(classify_road_tags(&highway_works), (SurfaceQuality::Critical, 8));
    }

    #[test]
    fn record_reads_lanes_and_speed() {
        let point = Waypoint::new(12.0, 77.0);
        let ctx = RouteContext::new("R", std::slice::from_ref(&point), Utc::now());
        let record = road_condition_from_tags(
            0,
            &point,
            &ctx,
            &tags(&[("highway", "secondary"), ("lanes", "4"), ("maxspeed", "30 mph")]),
        )
        .unwrap();
        assert_eq!(record.road_type, "secondary");
        assert_eq!(record.lanes, 4);
        assert_eq!(record.max_speed_kmh, 48);
        assert!(!record.under_construction);
        assert_eq!(record.meta.risk_score, 3);

        let defaults =
            road_condition_from_tags(0, &point, &ctx, &tags(&[("surface", "dirt")])).unwrap();
        assert_eq!(defaults.lanes, 2);
        assert_eq!(defaults.max_speed_kmh, 50);
        assert_eq!(defaults.road_type, "unknown");

        assert!(road_condition_from_tags(0, &point, &ctx, &RoadTags::new()).is_none());
    }

    #[test]
    fn max_speed_parsing() {
        assert_eq!(parse_max_speed_kmh("80"), Some(80));
        assert_eq!(parse_max_speed_kmh("80 km/h"), Some(80));
        assert_eq!(parse_max_speed_kmh("none"), None);
        assert_eq!(parse_max_speed_kmh("0"), None);
    }

    #[test]
    fn sample_indices_use_stride() {
        let rules = HazardRules::default();
        assert_eq!(road_sample_indices(10, &rules).len(), 10);
        assert_eq!(road_sample_indices(100, &rules), (0..100).step_by(5).collect::<Vec<_>>());
    }
}
