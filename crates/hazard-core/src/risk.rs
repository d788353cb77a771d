//! Accident-prone area derivation.
//!
//! Areas are synthesized from sharp turns and road conditions that reach the
//! configured risk threshold. Overlapping sources are not merged: two
//! qualifying records at one point produce two areas.

use crate::models::{
    AccidentProneArea, AreaType, CongestionLevel, RoadCondition, SeverityLevel, SharpTurn,
    SurfaceQuality, Visibility,
};
use crate::rules::HazardRules;

/// Accident-prone areas always carry at least this risk score.
pub const MIN_ACCIDENT_RISK: u8 = 7;

pub fn rollover_severity(risk_score: u8) -> SeverityLevel {
    if risk_score >= 9 {
        SeverityLevel::Critical
    } else {
        SeverityLevel::High
    }
}

pub fn skidding_severity(risk_score: u8) -> SeverityLevel {
    if risk_score >= 8 {
        SeverityLevel::High
    } else {
        SeverityLevel::Medium
    }
}

fn turn_factors(turn: &SharpTurn) -> Vec<String> {
    let mut factors = vec![format!("sharp turn of {:.0} degrees", turn.turn_angle_deg)];
    if turn.visibility == Visibility::Poor {
        factors.push("poor visibility".to_string());
    }
    factors.push(format!(
        "recommended speed {} km/h",
        turn.recommended_speed_kmh
    ));
    factors
}

fn road_factors(road: &RoadCondition) -> Vec<String> {
    let mut factors = Vec::new();
    if road.under_construction {
        factors.push("road under construction".to_string());
    }
    if matches!(road.surface_quality, SurfaceQuality::Poor | SurfaceQuality::Moderate) {
        match &road.surface {
            Some(surface) => factors.push(format!("{surface} surface")),
            None => factors.push("degraded surface".to_string()),
        }
    }
    if factors.is_empty() {
        factors.push("hazardous road condition".to_string());
    }
    factors
}

/// Derive accident-prone areas from turn and road records.
pub fn derive_accident_prone_areas(
    sharp_turns: &[SharpTurn],
    road_conditions: &[RoadCondition],
    rules: &HazardRules,
) -> Vec<AccidentProneArea> {
    let threshold = rules.accident_risk_threshold.max(MIN_ACCIDENT_RISK);

    let rollovers = sharp_turns
        .iter()
        .filter(|t| t.meta.risk_score >= threshold)
        .map(|t| AccidentProneArea {
            meta: t.meta.clone(),
            area_type: AreaType::Rollover,
            severity_level: rollover_severity(t.meta.risk_score),
            contributing_factors: turn_factors(t),
        });

    let skids = road_conditions
        .iter()
        .filter(|r| r.meta.risk_score >= threshold)
        .map(|r| AccidentProneArea {
            meta: r.meta.clone(),
            area_type: AreaType::Skidding,
            severity_level: skidding_severity(r.meta.risk_score),
            contributing_factors: road_factors(r),
        });

    rollovers.chain(skids).collect()
}

/// Congestion from the ratio of current to free-flow speed.
pub fn classify_congestion(current_speed_kmh: f64, free_flow_speed_kmh: f64) -> (CongestionLevel, u8) {
    if !(free_flow_speed_kmh > 0.0) || !current_speed_kmh.is_finite() {
        return (CongestionLevel::Free, 2);
    }
    let ratio = current_speed_kmh / free_flow_speed_kmh;
    if ratio >= 0.8 {
        (CongestionLevel::Free, 2)
    } else if ratio >= 0.5 {
        (CongestionLevel::Moderate, 5)
    } else {
        (CongestionLevel::Heavy, 7)
    }
}

/// Driving risk for current weather. Wind and the reported condition are
/// scored separately and the higher one wins.
pub fn weather_risk_score(condition: &str, wind_speed_kmh: f64) -> u8 {
    let condition = condition.to_ascii_lowercase();
    let by_condition = if condition.contains("thunder") || condition.contains("snow") {
        8
    } else if condition.contains("fog") || condition.contains("freezing") {
        7
    } else if condition.contains("rain") || condition.contains("drizzle") || condition.contains("shower") {
        5
    } else {
        2
    };
    let by_wind = if wind_speed_kmh > 60.0 {
        8
    } else if wind_speed_kmh > 40.0 {
        6
    } else {
        2
    };
    by_condition.max(by_wind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, HazardMeta, TurnDirection};
    use chrono::Utc;

    fn meta(risk: u8, lat: f64) -> HazardMeta {
        HazardMeta {
            route_key: "R".to_string(),
            location: GeoPoint { lat, lng: 77.0 },
            risk_score: risk,
            distance_from_start_km: lat,
            created_at: Utc::now(),
        }
    }

    fn turn(risk: u8, angle: f64) -> SharpTurn {
        SharpTurn {
            meta: meta(risk, 12.0),
            turn_angle_deg: angle,
            direction: TurnDirection::Left,
            recommended_speed_kmh: if angle > 90.0 { 20 } else { 30 },
            visibility: if angle > 90.0 {
                Visibility::Poor
            } else {
                Visibility::Moderate
            },
        }
    }

    fn road(risk: u8, quality: SurfaceQuality, construction: bool) -> RoadCondition {
        RoadCondition {
            meta: meta(risk, 12.0),
            surface_quality: quality,
            surface: Some("gravel".to_string()),
            road_type: "track".to_string(),
            lanes: 1,
            max_speed_kmh: 40,
            under_construction: construction,
        }
    }

    #[test]
    fn thresholds_select_sources() {
        let turns = vec![turn(5, 65.0), turn(7, 80.0), turn(9, 120.0)];
        let roads = vec![
            road(3, SurfaceQuality::Good, false),
            road(5, SurfaceQuality::Moderate, false),
            road(7, SurfaceQuality::Poor, false),
            road(8, SurfaceQuality::Critical, true),
        ];
        let areas = derive_accident_prone_areas(&turns, &roads, &HazardRules::default());
        assert_eq!(areas.len(), 4);

        let kinds: Vec<(AreaType, SeverityLevel)> =
            areas.iter().map(|a| (a.area_type, a.severity_level)).collect();
        assert_eq!(
            kinds,
            vec![
                (AreaType::Rollover, SeverityLevel::High),
                (AreaType::Rollover, SeverityLevel::Critical),
                (AreaType::Skidding, SeverityLevel::Medium),
                (AreaType::Skidding, SeverityLevel::High),
            ]
        );
        assert!(areas[1].contributing_factors.iter().any(|f| f == "poor visibility"));
        assert!(areas[3]
            .contributing_factors
            .iter()
            .any(|f| f == "road under construction"));
    }

    #[test]
    fn severity_is_a_function_of_source_risk() {
        let turns: Vec<SharpTurn> = (0..=10).map(|r| turn(r, 95.0)).collect();
        let roads: Vec<RoadCondition> = (0..=10)
            .map(|r| road(r, SurfaceQuality::Poor, false))
            .collect();
        let areas = derive_accident_prone_areas(&turns, &roads, &HazardRules::default());
        assert!(!areas.is_empty());
        for area in &areas {
            assert!(area.meta.risk_score >= 7);
            let expected = match area.area_type {
                AreaType::Rollover => rollover_severity(area.meta.risk_score),
                AreaType::Skidding => skidding_severity(area.meta.risk_score),
            };
            assert_eq!(area.severity_level, expected);
        }
    }

    #[test]
    fn low_thresholds_are_floored() {
        let rules = HazardRules {
            accident_risk_threshold: 3,
            ..HazardRules::default()
        };
        let areas = derive_accident_prone_areas(
            &[turn(5, 65.0), turn(7, 80.0)],
            &[
                road(3, SurfaceQuality::Good, false),
                road(6, SurfaceQuality::Moderate, true),
                road(8, SurfaceQuality::Critical, false),
            ],
            &rules,
        );
        assert_eq!(areas.len(), 2);
        assert!(areas.iter().all(|a| a.meta.risk_score >= MIN_ACCIDENT_RISK));
    }

    #[test]
    fn congestion_bands() {
        assert_eq!(classify_congestion(55.0, 60.0), (CongestionLevel::Free, 2));
        assert_eq!(classify_congestion(35.0, 60.0), (CongestionLevel::Moderate, 5));
        assert_eq!(classify_congestion(10.0, 60.0), (CongestionLevel::Heavy, 7));
        assert_eq!(classify_congestion(10.0, 0.0).0, CongestionLevel::Free);
    }

    #[test]
    fn weather_scores_take_the_worse_factor() {
        assert_eq!(weather_risk_score("Clear sky", 10.0), 2);
        assert_eq!(weather_risk_score("Light rain", 10.0), 5);
        assert_eq!(weather_risk_score("Light rain", 70.0), 8);
        assert_eq!(weather_risk_score("Fog", 0.0), 7);
        assert_eq!(weather_risk_score("Thunderstorm", 0.0), 8);
    }

    #[test]
    fn overlapping_sources_are_not_merged() {
        let areas = derive_accident_prone_areas(
            &[turn(9, 130.0)],
            &[road(8, SurfaceQuality::Critical, true)],
            &HazardRules::default(),
        );
        assert_eq!(areas.len(), 2);
        assert_eq!(areas[0].meta.location, areas[1].meta.location);
    }
}
