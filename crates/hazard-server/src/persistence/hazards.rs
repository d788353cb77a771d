//! Hazard record persistence.
//!
//! Records are stored as JSON documents alongside indexed location and risk
//! columns. Re-analysis replaces a route's records collection by collection;
//! collections are independent, so a failed write leaves the others saved.

use anyhow::Result;
use hazard_core::{distance_km, HazardCollection, HazardRecord, RouteAnalysis};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::routes::upsert_route;

const KM_PER_DEG_LAT: f64 = 111.32;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyHazard {
    pub distance_km: f64,
    pub record: Value,
}

/// Replace every record of `T`'s collection for `route_key`.
pub async fn replace_collection<T>(pool: &SqlitePool, route_key: &str, records: &[T]) -> Result<usize>
where
    T: HazardRecord + Serialize,
{
    let collection = T::COLLECTION.as_str();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM hazard_records WHERE route_key = ?1 AND collection = ?2")
        .bind(route_key)
        .bind(collection)
        .execute(&mut *tx)
        .await?;

    for record in records {
        let meta = record.meta();
        let document = serde_json::to_string(record)?;
        sqlx::query(
            r#"
            INSERT INTO hazard_records (collection, route_key, lat, lng, risk_score, distance_from_start_km, document, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(collection)
        .bind(route_key)
        .bind(meta.location.lat)
        .bind(meta.location.lng)
        .bind(i64::from(meta.risk_score))
        .bind(meta.distance_from_start_km)
        .bind(&document)
        .bind(meta.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(records.len())
}

/// Documents of one collection for a route, in path order.
pub async fn find_by_route(
    pool: &SqlitePool,
    route_key: &str,
    collection: HazardCollection,
) -> Result<Vec<Value>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT document FROM hazard_records WHERE route_key = ?1 AND collection = ?2 ORDER BY distance_from_start_km, id",
    )
    .bind(route_key)
    .bind(collection.as_str())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(document,)| Ok(serde_json::from_str(&document)?))
        .collect()
}

/// Records of `collection` within `max_distance_km` of a point, nearest first.
pub async fn find_near(
    pool: &SqlitePool,
    collection: HazardCollection,
    lat: f64,
    lng: f64,
    max_distance_km: f64,
    limit: usize,
) -> Result<Vec<NearbyHazard>> {
    let lat_delta = max_distance_km / KM_PER_DEG_LAT;
    let lng_delta = max_distance_km / (KM_PER_DEG_LAT * lat.to_radians().cos().abs().max(0.01));

    let ((west_a, east_a), (west_b, east_b)) = longitude_ranges(lng, lng_delta);

    let rows: Vec<(f64, f64, String)> = sqlx::query_as(
        r#"
        SELECT lat, lng, document FROM hazard_records
        WHERE collection = ?1 AND lat BETWEEN ?2 AND ?3
          AND (lng BETWEEN ?4 AND ?5 OR lng BETWEEN ?6 AND ?7)
        "#,
    )
    .bind(collection.as_str())
    .bind(lat - lat_delta)
    .bind(lat + lat_delta)
    .bind(west_a)
    .bind(east_a)
    .bind(west_b)
    .bind(east_b)
    .fetch_all(pool)
    .await?;

    let mut nearby = Vec::new();
    for (row_lat, row_lng, document) in rows {
        let distance = distance_km(lat, lng, row_lat, row_lng);
        if distance <= max_distance_km {
            nearby.push(NearbyHazard {
                distance_km: distance,
                record: serde_json::from_str(&document)?,
            });
        }
    }
    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby.truncate(limit);
    Ok(nearby)
}

/// Longitude prefilter as two `(west, east)` ranges. A box crossing the
/// antimeridian is split; otherwise both ranges are the same.
fn longitude_ranges(lng: f64, delta: f64) -> ((f64, f64), (f64, f64)) {
    if delta >= 180.0 {
        return ((-180.0, 180.0), (-180.0, 180.0));
    }
    let (west, east) = (lng - delta, lng + delta);
    if west < -180.0 {
        ((west + 360.0, 180.0), (-180.0, east))
    } else if east > 180.0 {
        ((west, 180.0), (-180.0, east - 360.0))
    } else {
        ((west, east), (west, east))
    }
}

async fn save_collection<T>(
    pool: &SqlitePool,
    route_key: &str,
    records: &[T],
    notes: &mut Vec<String>,
) where
    T: HazardRecord + Serialize,
{
    match replace_collection(pool, route_key, records).await {
        Ok(count) => debug!("Saved {} {} for {}", count, T::COLLECTION, route_key),
        Err(err) => {
            warn!("Failed to save {} for {}: {}", T::COLLECTION, route_key, err);
            notes.push(format!("persistence: {} not saved", T::COLLECTION));
        }
    }
}

/// Persist a finished analysis.
///
/// Detector collections are always replaced. Enrichment collections are
/// replaced only when the analysis carries them, so a plain re-run keeps the
/// last enriched data. Returns a note per failed write.
pub async fn save_analysis(pool: &SqlitePool, analysis: &RouteAnalysis) -> Vec<String> {
    let route_key = analysis.route.route_key.as_str();
    let mut notes = Vec::new();

    if let Err(err) = upsert_route(pool, analysis).await {
        warn!("Failed to save route {}: {}", route_key, err);
        notes.push("persistence: route not saved".to_string());
    }

    save_collection(pool, route_key, &analysis.sharp_turns, &mut notes).await;
    save_collection(pool, route_key, &analysis.blind_spots, &mut notes).await;
    save_collection(pool, route_key, &analysis.accident_prone_areas, &mut notes).await;
    save_collection(pool, route_key, &analysis.road_conditions, &mut notes).await;
    save_collection(pool, route_key, &analysis.network_coverages, &mut notes).await;
    if let Some(records) = &analysis.emergency_services {
        save_collection(pool, route_key, records, &mut notes).await;
    }
    if let Some(records) = &analysis.eco_zones {
        save_collection(pool, route_key, records, &mut notes).await;
    }
    if let Some(records) = &analysis.traffic_data {
        save_collection(pool, route_key, records, &mut notes).await;
    }
    if let Some(records) = &analysis.weather_conditions {
        save_collection(pool, route_key, records, &mut notes).await;
    }

    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{init_database, routes};
    use chrono::Utc;
    use hazard_core::{
        detect_sharp_turns, Route, RouteContext, RouteMetadata, HazardRules, Waypoint,
    };

    fn corner_route() -> Route {
        Route::build(
            RouteMetadata {
                depot_code: Some("D1".into()),
                consumer_code: Some("C1".into()),
                ..Default::default()
            },
            vec![
                Waypoint::new(10.50, 30.00),
                Waypoint::new(10.51, 30.00),
                Waypoint::new(10.52, 30.00),
                Waypoint::new(10.52, 30.01),
                Waypoint::new(10.52, 30.02),
            ],
        )
        .unwrap()
    }

    fn analysis_for(route: Route) -> RouteAnalysis {
        let ctx = RouteContext::new(route.route_key.clone(), &route.waypoints, Utc::now());
        let turns = detect_sharp_turns(&route.waypoints, &ctx, &HazardRules::default());
        let mut analysis = RouteAnalysis::empty("run", route, Utc::now());
        analysis.sharp_turns = turns;
        analysis
    }

    #[tokio::test]
    async fn reanalysis_replaces_records() {
        let db = init_database(":memory:", 1).await.unwrap();
        let analysis = analysis_for(corner_route());
        assert_eq!(analysis.sharp_turns.len(), 1);

        assert!(save_analysis(db.pool(), &analysis).await.is_empty());
        assert!(save_analysis(db.pool(), &analysis).await.is_empty());

        let stored = find_by_route(db.pool(), "D1-C1", HazardCollection::SharpTurns)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["direction"], "right");
        assert_eq!(stored[0]["routeKey"], "D1-C1");

        let route = routes::load_route(db.pool(), "D1-C1").await.unwrap().unwrap();
        assert_eq!(route.route.waypoints.len(), 5);
        assert_eq!(route.summary.waypoint_count, 5);
    }

    #[tokio::test]
    async fn near_query_filters_by_great_circle_distance() {
        let db = init_database(":memory:", 1).await.unwrap();
        save_analysis(db.pool(), &analysis_for(corner_route())).await;

        let hits = find_near(db.pool(), HazardCollection::SharpTurns, 10.52, 30.001, 1.0, 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].distance_km < 0.2);

        let misses = find_near(db.pool(), HazardCollection::SharpTurns, 10.60, 30.0, 1.0, 10)
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn near_query_crosses_the_antimeridian() {
        let db = init_database(":memory:", 1).await.unwrap();
        let route = Route::build(
            RouteMetadata {
                file_name: Some("dateline.json".into()),
                ..Default::default()
            },
            vec![
                Waypoint::new(10.50, 179.97),
                Waypoint::new(10.51, 179.97),
                Waypoint::new(10.52, 179.97),
                Waypoint::new(10.52, 179.98),
                Waypoint::new(10.52, 179.99),
            ],
        )
        .unwrap();
        save_analysis(db.pool(), &analysis_for(route)).await;

        let hits = find_near(db.pool(), HazardCollection::SharpTurns, 10.52, -179.995, 5.0, 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].distance_km < 5.0);
    }

    #[test]
    fn longitude_ranges_split_at_the_dateline() {
        assert_eq!(longitude_ranges(10.0, 1.0), ((9.0, 11.0), (9.0, 11.0)));
        assert_eq!(longitude_ranges(179.5, 1.0), ((178.5, 180.0), (-180.0, -179.5)));
        assert_eq!(longitude_ranges(-179.5, 1.0), ((179.5, 180.0), (-180.0, -178.5)));
    }

    #[tokio::test]
    async fn delete_removes_route_and_records() {
        let db = init_database(":memory:", 1).await.unwrap();
        save_analysis(db.pool(), &analysis_for(corner_route())).await;

        assert!(routes::delete_route(db.pool(), "D1-C1").await.unwrap());
        assert!(!routes::delete_route(db.pool(), "D1-C1").await.unwrap());
        let stored = find_by_route(db.pool(), "D1-C1", HazardCollection::SharpTurns)
            .await
            .unwrap();
        assert!(stored.is_empty());
    }
}
