//! Route persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use hazard_core::{Route, RouteAnalysis};
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub route_key: String,
    pub total_distance_km: f64,
    pub waypoint_count: i64,
    pub enhanced: bool,
    pub errors: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRoute {
    #[serde(flatten)]
    pub summary: RouteSummary,
    pub route: Route,
}

/// Insert or replace the route row for an analysis.
pub async fn upsert_route(pool: &SqlitePool, analysis: &RouteAnalysis) -> Result<()> {
    let document = serde_json::to_string(&analysis.route)?;
    let errors = serde_json::to_string(&analysis.errors)?;

    sqlx::query(
        r#"
        INSERT INTO routes (route_key, document, total_distance_km, waypoint_count, enhanced, errors, analyzed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(route_key) DO UPDATE SET
            document = ?2, total_distance_km = ?3, waypoint_count = ?4,
            enhanced = ?5, errors = ?6, analyzed_at = ?7
        "#,
    )
    .bind(&analysis.route.route_key)
    .bind(&document)
    .bind(analysis.route.total_distance_km)
    .bind(analysis.route.waypoints.len() as i64)
    .bind(analysis.enhanced)
    .bind(&errors)
    .bind(analysis.analyzed_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_routes(pool: &SqlitePool) -> Result<Vec<RouteSummary>> {
    let rows = sqlx::query_as::<_, RouteRow>(
        "SELECT route_key, document, total_distance_km, waypoint_count, enhanced, errors, analyzed_at FROM routes ORDER BY analyzed_at DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|row| row.summary()).collect()
}

pub async fn load_route(pool: &SqlitePool, route_key: &str) -> Result<Option<StoredRoute>> {
    let row = sqlx::query_as::<_, RouteRow>(
        "SELECT route_key, document, total_distance_km, waypoint_count, enhanced, errors, analyzed_at FROM routes WHERE route_key = ?1",
    )
    .bind(route_key)
    .fetch_optional(pool)
    .await?;

    row.map(StoredRoute::try_from).transpose()
}

/// Delete a route and every hazard record it owns.
pub async fn delete_route(pool: &SqlitePool, route_key: &str) -> Result<bool> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM hazard_records WHERE route_key = ?1")
        .bind(route_key)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM routes WHERE route_key = ?1")
        .bind(route_key)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    route_key: String,
    document: String,
    total_distance_km: f64,
    waypoint_count: i64,
    enhanced: bool,
    errors: String,
    analyzed_at: String,
}

impl RouteRow {
    fn summary(&self) -> Result<RouteSummary> {
        let analyzed_at = DateTime::parse_from_rfc3339(&self.analyzed_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(RouteSummary {
            route_key: self.route_key.clone(),
            total_distance_km: self.total_distance_km,
            waypoint_count: self.waypoint_count,
            enhanced: self.enhanced,
            errors: serde_json::from_str(&self.errors)?,
            analyzed_at,
        })
    }
}

impl TryFrom<RouteRow> for StoredRoute {
    type Error = anyhow::Error;

    fn try_from(row: RouteRow) -> Result<Self> {
        let summary = row.summary()?;
        let route: Route = serde_json::from_str(&row.document)?;
        Ok(StoredRoute { summary, route })
    }
}
