//! REST API routes.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::get,
    routing::post,
    Json, Router,
};
use hazard_core::{HazardCollection, Route, RouteAnalysis};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::api::request_id;
use crate::persistence::hazards::{self, NearbyHazard};
use crate::persistence::routes::{self, RouteSummary};
use crate::state::{AppState, BatchProgress, RouteSubmission};

const DEFAULT_NEAR_RADIUS_KM: f64 = 5.0;
const MAX_NEAR_RADIUS_KM: f64 = 200.0;
const DEFAULT_NEAR_LIMIT: usize = 50;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/routes/analyze", post(analyze_route))
        .route("/v1/routes", get(list_routes))
        .route("/v1/routes/:route_key", get(get_route).delete(delete_route))
        .route(
            "/v1/routes/:route_key/hazards/:collection",
            get(get_route_collection),
        )
        .route("/v1/hazards/near", get(find_near_hazards))
        .route("/v1/batches", post(start_batch).get(list_batches))
        .route("/v1/batches/:run_id", get(get_batch))
        .layer(middleware::from_fn(request_id::ensure_request_id))
}

// === Request/Response types ===

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

fn storage_error(err: anyhow::Error) -> ApiError {
    tracing::error!("Storage error: {:#}", err);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable")
}

fn body_error(rejection: JsonRejection) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, rejection.body_text())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(flatten)]
    pub route: RouteSubmission,
    pub enhanced: Option<bool>,
    pub use_cache: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub routes: Vec<RouteSubmission>,
    pub enhanced: Option<bool>,
    pub use_cache: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearQuery {
    pub collection: String,
    pub lat: f64,
    pub lng: f64,
    pub max_distance_km: Option<f64>,
    pub limit: Option<usize>,
}

fn parse_collection(name: &str) -> Result<HazardCollection, ApiError> {
    name.parse::<HazardCollection>().map_err(|_| {
        let known: Vec<&str> = HazardCollection::ALL.iter().map(|c| c.as_str()).collect();
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!("unknown hazard collection '{name}'"),
                "hint": known,
            })),
        )
    })
}

// === Handlers ===

/// Analyze one route, persist the result and return it.
async fn analyze_route(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<RouteAnalysis>, ApiError> {
    let Json(request) = body.map_err(body_error)?;
    let options = state.analyze_options(request.enhanced, request.use_cache);
    let route = Route::build(request.route.metadata, request.route.waypoints).map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": err.to_string(),
                "hint": "provide depotCode and consumerCode, or fileName",
            })),
        )
    })?;

    Ok(Json(state.analyze_route(route, options).await))
}

async fn list_routes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RouteSummary>>, ApiError> {
    routes::list_routes(state.db().pool())
        .await
        .map(Json)
        .map_err(storage_error)
}

/// Stored route with every hazard collection.
async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(route_key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let pool = state.db().pool();
    let stored = routes::load_route(pool, &route_key)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("route '{route_key}' not found")))?;

    let mut collections = Map::new();
    for collection in HazardCollection::ALL {
        let records = hazards::find_by_route(pool, &route_key, collection)
            .await
            .map_err(storage_error)?;
        collections.insert(collection.as_str().to_string(), Value::Array(records));
    }

    Ok(Json(json!({
        "route": stored,
        "hazards": collections,
    })))
}

async fn delete_route(
    State(state): State<Arc<AppState>>,
    Path(route_key): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.delete_route(&route_key).await.map_err(storage_error)? {
        tracing::info!("Deleted route {}", route_key);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, format!("route '{route_key}' not found")))
    }
}

async fn get_route_collection(
    State(state): State<Arc<AppState>>,
    Path((route_key, collection)): Path<(String, String)>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let collection = parse_collection(&collection)?;
    let pool = state.db().pool();
    if routes::load_route(pool, &route_key)
        .await
        .map_err(storage_error)?
        .is_none()
    {
        return Err(api_error(StatusCode::NOT_FOUND, format!("route '{route_key}' not found")));
    }

    hazards::find_by_route(pool, &route_key, collection)
        .await
        .map(Json)
        .map_err(storage_error)
}

async fn find_near_hazards(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<NearbyHazard>>, ApiError> {
    let collection = parse_collection(&query.collection)?;
    if !(-90.0..=90.0).contains(&query.lat) || !(-180.0..=180.0).contains(&query.lng) {
        return Err(api_error(StatusCode::BAD_REQUEST, "lat/lng out of range"));
    }
    let max_distance_km = query.max_distance_km.unwrap_or(DEFAULT_NEAR_RADIUS_KM);
    if !max_distance_km.is_finite() || max_distance_km <= 0.0 || max_distance_km > MAX_NEAR_RADIUS_KM {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("maxDistanceKm must be in (0, {MAX_NEAR_RADIUS_KM}]"),
        ));
    }
    let limit = query.limit.unwrap_or(DEFAULT_NEAR_LIMIT).clamp(1, 500);

    hazards::find_near(
        state.db().pool(),
        collection,
        query.lat,
        query.lng,
        max_distance_km,
        limit,
    )
    .await
    .map(Json)
    .map_err(storage_error)
}

/// Start a background batch run; progress is polled by run id.
async fn start_batch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BatchProgress>), ApiError> {
    let Json(request) = body.map_err(body_error)?;
    if request.routes.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "batch contains no routes"));
    }
    let options = state.analyze_options(request.enhanced, request.use_cache);
    let progress = state.start_batch(request.routes, options);
    tracing::info!("Accepted batch {} ({} routes)", progress.run_id, progress.total_routes);
    Ok((StatusCode::ACCEPTED, Json(progress)))
}

async fn list_batches(State(state): State<Arc<AppState>>) -> Json<Vec<BatchProgress>> {
    Json(state.batches())
}

async fn get_batch(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<BatchProgress>, ApiError> {
    state
        .batch(&run_id)
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("batch '{run_id}' not found")))
}
