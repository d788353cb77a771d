//! Enrichment fan-out: points of interest, weather, traffic and addresses.
//!
//! Each branch runs under its own timeout and turns failures into notes on
//! the result. Nothing here is retried.

use futures::future::join_all;
use hazard_core::spatial::bounding_box;
use hazard_core::{
    classify_congestion, expand_bounds_km, weather_risk_score, BoundingBox, EcoZone,
    EmergencyService, GeoPoint, RouteContext, TrafficSample, Waypoint, WeatherSample,
};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::providers::{
    with_timeout, PoiCategory, PointOfInterest, ProviderError, ProviderResult, Providers,
};

pub const EMERGENCY_CATEGORIES: &[PoiCategory] = &[
    ("amenity", "hospital"),
    ("amenity", "police"),
    ("amenity", "fire_station"),
];

pub const ECO_CATEGORIES: &[PoiCategory] = &[
    ("leisure", "nature_reserve"),
    ("boundary", "protected_area"),
    ("boundary", "national_park"),
];

// Emergency services are resources, not hazards.
const EMERGENCY_RISK: u8 = 0;
// Protected areas bring speed and noise restrictions.
const ECO_ZONE_RISK: u8 = 3;

/// Per-provider timeouts and sampling for one analysis.
#[derive(Debug, Clone)]
pub struct EnrichmentLimits {
    pub road_tags_timeout: Duration,
    pub poi_timeout: Duration,
    pub weather_timeout: Duration,
    pub traffic_timeout: Duration,
    pub geocoder_timeout: Duration,
    pub weather_samples: usize,
    pub traffic_samples: usize,
    pub poi_padding_km: f64,
}

impl Default for EnrichmentLimits {
    fn default() -> Self {
        Self {
            road_tags_timeout: Duration::from_secs(10),
            poi_timeout: Duration::from_secs(30),
            weather_timeout: Duration::from_secs(5),
            traffic_timeout: Duration::from_secs(5),
            geocoder_timeout: Duration::from_secs(5),
            weather_samples: 5,
            traffic_samples: 5,
            poi_padding_km: 2.0,
        }
    }
}

impl EnrichmentLimits {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            road_tags_timeout: Duration::from_secs(config.road_tags_timeout_s.max(1)),
            poi_timeout: Duration::from_secs(config.poi_timeout_s.max(1)),
            weather_timeout: Duration::from_secs(config.weather_timeout_s.max(1)),
            traffic_timeout: Duration::from_secs(config.traffic_timeout_s.max(1)),
            geocoder_timeout: Duration::from_secs(config.geocoder_timeout_s.max(1)),
            weather_samples: config.weather_samples,
            traffic_samples: config.traffic_samples,
            poi_padding_km: config.poi_padding_km.max(0.0),
        }
    }
}

#[derive(Debug, Default)]
pub struct Enrichment {
    pub emergency_services: Vec<EmergencyService>,
    pub eco_zones: Vec<EcoZone>,
    pub weather: Vec<WeatherSample>,
    pub traffic: Vec<TrafficSample>,
    pub start_address: Option<String>,
    pub end_address: Option<String>,
    pub errors: Vec<String>,
}

/// Results of a per-waypoint lookup fan-out.
pub(crate) struct SampleOutcome<R> {
    pub found: Vec<(usize, R)>,
    pub total: usize,
    pub failed: usize,
    pub not_configured: Option<String>,
}

impl<R> SampleOutcome<R> {
    /// `{label}: n of m samples failed`, or the configuration problem.
    pub fn failure_note(&self, label: &str) -> Option<String> {
        if let Some(reason) = &self.not_configured {
            return Some(format!("{label}: {reason}"));
        }
        (self.failed > 0).then(|| format!("{label}: {} of {} samples failed", self.failed, self.total))
    }
}

/// Call `lookup` for every sampled waypoint concurrently, each bounded by
/// `limit`. Failed and empty lookups contribute nothing.
pub(crate) async fn sample_waypoints<R, F, Fut>(
    label: &str,
    waypoints: &[Waypoint],
    indices: &[usize],
    limit: Duration,
    lookup: F,
) -> SampleOutcome<R>
where
    F: Fn(f64, f64) -> Fut,
    Fut: Future<Output = ProviderResult<Option<R>>>,
{
    let calls = indices.iter().filter(|&&idx| idx < waypoints.len()).map(|&idx| {
        let point = &waypoints[idx];
        let call = with_timeout(limit, lookup(point.lat, point.lng));
        async move { (idx, call.await) }
    });
    let results = join_all(calls).await;

    let mut outcome = SampleOutcome {
        found: Vec::new(),
        total: results.len(),
        failed: 0,
        not_configured: None,
    };
    for (idx, result) in results {
        match result {
            Ok(Some(value)) => outcome.found.push((idx, value)),
            Ok(None) => debug!("{label}: no data at sample {idx}"),
            Err(err @ ProviderError::NotConfigured(_)) => {
                outcome.failed += 1;
                outcome.not_configured = Some(err.to_string());
            }
            Err(err) => {
                outcome.failed += 1;
                warn!("{label}: lookup at sample {idx} failed: {err}");
            }
        }
    }
    outcome
}

/// Up to `count` indices spread evenly from the first to the last waypoint.
pub fn spread_indices(len: usize, count: usize) -> Vec<usize> {
    if len == 0 || count == 0 {
        return Vec::new();
    }
    if len <= count {
        return (0..len).collect();
    }
    if count == 1 {
        return vec![len / 2];
    }
    let mut indices: Vec<usize> = (0..count).map(|i| i * (len - 1) / (count - 1)).collect();
    indices.dedup();
    indices
}

async fn query_pois(
    providers: &Providers,
    limits: &EnrichmentLimits,
    label: &str,
    bounds: BoundingBox,
    categories: &'static [PoiCategory],
) -> Result<Vec<PointOfInterest>, String> {
    with_timeout(
        limits.poi_timeout,
        providers.pois.points_of_interest(bounds, categories),
    )
    .await
    .map_err(|err| {
        warn!("{label} lookup failed: {err}");
        format!("{label}: {err}")
    })
}

fn display_name(poi: &PointOfInterest) -> String {
    poi.name
        .clone()
        .unwrap_or_else(|| format!("Unnamed {}", poi.kind.replace('_', " ")))
}

async fn emergency_services(
    providers: &Providers,
    limits: &EnrichmentLimits,
    bounds: BoundingBox,
    waypoints: &[Waypoint],
    ctx: &RouteContext,
) -> Result<Vec<EmergencyService>, String> {
    let points = query_pois(providers, limits, "emergency_services", bounds, EMERGENCY_CATEGORIES).await?;
    Ok(points
        .into_iter()
        .map(|poi| EmergencyService {
            meta: ctx.meta_near(waypoints, GeoPoint { lat: poi.lat, lng: poi.lng }, EMERGENCY_RISK),
            name: display_name(&poi),
            address: poi.address.clone().unwrap_or_default(),
            phone: poi.phone.clone(),
            service_type: poi.kind,
        })
        .collect())
}

async fn eco_zones(
    providers: &Providers,
    limits: &EnrichmentLimits,
    bounds: BoundingBox,
    waypoints: &[Waypoint],
    ctx: &RouteContext,
) -> Result<Vec<EcoZone>, String> {
    let points = query_pois(providers, limits, "eco_zones", bounds, ECO_CATEGORIES).await?;
    Ok(points
        .into_iter()
        .map(|poi| EcoZone {
            meta: ctx.meta_near(waypoints, GeoPoint { lat: poi.lat, lng: poi.lng }, ECO_ZONE_RISK),
            name: display_name(&poi),
            address: poi.address.clone().unwrap_or_default(),
            zone_type: poi.kind,
        })
        .collect())
}

async fn reverse_geocode(
    providers: &Providers,
    limits: &EnrichmentLimits,
    point: &Waypoint,
    which: &str,
) -> (Option<String>, Option<String>) {
    match with_timeout(
        limits.geocoder_timeout,
        providers.geocoder.reverse_geocode(point.lat, point.lng),
    )
    .await
    {
        Ok(address) => (address, None),
        Err(err) => {
            warn!("Reverse geocoding of {which} point failed: {err}");
            (None, Some(format!("geocoding: {which} address unavailable: {err}")))
        }
    }
}

/// Run every enrichment branch concurrently for a non-empty route.
pub async fn enrich(
    providers: &Providers,
    limits: &EnrichmentLimits,
    waypoints: &[Waypoint],
    ctx: &RouteContext,
) -> Enrichment {
    let (Some(first), Some(last), Some(bounds)) =
        (waypoints.first(), waypoints.last(), bounding_box(waypoints))
    else {
        return Enrichment::default();
    };
    let bounds = expand_bounds_km(&bounds, limits.poi_padding_km);
    let weather_indices = spread_indices(waypoints.len(), limits.weather_samples);
    let traffic_indices = spread_indices(waypoints.len(), limits.traffic_samples);

    let (emergency, eco, weather, traffic, start, end) = tokio::join!(
        emergency_services(providers, limits, bounds, waypoints, ctx),
        eco_zones(providers, limits, bounds, waypoints, ctx),
        sample_waypoints("weather", waypoints, &weather_indices, limits.weather_timeout, |lat, lng| {
            providers.weather.current_weather(lat, lng)
        }),
        sample_waypoints("traffic", waypoints, &traffic_indices, limits.traffic_timeout, |lat, lng| {
            providers.traffic.traffic_flow(lat, lng)
        }),
        reverse_geocode(providers, limits, first, "start"),
        reverse_geocode(providers, limits, last, "end"),
    );

    let mut enrichment = Enrichment::default();
    match emergency {
        Ok(records) => enrichment.emergency_services = records,
        Err(note) => enrichment.errors.push(note),
    }
    match eco {
        Ok(records) => enrichment.eco_zones = records,
        Err(note) => enrichment.errors.push(note),
    }

    enrichment.errors.extend(weather.failure_note("weather"));
    enrichment.weather = weather
        .found
        .into_iter()
        .map(|(idx, reading)| WeatherSample {
            meta: ctx.meta(
                idx,
                &waypoints[idx],
                weather_risk_score(&reading.condition, reading.wind_speed_kmh),
            ),
            temperature_c: reading.temperature_c,
            condition: reading.condition,
            humidity_percent: reading.humidity_percent,
            wind_speed_kmh: reading.wind_speed_kmh,
        })
        .collect();

    enrichment.errors.extend(traffic.failure_note("traffic"));
    enrichment.traffic = traffic
        .found
        .into_iter()
        .map(|(idx, flow)| {
            let (congestion_level, risk) =
                classify_congestion(flow.current_speed_kmh, flow.free_flow_speed_kmh);
            TrafficSample {
                meta: ctx.meta(idx, &waypoints[idx], risk),
                current_speed_kmh: flow.current_speed_kmh,
                free_flow_speed_kmh: flow.free_flow_speed_kmh,
                confidence: flow.confidence,
                congestion_level,
            }
        })
        .collect();

    enrichment.start_address = start.0;
    enrichment.errors.extend(start.1);
    enrichment.end_address = end.0;
    enrichment.errors.extend(end.1);
    enrichment
}
