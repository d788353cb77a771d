//! External data providers used during route enrichment.
//!
//! Every provider is a trait object so the analyzer can run against fakes.
//! Implementations return `Ok(None)` (or an empty list) when the service has
//! no data, and `Err` only for transport-level failures.

pub mod nominatim;
pub mod open_meteo;
pub mod overpass;
pub mod tomtom;

use futures::future::BoxFuture;
use hazard_core::{BoundingBox, RoadTags};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider HTTP {0}")]
    Http(u16),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Tag filter for a point-of-interest query, e.g. `("amenity", "hospital")`.
pub type PoiCategory = (&'static str, &'static str);

#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterest {
    pub lat: f64,
    pub lng: f64,
    /// Tag value that matched the query, e.g. `hospital`.
    pub kind: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub temperature_c: f64,
    pub condition: String,
    pub humidity_percent: f64,
    pub wind_speed_kmh: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficFlow {
    pub current_speed_kmh: f64,
    pub free_flow_speed_kmh: f64,
    pub confidence: f64,
}

pub trait RoadTagProvider: Send + Sync {
    /// Tags of the road nearest to the point within `radius_m`.
    fn road_tags(&self, lat: f64, lng: f64, radius_m: f64)
        -> BoxFuture<'_, ProviderResult<Option<RoadTags>>>;
}

pub trait PoiProvider: Send + Sync {
    fn points_of_interest(
        &self,
        bounds: BoundingBox,
        categories: &'static [PoiCategory],
    ) -> BoxFuture<'_, ProviderResult<Vec<PointOfInterest>>>;
}

pub trait Geocoder: Send + Sync {
    fn reverse_geocode(&self, lat: f64, lng: f64) -> BoxFuture<'_, ProviderResult<Option<String>>>;
}

pub trait WeatherProvider: Send + Sync {
    fn current_weather(&self, lat: f64, lng: f64)
        -> BoxFuture<'_, ProviderResult<Option<WeatherReading>>>;
}

pub trait TrafficProvider: Send + Sync {
    fn traffic_flow(&self, lat: f64, lng: f64) -> BoxFuture<'_, ProviderResult<Option<TrafficFlow>>>;
}

/// The full set of providers handed to the analyzer.
#[derive(Clone)]
pub struct Providers {
    pub road_tags: Arc<dyn RoadTagProvider>,
    pub pois: Arc<dyn PoiProvider>,
    pub geocoder: Arc<dyn Geocoder>,
    pub weather: Arc<dyn WeatherProvider>,
    pub traffic: Arc<dyn TrafficProvider>,
}

impl Providers {
    /// HTTP-backed providers sharing one client.
    pub fn from_config(config: &Config) -> Self {
        let client = http_client(config);
        let overpass = Arc::new(overpass::OverpassClient::new(client.clone(), config));
        Self {
            road_tags: overpass.clone(),
            pois: overpass,
            geocoder: Arc::new(nominatim::NominatimClient::new(client.clone(), config)),
            weather: Arc::new(open_meteo::OpenMeteoClient::new(client.clone(), config)),
            traffic: Arc::new(tomtom::TomTomClient::new(client, config)),
        }
    }
}

fn http_client(config: &Config) -> Client {
    Client::builder()
        .user_agent(config.geocoder_user_agent.clone())
        .timeout(Duration::from_secs(config.poi_timeout_s.max(5)))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Bound `call` by `limit`; elapsed calls become [`ProviderError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> ProviderResult<T>
where
    F: Future<Output = ProviderResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout),
    }
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ProviderResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Http(status.as_u16()));
    }
    response
        .json::<T>()
        .await
        .map_err(|err| ProviderError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let result: ProviderResult<u8> = with_timeout(Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(1)
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Timeout)));

        let quick: ProviderResult<u8> = with_timeout(Duration::from_secs(5), async { Ok(2) }).await;
        assert_eq!(quick.unwrap(), 2);
    }
}
