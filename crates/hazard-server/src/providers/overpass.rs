//! OpenStreetMap Overpass client for road tags and points of interest.

use futures::future::BoxFuture;
use hazard_core::{BoundingBox, RoadTags};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{read_json, PoiCategory, PoiProvider, PointOfInterest, ProviderResult, RoadTagProvider};
use crate::config::Config;

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

pub struct OverpassClient {
    client: Client,
    url: String,
    road_timeout: Duration,
    poi_timeout: Duration,
}

impl OverpassClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.overpass_url.clone(),
            road_timeout: Duration::from_secs(config.road_tags_timeout_s.max(1)),
            poi_timeout: Duration::from_secs(config.poi_timeout_s.max(1)),
        }
    }

    async fn run_query(&self, query: String, timeout: Duration) -> ProviderResult<OverpassResponse> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "text/plain")
            .timeout(timeout)
            .body(query)
            .send()
            .await?;
        read_json(response).await
    }
}

fn road_query(lat: f64, lng: f64, radius_m: f64, timeout_s: u64) -> String {
    format!("[out:json][timeout:{timeout_s}];way(around:{radius_m:.0},{lat},{lng})[\"highway\"];out tags 1;")
}

fn poi_query(bounds: &BoundingBox, categories: &[PoiCategory], timeout_s: u64) -> String {
    let bbox = format!(
        "{},{},{},{}",
        bounds.south, bounds.west, bounds.north, bounds.east
    );
    let mut clauses = String::new();
    for (key, value) in categories {
        for kind in ["node", "way", "relation"] {
            clauses.push_str(&format!("  {kind}[\"{key}\"=\"{value}\"]({bbox});\n"));
        }
    }
    format!("[out:json][timeout:{timeout_s}];\n(\n{clauses});\nout center tags;")
}

fn compose_address(tags: &HashMap<String, String>) -> Option<String> {
    if let Some(full) = tags.get("addr:full") {
        return Some(full.clone());
    }
    let street = match (tags.get("addr:housenumber"), tags.get("addr:street")) {
        (Some(number), Some(street)) => Some(format!("{number} {street}")),
        (None, Some(street)) => Some(street.clone()),
        _ => None,
    };
    let parts: Vec<String> = [street, tags.get("addr:city").cloned(), tags.get("addr:postcode").cloned()]
        .into_iter()
        .flatten()
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn to_point_of_interest(
    element: OverpassElement,
    categories: &[PoiCategory],
) -> Option<PointOfInterest> {
    let (lat, lng) = match (element.lat, element.lon, element.center) {
        (Some(lat), Some(lon), _) => (lat, lon),
        (_, _, Some(center)) => (center.lat, center.lon),
        _ => return None,
    };
    let tags = element.tags.unwrap_or_default();
    let kind = categories
        .iter()
        .find(|(key, value)| tags.get(*key).is_some_and(|v| v == value))
        .map(|(_, value)| value.to_string())?;

    Some(PointOfInterest {
        lat,
        lng,
        kind,
        name: tags.get("name").cloned(),
        address: compose_address(&tags),
        phone: tags.get("phone").or_else(|| tags.get("contact:phone")).cloned(),
    })
}

impl RoadTagProvider for OverpassClient {
    fn road_tags(
        &self,
        lat: f64,
        lng: f64,
        radius_m: f64,
    ) -> BoxFuture<'_, ProviderResult<Option<RoadTags>>> {
        Box::pin(async move {
            let query = road_query(lat, lng, radius_m, self.road_timeout.as_secs());
            let payload = self.run_query(query, self.road_timeout).await?;
            Ok(payload
                .elements
                .into_iter()
                .find_map(|element| element.tags)
                .filter(|tags| !tags.is_empty()))
        })
    }
}

impl PoiProvider for OverpassClient {
    fn points_of_interest(
        &self,
        bounds: BoundingBox,
        categories: &'static [PoiCategory],
    ) -> BoxFuture<'_, ProviderResult<Vec<PointOfInterest>>> {
        Box::pin(async move {
            let query = poi_query(&bounds, categories, self.poi_timeout.as_secs());
            let payload = self.run_query(query, self.poi_timeout).await?;
            let points: Vec<PointOfInterest> = payload
                .elements
                .into_iter()
                .filter_map(|element| to_point_of_interest(element, categories))
                .collect();
            tracing::debug!("Overpass returned {} points of interest", points.len());
            Ok(points)
        })
    }
}
