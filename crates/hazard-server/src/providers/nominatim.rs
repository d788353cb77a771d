//! Nominatim reverse geocoding.

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{read_json, Geocoder, ProviderResult};
use crate::config::Config;

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
}

pub struct NominatimClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl NominatimClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.geocoder_url.clone(),
            timeout: Duration::from_secs(config.geocoder_timeout_s.max(1)),
        }
    }
}

impl Geocoder for NominatimClient {
    fn reverse_geocode(&self, lat: f64, lng: f64) -> BoxFuture<'_, ProviderResult<Option<String>>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.url)
                .query(&[
                    ("format", "jsonv2".to_string()),
                    ("lat", lat.to_string()),
                    ("lon", lng.to_string()),
                ])
                .timeout(self.timeout)
                .send()
                .await?;
            let payload: ReverseResponse = read_json(response).await?;
            Ok(payload
                .display_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()))
        })
    }
}
