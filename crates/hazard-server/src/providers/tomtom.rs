//! TomTom flow-segment traffic lookups.

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{read_json, ProviderError, ProviderResult, TrafficFlow, TrafficProvider};
use crate::config::Config;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowResponse {
    flow_segment_data: Option<FlowSegmentData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowSegmentData {
    current_speed: f64,
    free_flow_speed: f64,
    #[serde(default)]
    confidence: f64,
}

pub struct TomTomClient {
    client: Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl TomTomClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.traffic_url.clone(),
            api_key: config.traffic_api_key.clone(),
            timeout: Duration::from_secs(config.traffic_timeout_s.max(1)),
        }
    }
}

impl TrafficProvider for TomTomClient {
    fn traffic_flow(&self, lat: f64, lng: f64) -> BoxFuture<'_, ProviderResult<Option<TrafficFlow>>> {
        Box::pin(async move {
            let api_key = self
                .api_key
                .as_deref()
                .ok_or(ProviderError::NotConfigured("traffic API key"))?;
            let response = self
                .client
                .get(&self.url)
                .query(&[("key", api_key.to_string()), ("point", format!("{lat},{lng}"))])
                .timeout(self.timeout)
                .send()
                .await?;
            let payload: FlowResponse = read_json(response).await?;
            Ok(payload.flow_segment_data.map(|flow| TrafficFlow {
                current_speed_kmh: flow.current_speed,
                free_flow_speed_kmh: flow.free_flow_speed,
                confidence: flow.confidence,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_is_reported_without_a_request() {
        let mut config = Config::from_env();
        config.traffic_api_key = None;
        let client = TomTomClient::new(Client::new(), &config);
        let result = client.traffic_flow(12.9, 77.6).await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn flow_payload_parses() {
        let payload: FlowResponse = serde_json::from_str(
            r#"{"flowSegmentData": {"frc": "FRC2", "currentSpeed": 34, "freeFlowSpeed": 56,
                "currentTravelTime": 120, "confidence": 0.92}}"#,
        )
        .unwrap();
        let flow = payload.flow_segment_data.unwrap();
        assert_eq!(flow.current_speed, 34.0);
        assert_eq!(flow.confidence, 0.92);
    }
}
