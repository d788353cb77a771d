//! Blocking HTTP client for the hazard server API.

use anyhow::{bail, Context, Result};
use hazard_core::RouteAnalysis;
use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;

use crate::route_file::RouteFile;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    #[serde(flatten)]
    route: &'a RouteFile,
    enhanced: bool,
    use_cache: bool,
}

pub struct HazardClient {
    client: Client,
    base_url: String,
}

impl HazardClient {
    /// `timeout` bounds the whole request; enhanced analyses can take a while.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn analyze(&self, route: &RouteFile, enhanced: bool, use_cache: bool) -> Result<RouteAnalysis> {
        let url = format!("{}/v1/routes/analyze", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&AnalyzeRequest {
                route,
                enhanced,
                use_cache,
            })
            .send()
            .with_context(|| format!("failed to reach {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().unwrap_or_default();
            let message = body
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("no error message");
            bail!("server returned {status}: {message}");
        }
        response.json().context("failed to decode analysis")
    }
}
