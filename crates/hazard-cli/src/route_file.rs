//! JSON route files.
//!
//! Two shapes are accepted: an object with route metadata and a `waypoints`
//! array, or a bare array of waypoints (keyed by the file name).

use anyhow::{Context, Result};
use hazard_core::{Route, RouteMetadata, Waypoint};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteFile {
    #[serde(flatten)]
    pub metadata: RouteMetadata,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FileShape {
    Bare(Vec<Waypoint>),
    Full(RouteFile),
}

impl RouteFile {
    /// Parse file contents; `file_name` fills in a missing metadata name.
    pub fn parse(contents: &str, file_name: &str) -> Result<Self> {
        let mut file = match serde_json::from_str::<FileShape>(contents)
            .context("route file must be a waypoint array or an object with waypoints")?
        {
            FileShape::Bare(waypoints) => RouteFile {
                metadata: RouteMetadata::default(),
                waypoints,
            },
            FileShape::Full(file) => file,
        };
        if file.metadata.file_name.is_none() {
            file.metadata.file_name = Some(file_name.to_string());
        }
        Ok(file)
    }

    pub fn into_route(self) -> Result<Route> {
        Route::build(self.metadata, self.waypoints).context("cannot derive a route key")
    }
}

pub fn load_route_file(path: &Path) -> Result<RouteFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("route.json");
    RouteFile::parse(&contents, file_name).with_context(|| format!("invalid route file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array_is_keyed_by_file_name() {
        let file = RouteFile::parse(
            r#"[{"lat": 12.9, "lng": 77.5}, {"lat": 13.0, "lng": 77.6}]"#,
            "north_loop.json",
        )
        .unwrap();
        let route = file.into_route().unwrap();
        assert_eq!(route.route_key, "north_loop");
        assert_eq!(route.waypoints.len(), 2);
    }

    #[test]
    fn object_keeps_its_own_metadata() {
        let file = RouteFile::parse(
            r#"{
                "depotCode": "D1",
                "consumerCode": "C2",
                "waypoints": [{"lat": 12.9, "lng": 77.5, "sequenceId": 4}]
            }"#,
            "ignored.json",
        )
        .unwrap();
        assert_eq!(file.waypoints[0].sequence_id, Some(4));
        assert_eq!(file.into_route().unwrap().route_key, "D1-C2");
    }

    #[test]
    fn rejects_other_json() {
        assert!(RouteFile::parse(r#""just a string""#, "x.json").is_err());
    }
}
