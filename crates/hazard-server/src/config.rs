//! Server configuration from environment.

use hazard_core::HazardRules;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    /// `json` switches the log formatter to structured output.
    pub log_format: String,

    pub cache_enabled: bool,
    pub cache_ttl_s: u64,
    pub cache_max_entries: usize,
    /// `enhanced` value used when a request omits the flag.
    pub enhanced_default: bool,

    pub overpass_url: String,
    pub road_tags_timeout_s: u64,
    pub poi_timeout_s: u64,
    pub poi_padding_km: f64,

    pub weather_url: String,
    pub weather_timeout_s: u64,
    pub weather_samples: usize,

    pub traffic_url: String,
    pub traffic_api_key: Option<String>,
    pub traffic_timeout_s: u64,
    pub traffic_samples: usize,

    pub geocoder_url: String,
    pub geocoder_timeout_s: u64,
    pub geocoder_user_agent: String,

    /// Fixed seed for the simulated coverage model; random when unset.
    pub coverage_seed: Option<u64>,
    pub rules: HazardRules,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = HazardRules::default();
        let rules = HazardRules {
            sharp_turn_threshold_deg: env_or(
                "HAZARD_SHARP_TURN_THRESHOLD_DEG",
                defaults.sharp_turn_threshold_deg,
            ),
            road_lookup_radius_m: env_or("HAZARD_ROAD_RADIUS_M", defaults.road_lookup_radius_m),
            ..defaults
        };

        Self {
            server_port: env_or("HAZARD_PORT", 3000),
            database_path: env_string("HAZARD_DB_PATH", "data/hazards.db"),
            database_max_connections: env_or("HAZARD_DB_MAX_CONNECTIONS", 5),
            log_format: env_string("HAZARD_LOG_FORMAT", "plain"),

            cache_enabled: env_flag("HAZARD_CACHE_ENABLED", true),
            cache_ttl_s: env_or("HAZARD_CACHE_TTL_S", 3600),
            cache_max_entries: env_or("HAZARD_CACHE_MAX_ENTRIES", 500),
            enhanced_default: env_flag("HAZARD_ENHANCED_DEFAULT", false),

            overpass_url: env_string(
                "OVERPASS_URL",
                "https://overpass-api.de/api/interpreter",
            ),
            road_tags_timeout_s: env_or("OVERPASS_ROAD_TIMEOUT_S", 10),
            poi_timeout_s: env_or("OVERPASS_POI_TIMEOUT_S", 30),
            poi_padding_km: env_or("HAZARD_POI_PADDING_KM", 2.0),

            weather_url: env_string("WEATHER_URL", "https://api.open-meteo.com/v1/forecast"),
            weather_timeout_s: env_or("WEATHER_TIMEOUT_S", 5),
            weather_samples: env_or("WEATHER_SAMPLES", 5),

            traffic_url: env_string(
                "TRAFFIC_URL",
                "https://api.tomtom.com/traffic/services/4/flowSegmentData/absolute/10/json",
            ),
            traffic_api_key: env::var("TRAFFIC_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            traffic_timeout_s: env_or("TRAFFIC_TIMEOUT_S", 5),
            traffic_samples: env_or("TRAFFIC_SAMPLES", 5),

            geocoder_url: env_string(
                "GEOCODER_URL",
                "https://nominatim.openstreetmap.org/reverse",
            ),
            geocoder_timeout_s: env_or("GEOCODER_TIMEOUT_S", 5),
            geocoder_user_agent: env_string("GEOCODER_USER_AGENT", "hazard-server/0.1"),

            coverage_seed: env::var("HAZARD_COVERAGE_SEED").ok().and_then(|s| s.trim().parse().ok()),
            rules,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_s)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
