//! Open-Meteo current weather.

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{read_json, ProviderResult, WeatherProvider, WeatherReading};
use crate::config::Config;

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    current: Option<WeatherCurrent>,
    current_weather: Option<WeatherCurrentAlt>,
}

#[derive(Debug, Deserialize)]
struct WeatherCurrent {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    weather_code: Option<u16>,
}

// Legacy `current_weather=true` shape, still served by some mirrors.
#[derive(Debug, Deserialize)]
struct WeatherCurrentAlt {
    temperature: Option<f64>,
    windspeed: Option<f64>,
    weathercode: Option<u16>,
}

pub struct OpenMeteoClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl OpenMeteoClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.weather_url.clone(),
            timeout: Duration::from_secs(config.weather_timeout_s.max(1)),
        }
    }
}

/// Text label for a WMO weather interpretation code.
pub fn describe_weather_code(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1..=3 => "Partly cloudy",
        45 | 48 => "Fog",
        51..=55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61..=65 => "Rain",
        66 | 67 => "Freezing rain",
        71..=77 => "Snow",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95..=99 => "Thunderstorm",
        _ => "Unknown",
    }
}

fn to_reading(payload: WeatherResponse) -> Option<WeatherReading> {
    if let Some(current) = payload.current {
        return Some(WeatherReading {
            temperature_c: current.temperature_2m?,
            condition: describe_weather_code(current.weather_code.unwrap_or(u16::MAX)).to_string(),
            humidity_percent: current.relative_humidity_2m.unwrap_or(0.0),
            wind_speed_kmh: current.wind_speed_10m.unwrap_or(0.0),
        });
    }
    let alt = payload.current_weather?;
    Some(WeatherReading {
        temperature_c: alt.temperature?,
        condition: describe_weather_code(alt.weathercode.unwrap_or(u16::MAX)).to_string(),
        humidity_percent: 0.0,
        wind_speed_kmh: alt.windspeed.unwrap_or(0.0),
    })
}

impl WeatherProvider for OpenMeteoClient {
    fn current_weather(
        &self,
        lat: f64,
        lng: f64,
    ) -> BoxFuture<'_, ProviderResult<Option<WeatherReading>>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.url)
                .query(&[
                    ("latitude", lat.to_string()),
                    ("longitude", lng.to_string()),
                    (
                        "current",
                        "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code"
                            .to_string(),
                    ),
                    ("wind_speed_unit", "kmh".to_string()),
                    ("timezone", "UTC".to_string()),
                ])
                .timeout(self.timeout)
                .send()
                .await?;
            let payload: WeatherResponse = read_json(response).await?;
            Ok(to_reading(payload))
        })
    }
}
