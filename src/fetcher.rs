use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, warn};

use crate::api::latency::LatencyStats;
use crate::config::{Config, COUNTRY_CODE};
use crate::error::{AppError, Result};
use crate::types::{Concentrations, Coordinates, Pollutant, PollutantReading};

/// Resolves a city name to coordinates.
pub trait CoordinateResolver {
    fn resolve(&self, city: &str) -> impl Future<Output = Result<Coordinates>> + Send;
}

/// Fetches the current pollutant reading at a location.
pub trait ReadingFetcher {
    fn fetch_current(
        &self,
        city: &str,
        coords: Coordinates,
    ) -> impl Future<Output = Result<PollutantReading>> + Send;
}

/// OpenWeather geocoding + air-pollution client.
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    geo_api_url: String,
    air_api_url: String,
    latency: Arc<LatencyStats>,
}

impl OpenWeatherClient {
    pub fn new(cfg: &Config, latency: Arc<LatencyStats>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: cfg.api_key.clone(),
            geo_api_url: cfg.geo_api_url.clone(),
            air_api_url: cfg.air_api_url.clone(),
            latency,
        })
    }

    /// GET `url` with the API key appended, map non-success statuses, parse the body as JSON.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let started = Instant::now();
        let resp = self
            .client
            .get(url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        self.latency.record(started.elapsed());

        check_status(status, &body)?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl CoordinateResolver for OpenWeatherClient {
    fn resolve(&self, city: &str) -> impl Future<Output = Result<Coordinates>> + Send {
        async move {
            let url = format!("{}/direct", self.geo_api_url);
            let query = [
                ("q", format!("{city},{COUNTRY_CODE}")),
                ("limit", "1".to_string()),
            ];
            let resp = self.get_json(&url, &query).await?;
            let coords = parse_geocode(&resp, city)?;
            debug!(city = %city, lat = coords.lat, lon = coords.lon, "resolved coordinates");
            Ok(coords)
        }
    }
}

impl ReadingFetcher for OpenWeatherClient {
    fn fetch_current(
        &self,
        city: &str,
        coords: Coordinates,
    ) -> impl Future<Output = Result<PollutantReading>> + Send {
        async move {
            let url = format!("{}/air_pollution", self.air_api_url);
            let query = [("lat", coords.lat.to_string()), ("lon", coords.lon.to_string())];
            let resp = self.get_json(&url, &query).await?;
            parse_air_pollution(&resp, city)
        }
    }
}

/// Map an upstream HTTP status onto the error taxonomy.
pub fn check_status(status: u16, body: &str) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        401 => Err(AppError::Unauthorized),
        429 => Err(AppError::RateLimited),
        _ => {
            warn!("upstream returned {status}: {body}");
            Err(AppError::Service {
                status,
                body: body.to_string(),
            })
        }
    }
}

/// Parse `/geo/1.0/direct` output: an array whose first entry carries `lat`/`lon`.
pub fn parse_geocode(v: &serde_json::Value, city: &str) -> Result<Coordinates> {
    let first = v
        .as_array()
        .and_then(|a| a.first())
        .ok_or_else(|| AppError::NotFound(city.to_string()))?;

    let lat = first.get("lat").and_then(as_number);
    let lon = first.get("lon").and_then(as_number);
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Coordinates { lat, lon }),
        _ => Err(AppError::Service {
            status: 200,
            body: format!("geocoding entry for {city} is missing lat/lon"),
        }),
    }
}

/// Parse `/data/2.5/air_pollution` output. Missing components read as 0.
pub fn parse_air_pollution(v: &serde_json::Value, city: &str) -> Result<PollutantReading> {
    let entry = v
        .get("list")
        .and_then(|l| l.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| AppError::Service {
            status: 200,
            body: format!("air pollution response for {city} has no entries"),
        })?;

    let aqi = entry
        .get("main")
        .and_then(|m| m.get("aqi"))
        .and_then(|a| a.as_i64())
        .ok_or_else(|| AppError::Service {
            status: 200,
            body: format!("air pollution response for {city} has no aqi"),
        })?;

    let components = entry.get("components");
    let component = |p: Pollutant| {
        components
            .and_then(|c| c.get(p.component_key()))
            .and_then(as_number)
            .unwrap_or(0.0)
    };

    Ok(PollutantReading {
        city: city.to_string(),
        aqi,
        components: Concentrations {
            pm2_5: component(Pollutant::Pm2_5),
            pm10: component(Pollutant::Pm10),
            no2: component(Pollutant::No2),
            o3: component(Pollutant::O3),
            co: component(Pollutant::Co),
            so2: component(Pollutant::So2),
        },
        captured_at: Utc::now(),
    })
}

fn as_number(v: &serde_json::Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn geocode_takes_first_match() {
        let v = json!([{"name": "Delhi", "lat": 28.6517, "lon": 77.2219, "country": "IN"}]);
        let c = parse_geocode(&v, "Delhi").unwrap();
        assert!((c.lat - 28.6517).abs() < 1e-9);
        assert!((c.lon - 77.2219).abs() < 1e-9);
    }

    #[test]
    fn empty_geocode_is_not_found() {
        match parse_geocode(&json!([]), "Atlantis") {
            Err(AppError::NotFound(city)) => assert_eq!(city, "Atlantis"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn parses_air_pollution_entry() {
        let v = json!({
            "coord": {"lon": 77.2219, "lat": 28.6517},
            "list": [{
                "main": {"aqi": 5},
                "components": {
                    "co": 1762.4, "no": 0.0, "no2": 45.93, "o3": 61.51,
                    "so2": 21.7, "pm2_5": 187.22, "pm10": 241.05, "nh3": 19.51
                },
                "dt": 1700000000
            }]
        });
        let r = parse_air_pollution(&v, "Delhi").unwrap();
        assert_eq!(r.city, "Delhi");
        assert_eq!(r.aqi, 5);
        assert!((r.components.pm2_5 - 187.22).abs() < 1e-9);
        assert!((r.components.co - 1762.4).abs() < 1e-9);
        assert!((r.components.so2 - 21.7).abs() < 1e-9);
    }

    #[test]
    fn missing_components_default_to_zero() {
        let v = json!({"list": [{"main": {"aqi": 2}, "components": {"pm2_5": 12.0}}]});
        let r = parse_air_pollution(&v, "Shimla").unwrap();
        assert_eq!(r.components.pm10, 0.0);
        assert_eq!(r.components.co, 0.0);
        assert!((r.components.pm2_5 - 12.0).abs() < 1e-9);
    }

    #[test]
    fn empty_list_is_service_error() {
        let err = parse_air_pollution(&json!({"list": []}), "Delhi").unwrap_err();
        assert!(matches!(err, AppError::Service { .. }), "{err:?}");
    }

    #[test]
    fn status_mapping() {
        assert!(check_status(200, "").is_ok());
        assert!(matches!(check_status(401, ""), Err(AppError::Unauthorized)));
        assert!(matches!(check_status(429, ""), Err(AppError::RateLimited)));
        match check_status(503, "down") {
            Err(AppError::Service { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "down");
            }
            other => panic!("expected Service, got {other:?}"),
        }
    }
}
