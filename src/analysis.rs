use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aqi::{category_of, color_of};
use crate::config::ForecastSettings;
use crate::error::Result;
use crate::fetcher::{CoordinateResolver, ReadingFetcher};
use crate::forecast::{forecast, synthesize_for_reading};
use crate::types::{Coordinates, ForecastSeries, HistoricalSeries, PollutantReading};

/// A reading together with the history synthesized from it and the forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingForecast {
    pub reading: PollutantReading,
    pub history: HistoricalSeries,
    pub forecast: ForecastSeries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityAnalysis {
    pub city: String,
    pub coordinates: Coordinates,
    pub category: String,
    pub color: String,
    pub reading: PollutantReading,
    pub history: HistoricalSeries,
    pub forecast: ForecastSeries,
}

/// One row of a multi-city comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitySummary {
    pub aqi: i64,
    pub category: String,
    pub color: String,
    pub reading: PollutantReading,
    /// PM2.5 predicted for the last day of the horizon.
    pub forecast_end_pm2_5: Option<f64>,
}

/// Either a summary or the message of the failure for this city.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityOutcome {
    pub city: String,
    pub summary: Option<CitySummary>,
    pub error: Option<String>,
    /// Whether the failure came from the geocoding / air-pollution services.
    #[serde(skip)]
    pub upstream: bool,
}

/// Synthesize and forecast from a reading, or pass an upstream failure through unchanged.
pub fn analyze_reading(
    reading: Result<PollutantReading>,
    settings: ForecastSettings,
    today: NaiveDate,
) -> Result<ReadingForecast> {
    let reading = reading?;
    let history = synthesize_for_reading(&reading, settings.history_days(), today)?;
    let forecast = forecast(&history, settings.forecast_days())?;
    Ok(ReadingForecast {
        reading,
        history,
        forecast,
    })
}

pub async fn analyze_city<R, F>(
    resolver: &R,
    fetcher: &F,
    city: &str,
    settings: ForecastSettings,
    today: NaiveDate,
) -> Result<CityAnalysis>
where
    R: CoordinateResolver,
    F: ReadingFetcher,
{
    let coordinates = resolver.resolve(city).await?;
    let reading = fetcher.fetch_current(city, coordinates).await;
    let ReadingForecast {
        reading,
        history,
        forecast,
    } = analyze_reading(reading, settings, today)?;

    info!(
        event = "CITY_ANALYZED",
        city = %city,
        aqi = reading.aqi,
        pm2_5 = reading.components.pm2_5,
        history_days = history.len(),
        forecast_days = forecast.len(),
        r_squared = forecast.fit.r_squared,
        "{city} | AQI {} ({}) | PM2.5 {:.1}",
        reading.aqi,
        category_of(reading.aqi),
        reading.components.pm2_5,
    );

    Ok(CityAnalysis {
        city: city.to_string(),
        coordinates,
        category: category_of(reading.aqi).to_string(),
        color: color_of(reading.aqi).to_string(),
        reading,
        history,
        forecast,
    })
}

/// Analyse each city, `concurrency` at a time, returning outcomes in input order.
/// A failure for one city is recorded against it and does not stop the others.
pub async fn compare_cities<R, F>(
    resolver: &R,
    fetcher: &F,
    cities: &[String],
    settings: ForecastSettings,
    today: NaiveDate,
    concurrency: usize,
) -> Vec<CityOutcome>
where
    R: CoordinateResolver + Sync,
    F: ReadingFetcher + Sync,
{
    let total = cities.len();
    stream::iter(cities.iter().cloned().enumerate())
        .map(move |(i, city)| async move {
            let result = analyze_city(resolver, fetcher, &city, settings, today).await;
            info!("[COMPARE] {}/{} {}", i + 1, total, city);
            match result {
                Ok(a) => CityOutcome {
                    summary: Some(CitySummary {
                        aqi: a.reading.aqi,
                        category: a.category,
                        color: a.color,
                        forecast_end_pm2_5: a.forecast.points.last().map(|p| p.pm2_5),
                        reading: a.reading,
                    }),
                    city,
                    error: None,
                    upstream: false,
                },
                Err(e) => {
                    warn!(city = %city, "[COMPARE] {city} failed: {e}");
                    CityOutcome {
                        city,
                        summary: None,
                        error: Some(e.to_string()),
                        upstream: e.is_upstream(),
                    }
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Split a user-supplied city list on newlines or commas, dropping blanks.
pub fn parse_city_list(text: &str) -> Vec<String> {
    text.split(['\n', ','])
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}
