use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

// ---------------------------------------------------------------------------
// Current reading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pollutant {
    Pm2_5,
    Pm10,
    No2,
    O3,
    Co,
    So2,
}

impl Pollutant {
    /// Key used in the upstream `components` object.
    pub fn component_key(&self) -> &'static str {
        match self {
            Pollutant::Pm2_5 => "pm2_5",
            Pollutant::Pm10 => "pm10",
            Pollutant::No2 => "no2",
            Pollutant::O3 => "o3",
            Pollutant::Co => "co",
            Pollutant::So2 => "so2",
        }
    }
}

/// Concentrations in µg/m³.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Concentrations {
    pub pm2_5: f64,
    pub pm10: f64,
    pub no2: f64,
    pub o3: f64,
    pub co: f64,
    pub so2: f64,
}

/// One real observation for a city. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantReading {
    pub city: String,
    /// 1 (Good) ..= 5 (Very Poor)
    pub aqi: i64,
    pub components: Concentrations,
    pub captured_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Synthetic history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub pm2_5: f64,
}

/// PM2.5 history for one city, oldest first, ending yesterday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub city: String,
    pub points: Vec<HistoricalPoint>,
}

impl HistoricalSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.pm2_5).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

// ---------------------------------------------------------------------------
// Forecast
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub pm2_5: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Quadratic trend `y = c0 + c1·x + c2·x²` fitted over the history index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub coefficients: [f64; 3],
    pub r_squared: f64,
    /// Standard deviation of in-sample residuals.
    pub residual_std: f64,
    pub n_observations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub city: String,
    pub points: Vec<ForecastPoint>,
    pub fit: FitSummary,
}

impl ForecastSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }
}
