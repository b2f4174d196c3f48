use ratatui::style::Color;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror analysis.rs / routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct Concentrations {
    pub pm2_5: f64,
    pub pm10: f64,
    pub no2: f64,
    pub o3: f64,
    pub co: f64,
    pub so2: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct Reading {
    pub city: String,
    pub aqi: i64,
    pub components: Concentrations,
    pub captured_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CitySummary {
    pub aqi: i64,
    pub category: String,
    pub color: String,
    pub reading: Reading,
    pub forecast_end_pm2_5: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CityOutcome {
    pub city: String,
    pub summary: Option<CitySummary>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CompareResponse {
    pub history_days: usize,
    pub forecast_days: usize,
    pub cities: Vec<CityOutcome>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalPoint {
    pub date: String,
    pub pm2_5: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalSeries {
    pub points: Vec<HistoricalPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastPoint {
    pub date: String,
    pub pm2_5: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FitSummary {
    pub r_squared: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastSeries {
    pub points: Vec<ForecastPoint>,
    pub fit: FitSummary,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct CityAnalysis {
    pub city: String,
    pub category: String,
    pub color: String,
    pub reading: Reading,
    pub history: HistoricalSeries,
    pub forecast: ForecastSeries,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error: String,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

/// Detail pane for the selected city (from GET /cities/:name).
#[derive(Debug, Clone, Default)]
pub enum DetailState {
    #[default]
    Empty,
    Loaded(Box<CityAnalysis>),
    Failed { city: String, message: String },
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub comparison: CompareResponse,
    pub detail: DetailState,
    pub cities: Vec<String>,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String, cities: Vec<String>) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            comparison: CompareResponse::default(),
            detail: DetailState::Empty,
            cities,
            base_url,
        }
    }

    /// Re-run the multi-city comparison.
    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let url = format!("{}/compare", self.base_url);
        let cities = self.cities.join(",");
        let resp = client.get(&url).query(&[("cities", cities.as_str())]).send().await;

        match resp {
            Ok(r) if r.status().is_success() => match r.json::<CompareResponse>().await {
                Ok(c) => {
                    self.comparison = c;
                    self.status = ConnectionStatus::Connected;
                }
                Err(e) => self.status = ConnectionStatus::Error(format!("parse error: {e}")),
            },
            Ok(r) => {
                let status = r.status();
                let message = r
                    .json::<ErrorBody>()
                    .await
                    .map(|b| b.error)
                    .unwrap_or_else(|_| status.to_string());
                self.status = ConnectionStatus::Error(message);
            }
            Err(e) => self.status = ConnectionStatus::Error(format!("{e}")),
        }
    }

    /// Load the full history/forecast for one city into the detail pane.
    pub async fn load_detail(&mut self, client: &reqwest::Client, city: &str) {
        let Some(url) = city_url(&self.base_url, city) else {
            self.detail = DetailState::Failed {
                city: city.to_string(),
                message: format!("invalid API_URL: {}", self.base_url),
            };
            return;
        };
        self.detail = match client.get(url).send().await {
            Ok(r) if r.status().is_success() => match r.json::<CityAnalysis>().await {
                Ok(a) => DetailState::Loaded(Box::new(a)),
                Err(e) => DetailState::Failed {
                    city: city.to_string(),
                    message: format!("parse error: {e}"),
                },
            },
            Ok(r) => {
                let status = r.status();
                let message = r
                    .json::<ErrorBody>()
                    .await
                    .map(|b| b.error)
                    .unwrap_or_else(|_| status.to_string());
                DetailState::Failed {
                    city: city.to_string(),
                    message,
                }
            }
            Err(e) => DetailState::Failed {
                city: city.to_string(),
                message: format!("{e}"),
            },
        };
    }

    pub fn city_at(&self, index: usize) -> Option<&str> {
        self.comparison.cities.get(index).map(|c| c.city.as_str())
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Pollutant rows for display. CO is shown in mg/m³, everything else in µg/m³.
pub fn pollutant_rows(c: &Concentrations) -> Vec<(&'static str, String, &'static str)> {
    vec![
        ("PM2.5", format!("{:.1}", c.pm2_5), "µg/m³"),
        ("PM10", format!("{:.1}", c.pm10), "µg/m³"),
        ("NO₂", format!("{:.1}", c.no2), "µg/m³"),
        ("O₃", format!("{:.1}", c.o3), "µg/m³"),
        ("CO", format!("{:.2}", c.co / 1000.0), "mg/m³"),
        ("SO₂", format!("{:.1}", c.so2), "µg/m³"),
    ]
}

/// `{base}/cities/{city}` with the city name percent-encoded as one path segment.
pub fn city_url(base: &str, city: &str) -> Option<reqwest::Url> {
    let mut url = reqwest::Url::parse(base).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push("cities").push(city);
    Some(url)
}

/// `#RRGGBB` → terminal color; anything else renders gray.
pub fn parse_hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 {
        return Color::Gray;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Gray,
    }
}

/// `2024-11-15` → `11-15`.
pub fn short_date(date: &str) -> &str {
    date.get(5..).unwrap_or(date)
}

pub fn format_pm(v: Option<f64>) -> String {
    v.map_or("—".to_string(), |v| format!("{v:.1}"))
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

fn main() {
    // Shared with src/bin/tui.rs; the entry point lives there.
}
