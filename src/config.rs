use crate::error::{AppError, Result};

pub const GEO_API_URL: &str = "http://api.openweathermap.org/geo/1.0";
pub const AIR_API_URL: &str = "http://api.openweathermap.org/data/2.5";

/// Country code appended to every geocoding query.
pub const COUNTRY_CODE: &str = "IN";

/// Placeholder value shipped in the sample `.env`; treated as missing.
pub const API_KEY_PLACEHOLDER: &str = "your_api_key_here";

pub const DEFAULT_CITIES: &[&str] = &["Delhi", "Mumbai", "Bangalore", "Kolkata", "Chennai"];

/// Historical window bounds (days) accepted at the configuration boundary.
pub mod history_window {
    pub const MIN: usize = 7;
    pub const MAX: usize = 60;
    pub const DEFAULT: usize = 30;
}

/// Forecast horizon bounds (days) accepted at the configuration boundary.
pub mod forecast_horizon {
    pub const MIN: usize = 3;
    pub const MAX: usize = 14;
    pub const DEFAULT: usize = 7;
}

/// Window/horizon pair that has passed boundary validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastSettings {
    history_days: usize,
    forecast_days: usize,
}

impl ForecastSettings {
    pub fn new(history_days: usize, forecast_days: usize) -> Result<Self> {
        if !(history_window::MIN..=history_window::MAX).contains(&history_days) {
            return Err(AppError::InvalidParameter(format!(
                "history_days must be within {}..={}, got {history_days}",
                history_window::MIN,
                history_window::MAX
            )));
        }
        if !(forecast_horizon::MIN..=forecast_horizon::MAX).contains(&forecast_days) {
            return Err(AppError::InvalidParameter(format!(
                "forecast_days must be within {}..={}, got {forecast_days}",
                forecast_horizon::MIN,
                forecast_horizon::MAX
            )));
        }
        Ok(Self {
            history_days,
            forecast_days,
        })
    }

    pub fn history_days(&self) -> usize {
        self.history_days
    }

    pub fn forecast_days(&self) -> usize {
        self.forecast_days
    }

    /// Apply optional per-request overrides, re-validating the result.
    pub fn with_overrides(&self, history_days: Option<usize>, forecast_days: Option<usize>) -> Result<Self> {
        Self::new(
            history_days.unwrap_or(self.history_days),
            forecast_days.unwrap_or(self.forecast_days),
        )
    }
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            history_days: history_window::DEFAULT,
            forecast_days: forecast_horizon::DEFAULT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub geo_api_url: String,
    pub air_api_url: String,
    pub log_level: String,
    pub api_port: u16,
    /// Per-request timeout for upstream calls (HTTP_TIMEOUT_SECS)
    pub http_timeout_secs: u64,
    /// Cities analysed concurrently by /compare (COMPARE_CONCURRENCY); 1 = sequential
    pub compare_concurrency: usize,
    /// Cities used by /compare when none are given (DEFAULT_CITIES, comma-separated)
    pub default_cities: Vec<String>,
    /// Validated HISTORY_DAYS / FORECAST_DAYS
    pub settings: ForecastSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = validate_api_key(std::env::var("OPENWEATHER_API_KEY").ok())?;

        let history_days = parse_var("HISTORY_DAYS", history_window::DEFAULT)?;
        let forecast_days = parse_var("FORECAST_DAYS", forecast_horizon::DEFAULT)?;

        Ok(Self {
            api_key,
            geo_api_url: std::env::var("GEO_API_URL").unwrap_or_else(|_| GEO_API_URL.to_string()),
            air_api_url: std::env::var("AIR_API_URL").unwrap_or_else(|_| AIR_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS", 10)?,
            compare_concurrency: parse_var::<usize>("COMPARE_CONCURRENCY", 1)?.max(1),
            default_cities: std::env::var("DEFAULT_CITIES")
                .map(|s| crate::analysis::parse_city_list(&s))
                .ok()
                .filter(|cities| !cities.is_empty())
                .unwrap_or_else(|| DEFAULT_CITIES.iter().map(|c| c.to_string()).collect()),
            settings: ForecastSettings::new(history_days, forecast_days)
                .map_err(|e| AppError::Config(e.to_string()))?,
        })
    }
}

/// Reject a missing, blank, or still-placeholder key before any request goes out.
fn validate_api_key(raw: Option<String>) -> Result<String> {
    match raw.map(|k| k.trim().to_string()) {
        Some(key) if !key.is_empty() && key != API_KEY_PLACEHOLDER => Ok(key),
        _ => Err(AppError::Config(
            "OPENWEATHER_API_KEY must be set (in the environment or .env)".to_string(),
        )),
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{name} is not a valid value: {raw:?}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = ForecastSettings::default();
        assert_eq!(s.history_days(), 30);
        assert_eq!(s.forecast_days(), 7);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(ForecastSettings::new(7, 3).is_ok());
        assert!(ForecastSettings::new(60, 14).is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(matches!(ForecastSettings::new(6, 7), Err(AppError::InvalidParameter(_))));
        assert!(matches!(ForecastSettings::new(61, 7), Err(AppError::InvalidParameter(_))));
        assert!(matches!(ForecastSettings::new(30, 2), Err(AppError::InvalidParameter(_))));
        assert!(matches!(ForecastSettings::new(30, 15), Err(AppError::InvalidParameter(_))));
    }

    #[test]
    fn overrides_are_revalidated() {
        let base = ForecastSettings::default();
        let s = base.with_overrides(Some(14), None).unwrap();
        assert_eq!(s.history_days(), 14);
        assert_eq!(s.forecast_days(), 7);
        assert!(base.with_overrides(None, Some(0)).is_err());
    }

    #[test]
    fn placeholder_and_blank_keys_are_rejected() {
        assert!(matches!(validate_api_key(None), Err(AppError::Config(_))));
        assert!(matches!(validate_api_key(Some("  ".into())), Err(AppError::Config(_))));
        assert!(matches!(
            validate_api_key(Some(API_KEY_PLACEHOLDER.into())),
            Err(AppError::Config(_))
        ));
        assert_eq!(validate_api_key(Some(" abc123 ".into())).unwrap(), "abc123");
    }
}
