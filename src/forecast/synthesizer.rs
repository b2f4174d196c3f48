//! Deterministic pseudo-history anchored on one current PM2.5 value.
//!
//! Seeding: the city name's UTF-8 bytes are hashed with 64-bit FNV-1a, the
//! hash is reduced modulo 2³², and the result seeds a `ChaCha8Rng` through
//! `SeedableRng::seed_from_u64`. ChaCha8's output stream is fixed by its
//! algorithm rather than by the platform, so a given city always yields the
//! same series.

use chrono::{Days, NaiveDate};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use super::MIN_CONCENTRATION;
use crate::error::{AppError, Result};
use crate::types::{HistoricalPoint, HistoricalSeries, PollutantReading};

const TREND_START_FACTOR: f64 = 0.8;
const TREND_END_FACTOR: f64 = 1.2;
const SEASONAL_AMPLITUDE: f64 = 20.0;
/// Full sine cycles across the window.
const SEASONAL_CYCLES: f64 = 2.0;
const NOISE_STD: f64 = 15.0;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a.
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// Generator seed for a city, in `0..2^32`.
pub fn city_seed(city: &str) -> u64 {
    fnv1a_64(city.as_bytes()) % (1u64 << 32)
}

/// `i`-th of `n` evenly spaced samples over `[start, stop]`; one sample yields `start`.
fn linspace_at(start: f64, stop: f64, n: usize, i: usize) -> f64 {
    if n <= 1 {
        return start;
    }
    if i == n - 1 {
        return stop;
    }
    start + (stop - start) * i as f64 / (n - 1) as f64
}

/// Build `window_days` points dated `today - window_days ..= today - 1`.
pub fn synthesize(
    city: &str,
    current_value: f64,
    window_days: usize,
    today: NaiveDate,
) -> Result<HistoricalSeries> {
    if window_days == 0 {
        return Err(AppError::InvalidParameter(
            "window_days must be at least 1".to_string(),
        ));
    }
    if !current_value.is_finite() || current_value < 0.0 {
        return Err(AppError::InvalidParameter(format!(
            "current PM2.5 must be a non-negative number, got {current_value}"
        )));
    }

    let seed = city_seed(city);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, NOISE_STD)
        .map_err(|e| AppError::InvalidParameter(format!("noise distribution: {e}")))?;

    let trend_start = current_value * TREND_START_FACTOR;
    let trend_end = current_value * TREND_END_FACTOR;
    let phase_end = SEASONAL_CYCLES * std::f64::consts::TAU;

    let mut points = Vec::with_capacity(window_days);
    for i in 0..window_days {
        let days_back = (window_days - i) as u64;
        let date = today.checked_sub_days(Days::new(days_back)).ok_or_else(|| {
            AppError::InvalidParameter(format!("{days_back} days before {today} is out of range"))
        })?;

        let trend = linspace_at(trend_start, trend_end, window_days, i);
        let seasonal = SEASONAL_AMPLITUDE * linspace_at(0.0, phase_end, window_days, i).sin();
        let value = trend + seasonal + noise.sample(&mut rng);

        points.push(HistoricalPoint {
            date,
            pm2_5: value.max(MIN_CONCENTRATION),
        });
    }

    debug!(
        city = %city,
        seed,
        window_days,
        current_value,
        "synthesized PM2.5 history"
    );

    Ok(HistoricalSeries {
        city: city.to_string(),
        points,
    })
}

/// History for a fetched reading, keyed on its city and PM2.5 value.
pub fn synthesize_for_reading(
    reading: &PollutantReading,
    window_days: usize,
    today: NaiveDate,
) -> Result<HistoricalSeries> {
    synthesize(&reading.city, reading.components.pm2_5, window_days, today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 15).unwrap()
    }

    #[test]
    fn fnv_reference_vectors() {
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63dc4c8601ec8c);
        assert_eq!(fnv1a_64(b"foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn seed_is_reduced_to_32_bits() {
        assert_eq!(city_seed("a"), 0x8601ec8c);
        for city in ["Delhi", "Mumbai", "Bangalore", "Kolkata", "Chennai"] {
            assert!(city_seed(city) < (1u64 << 32), "{city}");
        }
    }

    #[test]
    fn same_inputs_give_identical_series() {
        let a = synthesize("Delhi", 100.0, 30, today()).unwrap();
        let b = synthesize("Delhi", 100.0, 30, today()).unwrap();
        assert_eq!(a, b);
        let bits_a: Vec<u64> = a.points.iter().map(|p| p.pm2_5.to_bits()).collect();
        let bits_b: Vec<u64> = b.points.iter().map(|p| p.pm2_5.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn delhi_golden_values() {
        assert_eq!(city_seed("Delhi"), 1_574_447_165);
        let s = synthesize("Delhi", 100.0, 30, today()).unwrap();
        let expected = [64.10006927429015, 87.119104327634, 96.71500490330868];
        for (p, want) in s.points.iter().zip(expected) {
            assert!((p.pm2_5 - want).abs() < 1e-9, "got {} want {want}", p.pm2_5);
        }
    }

    #[test]
    fn delhi_scenario() {
        let s = synthesize("Delhi", 100.0, 30, today()).unwrap();
        assert_eq!(s.len(), 30);
        assert_eq!(s.city, "Delhi");

        // Seasonal term is zero at both ends; allow four noise sigmas.
        let first = s.points[0].pm2_5;
        let last = s.points[29].pm2_5;
        assert!((first - 80.0).abs() < 4.0 * NOISE_STD, "first={first}");
        assert!((last - 120.0).abs() < 4.0 * NOISE_STD, "last={last}");
        assert!(s.points.iter().all(|p| p.pm2_5 >= MIN_CONCENTRATION));
    }

    #[test]
    fn dates_are_contiguous_and_end_yesterday() {
        let s = synthesize("Mumbai", 60.0, 45, today()).unwrap();
        assert_eq!(s.points[0].date, NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
        assert_eq!(s.last_date(), NaiveDate::from_ymd_opt(2024, 11, 14));
        for pair in s.points.windows(2) {
            assert_eq!(pair[1].date, pair[0].date.succ_opt().unwrap());
        }
    }

    #[test]
    fn different_cities_differ_but_keep_invariants() {
        let delhi = synthesize("Delhi", 100.0, 30, today()).unwrap();
        let mumbai = synthesize("Mumbai", 100.0, 30, today()).unwrap();
        assert_ne!(delhi.values(), mumbai.values());
        for s in [&delhi, &mumbai] {
            assert!(s.points.iter().all(|p| p.pm2_5 >= MIN_CONCENTRATION));
            assert!(s.points.windows(2).all(|w| w[0].date < w[1].date));
            assert_eq!(s.last_date(), today().pred_opt());
        }
    }

    #[test]
    fn zero_reading_is_floored() {
        let s = synthesize("Shillong", 0.0, 60, today()).unwrap();
        assert_eq!(s.len(), 60);
        assert!(s.points.iter().all(|p| p.pm2_5 >= MIN_CONCENTRATION));
    }

    #[test]
    fn single_day_window() {
        let s = synthesize("Pune", 50.0, 1, today()).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.points[0].date, today().pred_opt().unwrap());
        assert!(s.points[0].pm2_5 >= MIN_CONCENTRATION);
    }

    #[test]
    fn history_does_not_depend_on_date() {
        let a = synthesize("Delhi", 100.0, 30, today()).unwrap();
        let b = synthesize("Delhi", 100.0, 30, today().succ_opt().unwrap()).unwrap();
        assert_eq!(a.values(), b.values());
        assert_ne!(a.points[0].date, b.points[0].date);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(
            synthesize("Delhi", 100.0, 0, today()),
            Err(AppError::InvalidParameter(_))
        ));
        assert!(matches!(
            synthesize("Delhi", -1.0, 30, today()),
            Err(AppError::InvalidParameter(_))
        ));
        assert!(matches!(
            synthesize("Delhi", f64::NAN, 30, today()),
            Err(AppError::InvalidParameter(_))
        ));
    }

    #[test]
    fn linspace_matches_endpoints() {
        assert_eq!(linspace_at(80.0, 120.0, 30, 0), 80.0);
        assert_eq!(linspace_at(80.0, 120.0, 30, 29), 120.0);
        assert_eq!(linspace_at(80.0, 120.0, 1, 0), 80.0);
        assert!((linspace_at(0.0, 10.0, 11, 3) - 3.0).abs() < 1e-12);
    }
}
