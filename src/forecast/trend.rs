use chrono::Days;

use super::band::{LOWER_FACTOR, UPPER_FACTOR};
use super::regression::QuadraticFit;
use super::MIN_CONCENTRATION;
use crate::error::{AppError, Result};
use crate::types::{FitSummary, ForecastPoint, ForecastSeries, HistoricalSeries};

/// Extrapolate `horizon_days` points past the end of `history`.
///
/// The regression's independent variable is the point index (0 for the
/// oldest day), not the date. Predictions are floored at
/// [`MIN_CONCENTRATION`] before the ±15% band is attached.
pub fn forecast(history: &HistoricalSeries, horizon_days: usize) -> Result<ForecastSeries> {
    if horizon_days < 1 {
        return Err(AppError::InvalidParameter(
            "horizon_days must be at least 1".to_string(),
        ));
    }

    let fit = QuadraticFit::fit(&history.values())?;
    let n = history.len();
    // fit() guarantees at least three points.
    let last_date = history.last_date().ok_or(AppError::InsufficientData {
        required: super::regression::MIN_POINTS,
        actual: n,
    })?;

    let mut points = Vec::with_capacity(horizon_days);
    for step in 0..horizon_days {
        let date = last_date
            .checked_add_days(Days::new(step as u64 + 1))
            .ok_or_else(|| AppError::InvalidParameter(format!("forecast date past {last_date} out of range")))?;
        let predicted = fit.predict_at((n + step) as f64).max(MIN_CONCENTRATION);
        points.push(ForecastPoint {
            date,
            pm2_5: predicted,
            lower: predicted * LOWER_FACTOR,
            upper: predicted * UPPER_FACTOR,
        });
    }

    Ok(ForecastSeries {
        city: history.city.clone(),
        points,
        fit: FitSummary {
            coefficients: fit.coefficients(),
            r_squared: fit.r_squared(),
            residual_std: fit.residual_std(),
            n_observations: fit.n_observations(),
        },
    })
}
