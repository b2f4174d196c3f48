//! Degree-2 least-squares fit over an integer index.
//!
//! Solves the 3×3 normal equations for `y = c0 + c1·x + c2·x²` with
//! `x = 0, 1, …, n-1`. The index is centered before accumulating the sums so
//! the x⁴ terms stay well scaled for windows up to a few hundred points; the
//! reported coefficients are converted back to the raw index.

use crate::error::{AppError, Result};

/// Minimum samples for a non-degenerate quadratic fit.
pub const MIN_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticFit {
    /// Coefficients against the raw index: `[c0, c1, c2]`.
    coefficients: [f64; 3],
    n_observations: usize,
    r_squared: f64,
    residual_std: f64,
}

impl QuadraticFit {
    pub fn fit(ys: &[f64]) -> Result<Self> {
        let n = ys.len();
        if n < MIN_POINTS {
            return Err(AppError::InsufficientData {
                required: MIN_POINTS,
                actual: n,
            });
        }

        let mean_x = (n - 1) as f64 / 2.0;

        // sums[k] = Σ u^k for k in 0..=4, rhs[k] = Σ u^k·y for k in 0..=2
        let mut sums = [0.0f64; 5];
        let mut rhs = [0.0f64; 3];
        for (i, &y) in ys.iter().enumerate() {
            let u = i as f64 - mean_x;
            let mut p = 1.0;
            for k in 0..5 {
                sums[k] += p;
                if k < 3 {
                    rhs[k] += p * y;
                }
                p *= u;
            }
        }

        let normal = [
            [sums[0], sums[1], sums[2]],
            [sums[1], sums[2], sums[3]],
            [sums[2], sums[3], sums[4]],
        ];
        let [a0, a1, a2] = solve3(normal, rhs)?;

        // Expand a0 + a1·(x - m) + a2·(x - m)² into raw-index coefficients.
        let coefficients = [
            a0 - a1 * mean_x + a2 * mean_x * mean_x,
            a1 - 2.0 * a2 * mean_x,
            a2,
        ];

        let mut fit = Self {
            coefficients,
            n_observations: n,
            r_squared: 0.0,
            residual_std: 0.0,
        };

        let mean_y = ys.iter().sum::<f64>() / n as f64;
        let ss_tot: f64 = ys.iter().map(|&y| (y - mean_y).powi(2)).sum();
        let ss_res: f64 = ys
            .iter()
            .enumerate()
            .map(|(i, &y)| (y - fit.predict_at(i as f64)).powi(2))
            .sum();

        fit.r_squared = if ss_tot > 1e-10 { 1.0 - ss_res / ss_tot } else { 1.0 };
        fit.residual_std = (ss_res / n as f64).sqrt();
        Ok(fit)
    }

    pub fn predict_at(&self, x: f64) -> f64 {
        let [c0, c1, c2] = self.coefficients;
        c0 + c1 * x + c2 * x * x
    }

    pub fn coefficients(&self) -> [f64; 3] {
        self.coefficients
    }

    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }

    pub fn residual_std(&self) -> f64 {
        self.residual_std
    }
}

/// Gaussian elimination with partial pivoting.
fn solve3(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Result<[f64; 3]> {
    for col in 0..3 {
        let pivot_row = (col..3)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() < f64::EPSILON {
            return Err(AppError::InvalidParameter(
                "singular normal equations in quadratic fit".to_string(),
            ));
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in col + 1..3 {
            let factor = a[row][col] / a[col][col];
            for k in col..3 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0f64; 3];
    for row in (0..3).rev() {
        let tail: f64 = (row + 1..3).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() < tol,
            "expected {expected}, got {actual} (tol {tol})"
        );
    }

    #[test]
    fn recovers_exact_quadratic() {
        let ys: Vec<f64> = (0..12).map(|i| 4.0 - 1.5 * i as f64 + 0.25 * (i * i) as f64).collect();
        let fit = QuadraticFit::fit(&ys).unwrap();
        let [c0, c1, c2] = fit.coefficients();
        assert_close(c0, 4.0, 1e-8);
        assert_close(c1, -1.5, 1e-8);
        assert_close(c2, 0.25, 1e-9);
        assert_close(fit.r_squared(), 1.0, 1e-9);
        assert_close(fit.residual_std(), 0.0, 1e-8);
    }

    #[test]
    fn linear_data_has_zero_curvature() {
        let ys: Vec<f64> = (0..10).map(|i| 50.0 + 3.0 * i as f64).collect();
        let fit = QuadraticFit::fit(&ys).unwrap();
        assert_close(fit.coefficients()[2], 0.0, 1e-10);
        assert_close(fit.predict_at(14.0), 92.0, 1e-8);
    }

    #[test]
    fn three_points_interpolate_exactly() {
        let fit = QuadraticFit::fit(&[1.0, 7.0, 2.0]).unwrap();
        assert_close(fit.predict_at(0.0), 1.0, 1e-10);
        assert_close(fit.predict_at(1.0), 7.0, 1e-10);
        assert_close(fit.predict_at(2.0), 2.0, 1e-10);
        assert_eq!(fit.n_observations(), 3);
    }

    #[test]
    fn constant_series_reports_perfect_fit() {
        let fit = QuadraticFit::fit(&[10.0; 8]).unwrap();
        assert_close(fit.predict_at(20.0), 10.0, 1e-8);
        assert_close(fit.r_squared(), 1.0, 1e-12);
    }

    #[test]
    fn fewer_than_three_points_rejected() {
        for ys in [&[][..], &[1.0][..], &[1.0, 2.0][..]] {
            match QuadraticFit::fit(ys) {
                Err(AppError::InsufficientData { required, actual }) => {
                    assert_eq!(required, 3);
                    assert_eq!(actual, ys.len());
                }
                other => panic!("expected InsufficientData, got {other:?}"),
            }
        }
    }

    #[test]
    fn long_window_stays_accurate() {
        let ys: Vec<f64> = (0..60).map(|i| 30.0 + 0.8 * i as f64 - 0.01 * (i * i) as f64).collect();
        let fit = QuadraticFit::fit(&ys).unwrap();
        let x = 66.0;
        assert_close(fit.predict_at(x), 30.0 + 0.8 * x - 0.01 * x * x, 1e-6);
    }
}
