//! Least squares for scatter trendlines.
//!
//! The trendline is an ordinary least squares fit of `y = a + b·x`. We build
//! the `[1, x]` design matrix and solve with SVD, which stays well-behaved
//! for the nearly collinear inputs typical of indicator pairs spanning many
//! orders of magnitude (e.g. GDP per capita).

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Fitted line `y = intercept + slope·x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineFit {
    pub intercept: f64,
    pub slope: f64,
    /// Coefficient of determination on the fitted points.
    pub r_squared: f64,
    pub n: usize,
}

impl LineFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// OLS line through `points`.
///
/// Needs at least two points and non-constant `x`.
pub fn fit_line(points: &[(f64, f64)]) -> Option<LineFit> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let (x_min, x_max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| (lo.min(x), hi.max(x)));
    if !x_min.is_finite() || !x_max.is_finite() || x_max <= x_min {
        return None;
    }

    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { points[i].0 });
    let y = DVector::from_iterator(n, points.iter().map(|&(_, y)| y));
    let beta = solve_least_squares(&design, &y)?;
    let (intercept, slope) = (beta[0], beta[1]);

    let mean_y = y.mean();
    let ss_tot: f64 = y.iter().map(|v| (v - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|&(x, yv)| (yv - (intercept + slope * x)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    } else {
        f64::NAN
    };

    Some(LineFit {
        intercept,
        slope,
        r_squared,
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_recovers_noisy_trend() {
        let points = [(0.0, 1.1), (1.0, 2.9), (2.0, 5.2), (3.0, 6.8)];
        let fit = fit_line(&points).unwrap();
        assert!((fit.slope - 1.94).abs() < 1e-9, "slope {}", fit.slope);
        assert!((fit.intercept - 1.09).abs() < 1e-9, "intercept {}", fit.intercept);
        assert!(fit.r_squared > 0.99 && fit.r_squared <= 1.0);
        assert_eq!(fit.n, 4);
        assert!((fit.predict(10.0) - 20.49).abs() < 1e-8);
    }

    #[test]
    fn fit_line_needs_spread_in_x() {
        assert!(fit_line(&[(1.0, 2.0)]).is_none());
        assert!(fit_line(&[(1.0, 2.0), (1.0, 3.0)]).is_none());
    }
}
