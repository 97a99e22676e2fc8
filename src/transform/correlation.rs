//! Pairwise-complete Pearson correlation across indicator columns.

use crate::domain::{CorrelationMatrix, CrossSection};

/// Minimum number of paired observations for a defined coefficient.
const MIN_PAIRS: usize = 2;

/// Correlate every pair of indicator columns.
///
/// Each pair uses only the rows where both columns are non-null. Pairs with
/// fewer than two observations, or where either side is constant over those
/// observations, are `NaN`. The diagonal is exactly `1.0` whenever the column
/// itself has a defined (non-constant) variance.
pub fn correlation_matrix(table: &CrossSection) -> CorrelationMatrix {
    let columns: Vec<String> = table.indicators().to_vec();
    let data: Vec<Vec<Option<f64>>> = (0..columns.len())
        .map(|idx| table.rows().iter().map(|r| r.value(idx)).collect())
        .collect();

    let n = columns.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&data[i], &data[j]);
            let r = if i == j && r.is_finite() { 1.0 } else { r };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix { columns, values }
}

/// Pearson coefficient over the positions where both inputs are present.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < MIN_PAIRS {
        return f64::NAN;
    }
    // Constant input must stay undefined even when the mean is not representable.
    let (x0, y0) = pairs[0];
    if pairs.iter().all(|&(x, _)| x == x0) || pairs.iter().all(|&(_, y)| y == y0) {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}
