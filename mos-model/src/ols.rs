//! Ordinary least squares with intercept, and the R² score.

/// Coefficients, intercept and in-sample R² of a least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub r_squared: f64,
}

const SINGULAR_EPS: f64 = 1e-10;

/// Coefficient of determination of `predicted` against `actual`.
///
/// A constant `actual` scores 1.0 when predicted exactly, 0.0 otherwise.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Solve `a x = b` in place by Gaussian elimination with partial pivoting.
///
/// `None` when the system is (numerically) singular.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return None;
    }
    for k in 0..n {
        let pivot = (k..n).max_by(|&i, &j| a[i][k].abs().total_cmp(&a[j][k].abs()))?;
        if a[pivot][k].abs() <= SINGULAR_EPS * scale {
            return None;
        }
        a.swap(k, pivot);
        b.swap(k, pivot);
        for i in (k + 1)..n {
            let factor = a[i][k] / a[k][k];
            if factor == 0.0 {
                continue;
            }
            for j in k..n {
                a[i][j] -= factor * a[k][j];
            }
            b[i] -= factor * b[k];
        }
    }
    let mut x = vec![0.0; n];
    for k in (0..n).rev() {
        let tail: f64 = ((k + 1)..n).map(|j| a[k][j] * x[j]).sum();
        x[k] = (b[k] - tail) / a[k][k];
    }
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Fit `y ≈ intercept + Σ coefficients[j] · columns[j]` by least squares.
///
/// Works on mean-centred normal equations. `None` for empty input, a
/// column/row length mismatch, or collinear predictors.
pub fn fit(columns: &[&[f64]], y: &[f64]) -> Option<OlsFit> {
    let n = y.len();
    let p = columns.len();
    if n == 0 || p == 0 || columns.iter().any(|c| c.len() != n) {
        return None;
    }
    let nf = n as f64;
    let y_mean = y.iter().sum::<f64>() / nf;
    let means: Vec<f64> = columns.iter().map(|c| c.iter().sum::<f64>() / nf).collect();

    let mut xtx = vec![vec![0.0; p]; p];
    let mut xty = vec![0.0; p];
    for r in 0..n {
        let dy = y[r] - y_mean;
        for i in 0..p {
            let di = columns[i][r] - means[i];
            xty[i] += di * dy;
            for j in i..p {
                xtx[i][j] += di * (columns[j][r] - means[j]);
            }
        }
    }
    for i in 0..p {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    let coefficients = solve(xtx, xty)?;
    let intercept = y_mean
        - coefficients
            .iter()
            .zip(&means)
            .map(|(b, m)| b * m)
            .sum::<f64>();
    let predicted: Vec<f64> = (0..n)
        .map(|r| {
            intercept
                + coefficients
                    .iter()
                    .zip(columns)
                    .map(|(b, c)| b * c[r])
                    .sum::<f64>()
        })
        .collect();
    let r_squared = r_squared(y, &predicted);
    Some(OlsFit {
        coefficients,
        intercept,
        r_squared,
    })
}
