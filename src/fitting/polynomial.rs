use serde::Serialize;

use crate::constants::{MAX_ANGLE_DEG, PIVOT_EPSILON};
use crate::error::{DfError, Result};
use crate::series::SamplePoint;

/// Least-squares polynomial in the normalized angle `u = θ / 180°`
///
/// `rssi(θ) = Σ coefficients[j] · u^j`. Normalizing keeps the normal
/// equations well conditioned at higher degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolynomialParameters {
    /// Coefficients, constant term first
    pub coefficients: Vec<f64>,
}

impl PolynomialParameters {
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn evaluate(&self, angle_deg: f64) -> f64 {
        let u = angle_deg / MAX_ANGLE_DEG;
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * u + c)
    }

    pub(super) fn is_finite(&self) -> bool {
        self.coefficients.iter().all(|c| c.is_finite())
    }
}

/// Solve `AᵀA x = Aᵀb` for the polynomial coefficients
pub(super) fn fit(points: &[SamplePoint], degree: usize) -> Result<PolynomialParameters> {
    let n = degree + 1;
    let mut ata = vec![vec![0.0; n]; n];
    let mut atb = vec![0.0; n];

    for p in points {
        let u = p.angle / MAX_ANGLE_DEG;
        let powers: Vec<f64> = std::iter::successors(Some(1.0), |x| Some(x * u))
            .take(n)
            .collect();
        for i in 0..n {
            atb[i] += powers[i] * p.rssi;
            for j in 0..n {
                ata[i][j] += powers[i] * powers[j];
            }
        }
    }

    let coefficients = solve_linear_system(ata, atb).ok_or_else(|| {
        DfError::DegenerateFit(format!("singular normal equations for degree {}", degree))
    })?;

    Ok(PolynomialParameters { coefficients })
}

/// Gaussian elimination with partial pivoting
///
/// Returns `None` when `a` is not square, sizes disagree, or a pivot falls
/// below [`PIVOT_EPSILON`].
pub fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot_row][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let tail: f64 = (i + 1..n).map(|j| a[i][j] * x[j]).sum();
        x[i] = (b[i] - tail) / a[i][i];
    }
    Some(x)
}
