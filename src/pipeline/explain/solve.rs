//! Weighted least squares for the attribution fit
//!
//! Solves `argmin_phi sum_i w_i * (y_i - A_i . phi)^2` through the normal
//! equations with Gaussian elimination. Sizes here are small (one side of
//! the system is the feature width minus one), so a dense direct solve is
//! enough.

use ndarray::Array2;

use crate::error::PipelineError;

/// Tiny diagonal ridge: repeated sampled coalitions can make the normal
/// matrix rank-deficient.
const RIDGE: f64 = 1e-8;

pub fn weighted_least_squares(
    a: &Array2<f64>,
    y: &[f64],
    w: &[f64],
) -> Result<Vec<f64>, PipelineError> {
    let rows = a.nrows();
    let cols = a.ncols();
    debug_assert_eq!(rows, y.len());
    debug_assert_eq!(rows, w.len());

    if rows < cols {
        return Err(PipelineError::Explanation(format!(
            "underdetermined attribution system: {rows} coalitions for {cols} unknowns"
        )));
    }

    // Normal equations: (A^T W A) phi = A^T W y
    let mut ata = vec![vec![0.0f64; cols]; cols];
    let mut atb = vec![0.0f64; cols];

    for i in 0..rows {
        let wi = w[i];
        for j in 0..cols {
            let aij = a[[i, j]];
            if aij == 0.0 {
                continue;
            }
            atb[j] += wi * aij * y[i];
            for l in j..cols {
                ata[j][l] += wi * aij * a[[i, l]];
            }
        }
    }
    // Mirror the upper triangle
    for j in 0..cols {
        ata[j][j] += RIDGE;
        for l in 0..j {
            ata[j][l] = ata[l][j];
        }
    }

    solve_dense(&mut ata, &mut atb)
}

/// In-place Gaussian elimination with partial pivoting
fn solve_dense(m: &mut [Vec<f64>], b: &mut [f64]) -> Result<Vec<f64>, PipelineError> {
    let n = b.len();

    for col in 0..n {
        // Pivot selection
        let mut pivot = col;
        for row in (col + 1)..n {
            if m[row][col].abs() > m[pivot][col].abs() {
                pivot = row;
            }
        }
        if m[pivot][col].abs() < 1e-12 {
            return Err(PipelineError::Explanation(
                "attribution system is singular".to_string(),
            ));
        }
        m.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[row][k] -= factor * m[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution
    let mut x = vec![0.0f64; n];
    for col in (0..n).rev() {
        let mut sum = b[col];
        for k in (col + 1)..n {
            sum -= m[col][k] * x[k];
        }
        x[col] = sum / m[col][col];
    }

    Ok(x)
}
