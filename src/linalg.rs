//! Dense linear system solving for the small fixed-size systems of the solver.

use crate::constants::PIVOT_EPSILON;
use nalgebra::{Matrix6, SMatrix, SVector, Vector6};

/// Solve `A x = b` by Gaussian elimination with partial pivoting
///
/// Returns `None` when a pivot magnitude drops below `1e-10` after row
/// exchange, or is NaN. Single pass, no iterative refinement.
#[must_use]
pub fn solve_linear_system<const N: usize>(
    a: &SMatrix<f64, N, N>,
    b: &SVector<f64, N>,
) -> Option<SVector<f64, N>> {
    let mut a = *a;
    let mut b = *b;

    for col in 0..N {
        // Largest magnitude in the current column, at or below the diagonal
        let mut pivot_row = col;
        let mut pivot_value = a[(col, col)].abs();
        for row in (col + 1)..N {
            let value = a[(row, col)].abs();
            if value > pivot_value {
                pivot_row = row;
                pivot_value = value;
            }
        }

        if pivot_value.is_nan() || pivot_value < PIVOT_EPSILON {
            return None;
        }

        if pivot_row != col {
            a.swap_rows(col, pivot_row);
            b.swap_rows(col, pivot_row);
        }

        for row in (col + 1)..N {
            let factor = a[(row, col)] / a[(col, col)];
            if factor == 0.0 {
                continue;
            }
            for k in col..N {
                a[(row, k)] -= factor * a[(col, k)];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = SVector::<f64, N>::zeros();
    for row in (0..N).rev() {
        let tail: f64 = ((row + 1)..N).map(|k| a[(row, k)] * x[k]).sum();
        x[row] = (b[row] - tail) / a[(row, row)];
    }

    Some(x)
}

/// Solve the 6x6 normal equations of one refinement step
#[must_use]
pub fn solve_6x6(a: &Matrix6<f64>, b: &Vector6<f64>) -> Option<Vector6<f64>> {
    solve_linear_system(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix3, Vector3};

    #[test]
    fn test_identity_system() {
        let b = Vector6::new(1.0, -2.0, 3.0, -4.0, 5.0, -6.0);
        let x = solve_6x6(&Matrix6::identity(), &b).unwrap();
        assert_eq!(x, b);
    }

    #[test]
    fn test_requires_pivoting() {
        // Zero on the leading diagonal entry forces a row exchange
        let a = Matrix3::new(0.0, 2.0, 1.0, 1.0, 1.0, 0.0, 3.0, 0.0, 1.0);
        let expected = Vector3::new(1.0, 2.0, 3.0);
        let b = a * expected;
        let x = solve_linear_system(&a, &b).unwrap();
        assert_abs_diff_eq!(x, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_zero_row() {
        let mut a = Matrix6::identity();
        a.set_row(4, &nalgebra::RowVector6::zeros());
        assert!(solve_6x6(&a, &Vector6::repeat(1.0)).is_none());
    }

    #[test]
    fn test_singular_duplicate_rows() {
        let a = Matrix3::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 1.0, 1.0);
        assert!(solve_linear_system(&a, &Vector3::new(1.0, 2.0, 3.0)).is_none());
    }

    #[test]
    fn test_tiny_pivot_is_singular() {
        let a = Matrix6::identity() * 1e-11;
        assert!(solve_6x6(&a, &Vector6::repeat(1.0)).is_none());
    }

    #[test]
    fn test_nan_pivot_is_singular() {
        let mut a = Matrix6::identity();
        a[(0, 0)] = f64::NAN;
        assert!(solve_6x6(&a, &Vector6::repeat(1.0)).is_none());

        // NaN below the diagonal poisons its row during elimination
        let mut a = Matrix6::identity();
        a[(3, 0)] = f64::NAN;
        assert!(solve_6x6(&a, &Vector6::repeat(1.0)).is_none());
    }
}
