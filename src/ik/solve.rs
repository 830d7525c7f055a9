//! Least-squares joint update from a Jacobian
//!
//! Solves the normal equations (JᵗJ)·Δθ = Jᵗ·dx. JᵗJ is rank deficient
//! whenever there are more joints than position components, so the system is
//! solved through an SVD with singular values below a relative cutoff
//! dropped, which yields the minimum-norm solution.

use glam::DVec3;
use nalgebra::{DMatrix, DVector};

/// Outcome of a joint-update solve
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaTheta {
    /// Least-squares joint update
    Solved(DVector<f64>),
    /// JᵗJ carries no usable information (zero, empty or non-finite)
    Degenerate,
}

impl DeltaTheta {
    pub fn is_degenerate(&self) -> bool {
        matches!(self, DeltaTheta::Degenerate)
    }
}

/// Solve for the joint update that moves the effector by `dx`
pub fn solve_delta_theta(jacobian: &DMatrix<f64>, dx: DVec3, tolerance: f64) -> DeltaTheta {
    if jacobian.ncols() == 0 || jacobian.iter().any(|v| !v.is_finite()) {
        return DeltaTheta::Degenerate;
    }

    let dx = DVector::from_column_slice(&dx.to_array());
    let jt = jacobian.transpose();
    let normal = &jt * jacobian;
    let rhs = &jt * dx;

    let svd = normal.svd(true, true);
    let largest = svd.singular_values.max();
    if largest <= f64::EPSILON {
        return DeltaTheta::Degenerate;
    }

    match svd.solve(&rhs, largest * tolerance) {
        Ok(delta) if delta.iter().all(|v| v.is_finite()) => DeltaTheta::Solved(delta),
        _ => DeltaTheta::Degenerate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SINGULAR_TOLERANCE;

    #[test]
    fn test_zero_jacobian_is_degenerate() {
        let j = DMatrix::zeros(3, 7);
        let result = solve_delta_theta(&j, DVec3::new(0.1, 0.2, 0.3), SINGULAR_TOLERANCE);
        assert!(result.is_degenerate());
    }

    #[test]
    fn test_empty_and_nan_are_degenerate() {
        let empty = DMatrix::<f64>::zeros(3, 0);
        assert!(solve_delta_theta(&empty, DVec3::X, SINGULAR_TOLERANCE).is_degenerate());

        let mut nan = DMatrix::<f64>::identity(3, 3);
        nan[(1, 1)] = f64::NAN;
        assert!(solve_delta_theta(&nan, DVec3::X, SINGULAR_TOLERANCE).is_degenerate());
    }

    #[test]
    fn test_square_full_rank_solves_exactly() {
        let j = DMatrix::from_row_slice(3, 3, &[2.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 4.0]);
        let dx = DVec3::new(1.0, 2.0, 8.0);
        let DeltaTheta::Solved(delta) = solve_delta_theta(&j, dx, SINGULAR_TOLERANCE) else {
            panic!("full rank system should solve");
        };
        let reached = &j * &delta;
        assert!((reached[0] - 1.0).abs() < 1e-9);
        assert!((reached[1] - 2.0).abs() < 1e-9);
        assert!((reached[2] - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_redundant_jacobian_reaches_dx() {
        // 3×7, rank 3: JᵗJ is singular but the min-norm update still hits dx
        let j = DMatrix::from_fn(3, 7, |r, c| ((r * 7 + c) as f64 * 0.37).sin());
        let dx = DVec3::new(0.05, -0.02, 0.01);
        let DeltaTheta::Solved(delta) = solve_delta_theta(&j, dx, SINGULAR_TOLERANCE) else {
            panic!("rank-3 system should solve");
        };
        let reached = &j * &delta;
        assert!((reached[0] - dx.x).abs() < 1e-6);
        assert!((reached[1] - dx.y).abs() < 1e-6);
        assert!((reached[2] - dx.z).abs() < 1e-6);
    }

    #[test]
    fn test_rank_one_is_finite() {
        let mut j = DMatrix::zeros(3, 4);
        j[(0, 2)] = 1.5;
        let dx = DVec3::new(0.3, 1.0, 1.0);
        let DeltaTheta::Solved(delta) = solve_delta_theta(&j, dx, SINGULAR_TOLERANCE) else {
            panic!("rank-1 system should solve");
        };
        assert!((delta[2] - 0.2).abs() < 1e-9);
        assert!(delta[0].abs() < 1e-12 && delta[1].abs() < 1e-12 && delta[3].abs() < 1e-12);
    }
}
