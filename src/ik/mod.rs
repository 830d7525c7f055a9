//! Inverse kinematics
//!
//! One step per call: estimate the position Jacobian by finite differences,
//! solve the normal equations for a joint update, clamp it and apply it.
//! A degenerate solve never surfaces as an error; a small random update is
//! applied instead.

pub mod jacobian;
pub mod solve;
pub mod solver;

pub use jacobian::{DifferenceScheme, estimate_jacobian};
pub use solve::{DeltaTheta, solve_delta_theta};
pub use solver::{IkConfig, IkSolver, IkStep};
