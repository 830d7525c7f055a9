//! Billiards IK - pool table ball physics and an IK-driven cue arm
//!
//! Core modules:
//! - `sim`: Ball physics (friction, walls, elastic contacts) and the frame driver
//! - `kinematics`: Arena-backed joint tree with pure forward kinematics
//! - `ik`: Numerical-Jacobian IK solver steering an end effector
//! - `settings`: Data-driven configuration loaded from JSON
//! - `error`: Construction and configuration errors

pub mod error;
pub mod ik;
pub mod kinematics;
pub mod settings;
pub mod sim;

pub use error::{ChainError, ConfigError};
pub use ik::{DifferenceScheme, IkConfig, IkSolver, IkStep};
pub use kinematics::{ArcId, KinematicChain, NodeId, Pose, ThetaLayout};
pub use settings::SimConfig;
pub use sim::{Ball, BoundaryRect, PhysicsEngine, Simulation, TickInput};

/// Simulation constants (defaults for [`SimConfig`])
pub mod consts {
    /// Fixed physics sub-step (1 kHz)
    pub const SIM_DT: f32 = 1.0 / 1000.0;
    /// Longest frame the driver will integrate; slower frames are clamped
    pub const MAX_FRAME_DT: f32 = 1.0 / 60.0;
    /// Maximum sub-steps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 32;

    /// Table half extents (x, z)
    pub const TABLE_HALF_WIDTH: f32 = 4.0;
    pub const TABLE_HALF_LENGTH: f32 = 6.0;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 0.2;
    pub const BALL_COUNT: usize = 9;
    /// Deceleration magnitude from table friction (units/s²)
    pub const FRICTION_COEF: f32 = 2.0;
    /// Spawn square side and max initial speed per axis
    pub const SPAWN_EXTENT: f32 = 3.0;
    pub const SPAWN_SPEED: f32 = 6.0;
    pub const SPAWN_HEIGHT: f32 = -1.0;

    /// Largest per-joint change applied by one IK step (radians)
    pub const MAX_JOINT_STEP: f64 = 0.05;
    /// Finite-difference step for the Jacobian estimate
    pub const JACOBIAN_EPSILON: f64 = 1e-6;
    /// Half-width of the random joint update used when the solve degenerates
    pub const FALLBACK_PERTURBATION: f64 = 0.01;
    /// Scale of the nudge given to exactly-zero joint updates
    pub const ZERO_STEP_NUDGE: f64 = 1e-8;
    /// Relative singular value cutoff for the least-squares solve
    pub const SINGULAR_TOLERANCE: f64 = 1e-9;
}

/// Wrap an angle into (-2π, 2π), preserving its orientation
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    angle % std::f64::consts::TAU
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn test_wrap_angle_keeps_small_angles() {
        assert_eq!(wrap_angle(0.3), 0.3);
        assert_eq!(wrap_angle(-1.2), -1.2);
    }

    #[test]
    fn test_wrap_angle_bounds() {
        for angle in [TAU, 3.0 * PI, -7.5 * PI, 100.0, -100.0] {
            let wrapped = wrap_angle(angle);
            assert!(wrapped > -TAU && wrapped < TAU, "{angle} -> {wrapped}");
            // Same orientation
            assert!((wrapped.sin() - angle.sin()).abs() < 1e-9);
            assert!((wrapped.cos() - angle.cos()).abs() < 1e-9);
        }
    }
}
