//! Ball simulation module
//!
//! Ball physics is deterministic given a seed:
//! - Fixed sub-step only
//! - Seeded RNG only
//! - Stable iteration order (by ball id)
//! - No rendering or platform dependencies

pub mod collision;
pub mod state;
pub mod tick;

pub use collision::{PhysicsEngine, collide_balls, step_physics};
pub use state::{Ball, BoundaryRect, SpawnConfig, spawn_balls};
pub use tick::{FrameReport, ReachMotion, Simulation, TickInput};
