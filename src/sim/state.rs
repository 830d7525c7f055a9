//! Ball state and table bounds
//!
//! Plain records owned by the simulation's ball list. The engine mutates
//! them in place every sub-step.

use glam::{Vec3, Vec4};
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// A ball on the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Rewritten by friction every sub-step
    pub acceleration: Vec3,
    pub radius: f32,
    /// RGBA, presentation only
    pub color: Vec4,
}

impl Ball {
    pub fn new(id: u32, radius: f32) -> Self {
        Self {
            id,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            radius,
            color: Vec4::ONE,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

/// Planar play area. `left`/`right` bound x, `bottom`/`top` bound z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRect {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for BoundaryRect {
    fn default() -> Self {
        Self::from_half_extents(TABLE_HALF_WIDTH, TABLE_HALF_LENGTH)
    }
}

impl BoundaryRect {
    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Table centered on the origin
    pub fn from_half_extents(half_x: f32, half_z: f32) -> Self {
        Self::new(-half_x, half_x, half_z, -half_z)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn length(&self) -> f32 {
        self.top - self.bottom
    }

    /// Whether a disc at `position` lies fully inside the bounds
    pub fn contains_disc(&self, position: Vec3, radius: f32) -> bool {
        position.x - radius >= self.left
            && position.x + radius <= self.right
            && position.z - radius >= self.bottom
            && position.z + radius <= self.top
    }
}

/// How the initial rack is scattered
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub ball_count: usize,
    pub ball_radius: f32,
    /// Positions are drawn from [0, extent) on x and z
    pub extent: f32,
    /// Velocities are drawn from [0, speed) on x and z
    pub speed: f32,
    /// Height of the ball centers (y)
    pub height: f32,
    pub seed: u64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            ball_count: BALL_COUNT,
            ball_radius: BALL_RADIUS,
            extent: SPAWN_EXTENT,
            speed: SPAWN_SPEED,
            height: SPAWN_HEIGHT,
            seed: 0x5eed,
        }
    }
}

/// Spawn the initial ball list (sorted by id)
pub fn spawn_balls(config: &SpawnConfig) -> Vec<Ball> {
    let mut rng = Pcg32::seed_from_u64(config.seed);

    (0..config.ball_count)
        .map(|i| {
            let color = Vec4::new(rng.random(), rng.random(), rng.random(), 1.0);
            let position = Vec3::new(
                rng.random::<f32>() * config.extent,
                config.height,
                rng.random::<f32>() * config.extent,
            );
            let velocity = Vec3::new(
                rng.random::<f32>() * config.speed,
                0.0,
                rng.random::<f32>() * config.speed,
            );

            Ball {
                color,
                ..Ball::new(i as u32, config.ball_radius)
                    .with_position(position)
                    .with_velocity(velocity)
            }
        })
        .collect()
}
