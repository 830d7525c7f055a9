//! Ball integration and collision response
//!
//! Per sub-step, in this order: walls, friction, velocity, position.
//! Ball-ball contacts are resolved once per frame by [`collide_balls`].

use glam::Vec3;

use super::state::{Ball, BoundaryRect};
use crate::consts::FRICTION_COEF;

/// Stateless stepper over a ball list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsEngine {
    pub bounds: BoundaryRect,
    /// Deceleration magnitude opposing each ball's motion
    pub friction_coef: f32,
}

impl Default for PhysicsEngine {
    fn default() -> Self {
        Self::new(BoundaryRect::default(), FRICTION_COEF)
    }
}

impl PhysicsEngine {
    pub fn new(bounds: BoundaryRect, friction_coef: f32) -> Self {
        Self {
            bounds,
            friction_coef,
        }
    }

    /// Run one sub-step: walls, friction, velocity, position
    pub fn step(&self, balls: &mut [Ball], dt: f32) {
        self.collide_walls(balls);
        self.apply_friction(balls);
        self.update_velocity(balls, dt);
        self.update_positions(balls, dt);
    }

    /// Point each ball's acceleration against its velocity.
    /// A ball at rest gets zero acceleration.
    pub fn apply_friction(&self, balls: &mut [Ball]) {
        for ball in balls.iter_mut() {
            ball.acceleration = ball.velocity.normalize_or_zero() * -self.friction_coef;
        }
    }

    /// Semi-implicit Euler velocity update.
    ///
    /// An update that would reverse the direction of travel stops the ball
    /// instead, so friction settles it at rest.
    pub fn update_velocity(&self, balls: &mut [Ball], dt: f32) {
        for ball in balls.iter_mut() {
            let next = ball.velocity + ball.acceleration * dt;
            ball.velocity = if next.dot(ball.velocity) < 0.0 {
                Vec3::ZERO
            } else {
                next
            };
        }
    }

    pub fn update_positions(&self, balls: &mut [Ball], dt: f32) {
        for ball in balls.iter_mut() {
            ball.position += ball.velocity * dt;
        }
    }

    /// Force the velocity inward on any axis where a ball pokes past the bounds.
    /// Only x and z are bounded.
    pub fn collide_walls(&self, balls: &mut [Ball]) {
        let b = &self.bounds;
        for ball in balls.iter_mut() {
            if ball.position.x - ball.radius < b.left {
                ball.velocity.x = ball.velocity.x.abs();
            } else if ball.position.x + ball.radius > b.right {
                ball.velocity.x = -ball.velocity.x.abs();
            }

            if ball.position.z - ball.radius < b.bottom {
                ball.velocity.z = ball.velocity.z.abs();
            } else if ball.position.z + ball.radius > b.top {
                ball.velocity.z = -ball.velocity.z.abs();
            }
        }
    }

    pub fn collide_balls(&self, balls: &mut [Ball]) -> usize {
        collide_balls(balls)
    }
}

/// Advance a ball list by one sub-step without holding an engine
pub fn step_physics(balls: &mut [Ball], bounds: BoundaryRect, friction_coef: f32, dt: f32) {
    PhysicsEngine::new(bounds, friction_coef).step(balls, dt);
}

/// Resolve overlapping, approaching pairs with an equal-mass elastic exchange.
///
/// Returns the number of contacts resolved. Pairs that already separate are
/// skipped so a lingering overlap is not resolved twice.
pub fn collide_balls(balls: &mut [Ball]) -> usize {
    let mut contacts = 0;

    for i in 0..balls.len() {
        let (head, tail) = balls.split_at_mut(i + 1);
        let a = &mut head[i];

        for b in tail.iter_mut() {
            if resolve_pair(a, b) {
                contacts += 1;
            }
        }
    }

    contacts
}

/// Exchange the normal velocity components of two touching balls
fn resolve_pair(a: &mut Ball, b: &mut Ball) -> bool {
    let d_position = a.position - b.position;
    if d_position.length() >= a.radius + b.radius {
        return false;
    }

    let d_velocity = a.velocity - b.velocity;
    if d_velocity.dot(d_position) > 0.0 {
        return false;
    }

    // Coincident centers have no line of centers
    let normal = d_position.normalize_or_zero();
    if normal == Vec3::ZERO {
        return false;
    }

    let a_normal = normal * normal.dot(a.velocity);
    let b_normal = normal * normal.dot(b.velocity);
    let a_tangent = a.velocity - a_normal;
    let b_tangent = b.velocity - b_normal;

    a.velocity = a_tangent + b_normal;
    b.velocity = b_tangent + a_normal;
    true
}
