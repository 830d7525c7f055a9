//! Frame driver
//!
//! Turns variable wall-clock frames into fixed physics sub-steps, then runs
//! one contact pass and at most one IK step per frame.

use glam::DVec3;

use super::collision::PhysicsEngine;
use super::state::{Ball, spawn_balls};
use crate::error::ChainResult;
use crate::ik::{IkSolver, IkStep};
use crate::settings::{FrameConfig, SimConfig};

/// Per-frame requests from the driver
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Step the end effector toward this world position
    pub ik_target: Option<DVec3>,
    /// Step the end effector by this displacement
    pub ik_delta: Option<DVec3>,
}

/// Scripted end-effector motion at constant velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReachMotion {
    pub velocity: DVec3,
    /// Seconds left
    pub remaining: f32,
}

impl ReachMotion {
    pub fn start(velocity: DVec3, duration: f32) -> Self {
        Self {
            velocity,
            remaining: duration.max(0.0),
        }
    }

    /// Displacement covered in `dt`, consuming remaining time
    pub fn advance(&mut self, dt: f32) -> DVec3 {
        let step = dt.max(0.0).min(self.remaining.max(0.0));
        self.remaining -= step;
        self.velocity * step as f64
    }

    pub fn is_finished(&self) -> bool {
        self.remaining <= 0.0
    }
}

/// What a frame did
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub substeps: u32,
    /// Pairs whose velocities were exchanged
    pub contacts: usize,
    pub ik: Option<IkStep>,
}

/// Balls, physics engine and cue arm advanced together
#[derive(Debug, Clone)]
pub struct Simulation {
    balls: Vec<Ball>,
    engine: PhysicsEngine,
    solver: IkSolver,
    timing: FrameConfig,
    accumulator: f32,
    motion: Option<ReachMotion>,
    frame_count: u64,
}

impl Simulation {
    pub fn new(config: &SimConfig) -> ChainResult<Self> {
        let balls = spawn_balls(&config.spawn);
        let engine = PhysicsEngine::new(config.physics.bounds, config.physics.friction_coef);
        let solver = IkSolver::human(&config.rig, config.ik.clone())?;

        log::info!(
            "Simulation ready: {} balls, {} joint angles, seed {}",
            balls.len(),
            solver.theta().len(),
            config.spawn.seed
        );

        Ok(Self {
            balls,
            engine,
            solver,
            timing: config.frame.clone(),
            accumulator: 0.0,
            motion: None,
            frame_count: 0,
        })
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn balls_mut(&mut self) -> &mut Vec<Ball> {
        &mut self.balls
    }

    pub fn engine(&self) -> &PhysicsEngine {
        &self.engine
    }

    pub fn solver(&self) -> &IkSolver {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut IkSolver {
        &mut self.solver
    }

    pub fn motion(&self) -> Option<&ReachMotion> {
        self.motion.as_ref()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn end_effector_position(&mut self) -> DVec3 {
        self.solver.get_end_effector_position()
    }

    /// Begin moving the end effector at `velocity` for `duration` seconds
    pub fn start_reach(&mut self, velocity: DVec3, duration: f32) {
        self.motion = Some(ReachMotion::start(velocity, duration));
    }

    pub fn cancel_reach(&mut self) {
        self.motion = None;
    }

    /// Advance by one rendered frame of `dt` seconds
    pub fn frame(&mut self, dt: f32, input: &TickInput) -> FrameReport {
        let dt = if dt.is_finite() {
            dt.max(0.0).min(self.timing.max_frame_dt)
        } else {
            0.0
        };
        self.accumulator += dt;

        let sim_dt = self.timing.sim_dt;
        let mut substeps = 0;
        while self.accumulator >= sim_dt && substeps < self.timing.max_substeps {
            self.engine.step(&mut self.balls, sim_dt);
            self.accumulator -= sim_dt;
            substeps += 1;
        }
        if substeps == self.timing.max_substeps && self.accumulator >= sim_dt {
            log::debug!("Sub-step cap hit, dropping {:.4}s", self.accumulator);
            self.accumulator = 0.0;
        }

        let contacts = self.engine.collide_balls(&mut self.balls);
        if contacts > 0 {
            log::debug!("Frame {}: {contacts} ball contacts", self.frame_count);
        }

        let ik = self.step_ik(dt, input);
        self.frame_count += 1;

        FrameReport {
            substeps,
            contacts,
            ik,
        }
    }

    fn step_ik(&mut self, dt: f32, input: &TickInput) -> Option<IkStep> {
        if let Some(target) = input.ik_target {
            return Some(self.solver.move_end_effector(target));
        }

        let mut dx = input.ik_delta;
        if let Some(motion) = self.motion.as_mut() {
            dx = Some(dx.unwrap_or_default() + motion.advance(dt));
            if motion.is_finished() {
                self.motion = None;
            }
        }
        dx.map(|dx| self.solver.move_end_effector_relative(dx))
    }
}
