//! Stateful IK solver driving one end effector
//!
//! Holds the chain, the theta vector and the random source. Each motion call
//! performs exactly one Jacobian-estimate-and-apply step; callers iterate
//! across frames.

use glam::DVec3;
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::jacobian::{DifferenceScheme, estimate_jacobian};
use super::solve::{DeltaTheta, solve_delta_theta};
use crate::consts::{
    FALLBACK_PERTURBATION, JACOBIAN_EPSILON, MAX_JOINT_STEP, SINGULAR_TOLERANCE, ZERO_STEP_NUDGE,
};
use crate::error::{ChainError, ChainResult};
use crate::kinematics::{ArcId, KinematicChain, Pose, RigConfig, ThetaLayout, build_human};

/// Solver tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IkConfig {
    pub scheme: DifferenceScheme,
    /// Finite-difference step
    pub epsilon: f64,
    /// Per-component cap on one update (radians)
    pub max_step: f64,
    /// Half-width of the random update used when the solve degenerates
    pub fallback_perturbation: f64,
    /// Scale of the nudge applied to exactly-zero components
    pub zero_nudge: f64,
    /// Relative singular value cutoff
    pub singular_tolerance: f64,
    pub seed: u64,
}

impl Default for IkConfig {
    fn default() -> Self {
        Self {
            scheme: DifferenceScheme::default(),
            epsilon: JACOBIAN_EPSILON,
            max_step: MAX_JOINT_STEP,
            fallback_perturbation: FALLBACK_PERTURBATION,
            zero_nudge: ZERO_STEP_NUDGE,
            singular_tolerance: SINGULAR_TOLERANCE,
            seed: 0x1c_0de,
        }
    }
}

/// What one motion step applied
#[derive(Debug, Clone, PartialEq)]
pub struct IkStep {
    /// Clamped joint update added to theta, before limits
    pub delta: Vec<f64>,
    /// The least-squares solve degenerated and a random update was used
    pub fallback: bool,
}

#[derive(Debug, Clone)]
pub struct IkSolver {
    chain: KinematicChain,
    layout: ThetaLayout,
    theta: Vec<f64>,
    effector: ArcId,
    config: IkConfig,
    rng: Pcg32,
}

impl IkSolver {
    /// Solver over `actuated` arcs (in theta order) steering the end effector on `effector`.
    ///
    /// Theta starts at zero, clamped to the joint limits.
    pub fn new(
        mut chain: KinematicChain,
        actuated: &[ArcId],
        effector: ArcId,
        config: IkConfig,
    ) -> ChainResult<Self> {
        let arc = chain
            .arc(effector)
            .ok_or(ChainError::UnknownArc(effector.0))?;
        if arc.end_effector.is_none() {
            return Err(ChainError::MissingEndEffector {
                arc: arc.name.clone(),
            });
        }

        let layout = ThetaLayout::new(&chain, actuated)?;
        let mut theta = vec![0.0; layout.len()];
        chain.write_theta(&layout, &mut theta);
        let pose = chain.forward_kinematics();
        chain.refresh_end_effectors(&pose);

        let rng = Pcg32::seed_from_u64(config.seed);
        Ok(Self {
            chain,
            layout,
            theta,
            effector,
            config,
            rng,
        })
    }

    /// Solver for the player rig, steering the cue tip with the right arm
    pub fn human(rig: &RigConfig, config: IkConfig) -> ChainResult<Self> {
        let rig = build_human(rig)?;
        Self::new(rig.chain, &rig.actuated, rig.effector, config)
    }

    pub fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    pub fn layout(&self) -> &ThetaLayout {
        &self.layout
    }

    pub fn theta(&self) -> &[f64] {
        &self.theta
    }

    pub fn effector(&self) -> ArcId {
        self.effector
    }

    pub fn config(&self) -> &IkConfig {
        &self.config
    }

    /// Replace theta wholesale; limits are applied
    pub fn set_theta(&mut self, theta: &[f64]) -> ChainResult<()> {
        self.layout.check(theta)?;
        self.theta.copy_from_slice(theta);
        self.apply();
        Ok(())
    }

    /// Current pose of the whole chain
    pub fn pose(&self) -> Pose {
        self.chain.forward_kinematics()
    }

    /// Run forward kinematics and return the end effector's global position
    pub fn get_end_effector_position(&mut self) -> DVec3 {
        let pose = self.chain.forward_kinematics();
        self.chain.refresh_end_effectors(&pose);
        self.chain
            .end_effector_position(self.effector)
            .unwrap_or_default()
    }

    /// One step toward an absolute target
    pub fn move_end_effector(&mut self, target: DVec3) -> IkStep {
        let dx = target - self.get_end_effector_position();
        self.move_end_effector_relative(dx)
    }

    /// One step moving the end effector by `dx`
    pub fn move_end_effector_relative(&mut self, dx: DVec3) -> IkStep {
        let jacobian = self.calculate_jacobian();
        let step = self.calculate_delta_theta(&jacobian, dx);

        for (angle, delta) in self.theta.iter_mut().zip(&step.delta) {
            *angle += delta;
        }
        self.apply();
        step
    }

    /// Wrap theta (within joint limits) and estimate the Jacobian at it
    pub fn calculate_jacobian(&mut self) -> DMatrix<f64> {
        self.layout.wrap(&self.chain, &mut self.theta);
        estimate_jacobian(
            &self.chain,
            &self.layout,
            &self.theta,
            self.effector,
            self.config.scheme,
            self.config.epsilon,
            &mut self.rng,
        )
    }

    /// Joint update for `dx`: least squares, random fallback, clamp, nudge
    pub fn calculate_delta_theta(&mut self, jacobian: &DMatrix<f64>, dx: DVec3) -> IkStep {
        let n = self.theta.len();
        let (mut delta, fallback) =
            match solve_delta_theta(jacobian, dx, self.config.singular_tolerance) {
                DeltaTheta::Solved(solution) => {
                    (solution.iter().copied().collect::<Vec<_>>(), false)
                }
                DeltaTheta::Degenerate => {
                    log::debug!("IK solve degenerate, applying random update to {n} joints");
                    let half = self.config.fallback_perturbation;
                    let random: Vec<f64> = (0..n)
                        .map(|_| (self.rng.random::<f64>() * 2.0 - 1.0) * half)
                        .collect();
                    (random, true)
                }
            };
        delta.resize(n, 0.0);

        let cap = self.config.max_step;
        for d in &mut delta {
            *d = d.max(-cap).min(cap);
            if *d == 0.0 {
                *d = self.config.zero_nudge * (self.rng.random::<f64>() - 0.5);
            }
        }

        IkStep { delta, fallback }
    }

    fn apply(&mut self) {
        self.chain.write_theta(&self.layout, &mut self.theta);
        let pose = self.chain.forward_kinematics();
        self.chain.refresh_end_effectors(&pose);
    }
}
