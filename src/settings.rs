//! Simulation configuration
//!
//! Everything the driver needs to build a scene: table, friction, rack,
//! frame timing, rig and solver tuning. Stored as JSON; every section falls
//! back to its defaults when omitted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{ConfigError, ConfigResult};
use crate::ik::IkConfig;
use crate::kinematics::RigConfig;
use crate::sim::{BoundaryRect, SpawnConfig};

/// Table and friction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub bounds: BoundaryRect,
    pub friction_coef: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            bounds: BoundaryRect::default(),
            friction_coef: FRICTION_COEF,
        }
    }
}

/// Fixed-step timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Physics sub-step (seconds)
    pub sim_dt: f32,
    /// Frames longer than this are clamped (seconds)
    pub max_frame_dt: f32,
    /// Sub-step cap per frame
    pub max_substeps: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            sim_dt: SIM_DT,
            max_frame_dt: MAX_FRAME_DT,
            max_substeps: MAX_SUBSTEPS,
        }
    }
}

/// Full simulation config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub physics: PhysicsConfig,
    pub spawn: SpawnConfig,
    pub frame: FrameConfig,
    pub rig: RigConfig,
    pub ik: IkConfig,
}

impl SimConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        let result = self.check();
        if let Err(err) = &result {
            log::warn!("Rejected config: {err}");
        }
        result
    }

    fn check(&self) -> ConfigResult<()> {
        let frame = &self.frame;
        positive("frame.sim_dt", frame.sim_dt)?;
        positive("frame.max_frame_dt", frame.max_frame_dt)?;
        if frame.max_substeps == 0 {
            return Err(invalid("frame.max_substeps", "must be at least 1"));
        }

        let bounds = &self.physics.bounds;
        if !(bounds.left < bounds.right) {
            return Err(invalid(
                "physics.bounds",
                format!("left {} must be less than right {}", bounds.left, bounds.right),
            ));
        }
        if !(bounds.bottom < bounds.top) {
            return Err(invalid(
                "physics.bounds",
                format!("bottom {} must be less than top {}", bounds.bottom, bounds.top),
            ));
        }
        if !(self.physics.friction_coef >= 0.0) {
            return Err(invalid(
                "physics.friction_coef",
                format!("{} is negative", self.physics.friction_coef),
            ));
        }

        positive("spawn.ball_radius", self.spawn.ball_radius)?;
        if !(self.spawn.extent >= 0.0 && self.spawn.speed >= 0.0) {
            return Err(invalid("spawn", "extent and speed must be non-negative"));
        }

        let ik = &self.ik;
        positive_f64("ik.epsilon", ik.epsilon)?;
        positive_f64("ik.max_step", ik.max_step)?;
        let non_negative = [ik.fallback_perturbation, ik.zero_nudge, ik.singular_tolerance];
        if !non_negative.iter().all(|v| *v >= 0.0) {
            return Err(invalid(
                "ik",
                "fallback_perturbation, zero_nudge and singular_tolerance must be non-negative",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: f32) -> ConfigResult<()> {
    positive_f64(field, value.into())
}

fn positive_f64(field: &'static str, value: f64) -> ConfigResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} must be positive")))
    }
}
