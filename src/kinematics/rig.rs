//! Articulated player rig holding a cue
//!
//! Torso, head, both arms and both legs hang off a root placed beside the
//! table. Only the right arm (shoulder 3 DOF, elbow 2, wrist 2) is actuated;
//! the cue tip is the end effector.

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};

use super::chain::{
    ArcId, Axis, ChainBuilder, DofMask, JointLimit, KinematicChain, NodeId, ShapeKind,
};
use crate::error::ChainResult;

/// Rest rotation of the cue about the hand's z axis (radians)
pub const CUE_REST_ANGLE: f64 = 1.57;
/// Upper bound on the right shoulder's Ry and Rz angles
pub const SHOULDER_LIMIT: f64 = -0.1;

/// Rig options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// World position of the torso joint
    pub root_location: DVec3,
    /// Cap the right shoulder's Ry and Rz at [`SHOULDER_LIMIT`]
    pub limit_shoulder: bool,
    /// Cue tip offset in the cue joint frame
    pub cue_tip: DVec3,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            root_location: DVec3::new(0.0, 1.0, 7.0),
            limit_shoulder: true,
            cue_tip: DVec3::new(0.8, 0.0, 0.0),
        }
    }
}

/// A built rig: the chain, its actuated arcs in theta order, and the IK target arc
#[derive(Debug, Clone)]
pub struct Rig {
    pub chain: KinematicChain,
    pub actuated: Vec<ArcId>,
    pub effector: ArcId,
}

/// Node visual transform: translate after scaling
fn segment(scale: (f64, f64, f64), offset: (f64, f64, f64)) -> DMat4 {
    DMat4::from_translation(DVec3::new(offset.0, offset.1, offset.2))
        * DMat4::from_scale(DVec3::new(scale.0, scale.1, scale.2))
}

fn at(x: f64, y: f64, z: f64) -> DMat4 {
    DMat4::from_translation(DVec3::new(x, y, z))
}

/// Upper limb, lower limb and extremity hanging off `parent`
struct Limb {
    upper: ArcId,
    middle: ArcId,
    extremity: ArcId,
    extremity_node: NodeId,
}

fn limb(
    b: &mut ChainBuilder,
    parent: NodeId,
    names: [&str; 6],
    transforms: [DMat4; 3],
    locations: [DMat4; 3],
) -> ChainResult<Limb> {
    let [upper_node, upper_arc, lower_node, middle_arc, end_node, end_arc] = names;
    let [upper_t, lower_t, end_t] = transforms;
    let [upper_l, middle_l, end_l] = locations;

    let upper_n = b.add_node(upper_node, ShapeKind::Sphere, upper_t);
    let upper = b.add_arc(upper_arc, parent, upper_n, upper_l)?;
    b.set_dof(upper, DofMask::new(true, true, true))?;

    let lower_n = b.add_node(lower_node, ShapeKind::Sphere, lower_t);
    let middle = b.add_arc(middle_arc, upper_n, lower_n, middle_l)?;
    b.set_dof(middle, DofMask::new(true, true, false))?;

    let extremity_node = b.add_node(end_node, ShapeKind::Sphere, end_t);
    let extremity = b.add_arc(end_arc, lower_n, extremity_node, end_l)?;
    b.set_dof(extremity, DofMask::new(true, false, true))?;

    Ok(Limb {
        upper,
        middle,
        extremity,
        extremity_node,
    })
}

/// Build the player rig
pub fn build_human(config: &RigConfig) -> ChainResult<Rig> {
    let mut b = KinematicChain::builder();

    let torso = b.add_node("torso", ShapeKind::Sphere, segment((1.0, 1.8, 0.5), (0.0, 0.0, 0.0)));
    b.add_root("root", torso, DMat4::from_translation(config.root_location))?;

    let head = b.add_node("head", ShapeKind::Sphere, segment((0.6, 0.6, 0.6), (0.0, 0.6, 0.0)));
    b.add_arc("neck", torso, head, at(0.0, 2.0, 0.0))?;

    let right_arm = limb(
        &mut b,
        torso,
        ["ru_arm", "r_shoulder", "rl_arm", "r_elbow", "r_hand", "r_wrist"],
        [
            segment((1.2, 0.2, 0.2), (1.2, 0.0, 0.0)),
            segment((1.0, 0.2, 0.2), (1.0, 0.0, 0.0)),
            segment((0.4, 0.3, 0.2), (0.4, 0.0, 0.0)),
        ],
        [at(0.5, 1.8, 0.0), at(2.4, 0.0, 0.0), at(2.0, 0.0, 0.0)],
    )?;
    if config.limit_shoulder {
        let cap = JointLimit::at_most(SHOULDER_LIMIT);
        b.set_limit(right_arm.upper, Axis::Y, cap)?;
        b.set_limit(right_arm.upper, Axis::Z, cap)?;
    }

    let cue = b.add_node(
        "cue",
        ShapeKind::CappedCylinder,
        segment((2.0, 0.1, 0.1), (0.9, 0.0, 0.0)),
    );
    let cue_joint = b.add_arc("cue_joint", right_arm.extremity_node, cue, at(0.4, 0.0, 0.0))?;
    b.set_articulation(cue_joint, DMat4::from_rotation_z(CUE_REST_ANGLE))?;
    b.attach_end_effector(cue_joint, "cue", config.cue_tip)?;

    limb(
        &mut b,
        torso,
        ["lu_arm", "l_shoulder", "ll_arm", "l_elbow", "l_hand", "l_wrist"],
        [
            segment((1.2, 0.2, 0.2), (-1.2, 0.0, 0.0)),
            segment((1.0, 0.2, 0.2), (-1.0, 0.0, 0.0)),
            segment((0.4, 0.3, 0.2), (-0.4, 0.0, 0.0)),
        ],
        [at(-0.6, 1.8, 0.0), at(-2.4, 0.0, 0.0), at(-2.0, 0.0, 0.0)],
    )?;

    for (side, x) in [("r", 0.4), ("l", -0.4)] {
        limb(
            &mut b,
            torso,
            [
                &format!("{side}u_leg"),
                &format!("{side}_leg_joint1"),
                &format!("{side}l_leg"),
                &format!("{side}_leg_joint2"),
                &format!("{side}_foot"),
                &format!("{side}_leg_joint3"),
            ],
            [
                segment((0.2, 0.5, 0.2), (x, -2.0, 0.0)),
                segment((0.2, 0.5, 0.2), (x, -2.6, 0.0)),
                segment((0.2, 0.3, 0.4), (x, -3.0, -0.2)),
            ],
            [at(0.0, -0.2, 0.0), at(0.0, -0.3, 0.0), at(0.0, -0.3, 0.0)],
        )?;
    }

    Ok(Rig {
        chain: b.build()?,
        actuated: vec![right_arm.upper, right_arm.middle, right_arm.extremity],
        effector: cue_joint,
    })
}
