//! Kinematic chain module
//!
//! Nodes and arcs live in an arena indexed by `NodeId` / `ArcId`. Forward
//! kinematics is a pure traversal returning a fresh [`Pose`].

pub mod chain;
pub mod forward;
pub mod layout;
pub mod rig;

pub use chain::{
    Arc, ArcId, Axis, ChainBuilder, DofMask, EndEffector, JointLimit, KinematicChain, KinematicNode,
    NodeId, ShapeKind,
};
pub use forward::Pose;
pub use layout::{ThetaLayout, ThetaSlot};
pub use rig::{Rig, RigConfig, build_human};
