//! Forward kinematics
//!
//! Depth-first walk from the root arc. Every arc composes
//! `parent · location · articulation`; each child arc starts from its own
//! copy of that frame so siblings never see each other's state.

use glam::{DMat4, DVec3};

use super::chain::{ArcId, KinematicChain, NodeId};

/// World-space frames from one traversal
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    arc_frames: Vec<DMat4>,
    /// Joint frame times node transform; `None` if the node was not reached
    node_frames: Vec<Option<DMat4>>,
    effectors: Vec<Option<DVec3>>,
}

impl Pose {
    fn new(arc_count: usize, node_count: usize) -> Self {
        Self {
            arc_frames: vec![DMat4::IDENTITY; arc_count],
            node_frames: vec![None; node_count],
            effectors: vec![None; arc_count],
        }
    }

    /// Joint frame of an arc (the frame its child node hangs from)
    pub fn arc_frame(&self, arc: ArcId) -> Option<DMat4> {
        self.arc_frames.get(arc.0).copied()
    }

    /// Frame a renderer would draw the node's shape with
    pub fn node_frame(&self, node: NodeId) -> Option<DMat4> {
        self.node_frames.get(node.0).copied().flatten()
    }

    pub fn reached(&self, node: NodeId) -> bool {
        self.node_frame(node).is_some()
    }

    pub fn end_effector(&self, arc: ArcId) -> Option<DVec3> {
        self.effectors.get(arc.0).copied().flatten()
    }

    pub fn end_effectors(&self) -> impl Iterator<Item = (ArcId, DVec3)> + '_ {
        self.effectors
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (ArcId(i), p)))
    }
}

/// Walk the tree with the given per-arc articulations
pub(crate) fn traverse(chain: &KinematicChain, articulations: &[DMat4]) -> Pose {
    let mut pose = Pose::new(chain.arcs.len(), chain.nodes.len());
    let mut stack = vec![(chain.root, DMat4::IDENTITY)];

    while let Some((arc_id, parent_frame)) = stack.pop() {
        let arc = &chain.arcs[arc_id.0];
        let articulation = articulations
            .get(arc_id.0)
            .copied()
            .unwrap_or(arc.articulation);
        let frame = parent_frame * arc.location * articulation;
        pose.arc_frames[arc_id.0] = frame;

        if let Some(effector) = &arc.end_effector {
            pose.effectors[arc_id.0] = Some(frame.transform_point3(effector.local_position));
        }

        let node = &chain.nodes[arc.child.0];
        pose.node_frames[arc.child.0] = Some(frame * node.transform);

        // Reverse so children pop in declaration order
        for &child in node.children.iter().rev() {
            stack.push((child, frame));
        }
    }

    pose
}
