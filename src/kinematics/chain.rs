//! Arena storage for the joint tree
//!
//! Nodes are rigid segments, arcs are rotational joints between them. Both
//! live in flat vectors and refer to each other by index.

use std::f64::consts::TAU;

use glam::{DMat4, DVec3};

use super::forward::{Pose, traverse};
use super::layout::ThetaLayout;
use crate::error::{ChainError, ChainResult};
use crate::wrap_angle;

/// Index of a node in the chain arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Index of an arc (joint) in the chain arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArcId(pub usize);

/// Rotation axes, in the order they are composed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn rotation(self, angle: f64) -> DMat4 {
        match self {
            Axis::X => DMat4::from_rotation_x(angle),
            Axis::Y => DMat4::from_rotation_y(angle),
            Axis::Z => DMat4::from_rotation_z(angle),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Which rotational axes a joint may articulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DofMask {
    pub rx: bool,
    pub ry: bool,
    pub rz: bool,
}

impl DofMask {
    pub const NONE: Self = Self::new(false, false, false);
    pub const ALL: Self = Self::new(true, true, true);

    pub const fn new(rx: bool, ry: bool, rz: bool) -> Self {
        Self { rx, ry, rz }
    }

    pub fn has(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.rx,
            Axis::Y => self.ry,
            Axis::Z => self.rz,
        }
    }

    /// Number of theta entries this joint consumes
    pub fn count(&self) -> usize {
        Axis::ALL.iter().filter(|&&a| self.has(a)).count()
    }

    /// Enabled axes in composition order
    pub fn axes(&self) -> impl Iterator<Item = Axis> + '_ {
        Axis::ALL.into_iter().filter(|&a| self.has(a))
    }
}

/// Inclusive angle range for one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimit {
    pub min: f64,
    pub max: f64,
}

impl JointLimit {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn at_most(max: f64) -> Self {
        Self::new(f64::NEG_INFINITY, max)
    }

    pub fn at_least(min: f64) -> Self {
        Self::new(min, f64::INFINITY)
    }

    pub fn clamp(&self, angle: f64) -> f64 {
        angle.max(self.min).min(self.max)
    }

    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.min && angle <= self.max
    }
}

/// Visual shape a node is drawn with (resolved by the renderer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeKind {
    #[default]
    None,
    Sphere,
    CappedCylinder,
}

/// A rigid segment of the chain
#[derive(Debug, Clone)]
pub struct KinematicNode {
    pub name: String,
    pub shape: ShapeKind,
    /// Visual offset/scale from the incoming joint frame
    pub transform: DMat4,
    /// Outgoing arcs, visited in this order
    pub children: Vec<ArcId>,
    pub parent_arc: Option<ArcId>,
}

/// A point tracked in the frame of the arc it is attached to
#[derive(Debug, Clone, PartialEq)]
pub struct EndEffector {
    pub name: String,
    pub local_position: DVec3,
    /// Refreshed by [`KinematicChain::refresh_end_effectors`]
    pub global_position: DVec3,
}

impl EndEffector {
    pub fn new(name: impl Into<String>, local_position: DVec3) -> Self {
        Self {
            name: name.into(),
            local_position,
            global_position: DVec3::ZERO,
        }
    }
}

/// A rotational joint between a parent node and a child node
#[derive(Debug, Clone)]
pub struct Arc {
    pub name: String,
    /// `None` only for the root arc
    pub parent: Option<NodeId>,
    pub child: NodeId,
    /// Fixed structural offset
    pub location: DMat4,
    /// Current rotation
    pub articulation: DMat4,
    pub dof: DofMask,
    pub limits: [Option<JointLimit>; 3],
    pub end_effector: Option<EndEffector>,
}

impl Arc {
    fn new(name: String, parent: Option<NodeId>, child: NodeId, location: DMat4) -> Self {
        Self {
            name,
            parent,
            child,
            location,
            articulation: DMat4::IDENTITY,
            dof: DofMask::NONE,
            limits: [None; 3],
            end_effector: None,
        }
    }

    /// Clamp a theta slice to this joint's limits, in place
    pub fn clamp_slice(&self, theta: &mut [f64]) {
        for (angle, axis) in theta.iter_mut().zip(self.dof.axes()) {
            if let Some(limit) = self.limits[axis.index()] {
                *angle = limit.clamp(*angle);
            }
        }
    }

    /// Wrap each angle into (-2π, 2π) without leaving its joint limit.
    ///
    /// When the plain wrap lands outside the limit, the equivalent angle one
    /// turn further is tried; if that is outside too the angle is kept as is.
    pub fn wrap_slice(&self, theta: &mut [f64]) {
        for (angle, axis) in theta.iter_mut().zip(self.dof.axes()) {
            let wrapped = wrap_angle(*angle);
            *angle = match self.limits[axis.index()] {
                None => wrapped,
                Some(limit) => [wrapped, wrapped - TAU, wrapped + TAU]
                    .into_iter()
                    .find(|&a| limit.contains(a))
                    .unwrap_or(*angle),
            };
        }
    }

    /// Articulation for a theta slice: enabled axes only, Rx then Ry then Rz,
    /// each pre-multiplied onto the previous. Missing entries read as zero
    /// and are clamped like the rest.
    pub fn articulation_for(&self, theta: &[f64]) -> DMat4 {
        let mut angles = [0.0; 3];
        let n = theta.len().min(3);
        angles[..n].copy_from_slice(&theta[..n]);
        self.clamp_slice(&mut angles);

        self.dof
            .axes()
            .zip(angles)
            .fold(DMat4::IDENTITY, |m, (axis, angle)| axis.rotation(angle) * m)
    }

    /// Rebuild the articulation matrix from scratch
    pub fn update_articulation(&mut self, theta: &[f64]) {
        self.articulation = self.articulation_for(theta);
    }
}

/// Arena-backed tree of nodes joined by arcs
#[derive(Debug, Clone)]
pub struct KinematicChain {
    pub(crate) nodes: Vec<KinematicNode>,
    pub(crate) arcs: Vec<Arc>,
    pub(crate) root: ArcId,
}

impl KinematicChain {
    pub fn builder() -> ChainBuilder {
        ChainBuilder::new()
    }

    pub fn root(&self) -> ArcId {
        self.root
    }

    pub fn nodes(&self) -> &[KinematicNode] {
        &self.nodes
    }

    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    pub fn node(&self, id: NodeId) -> Option<&KinematicNode> {
        self.nodes.get(id.0)
    }

    pub fn arc(&self, id: ArcId) -> Option<&Arc> {
        self.arcs.get(id.0)
    }

    pub fn arc_mut(&mut self, id: ArcId) -> Option<&mut Arc> {
        self.arcs.get_mut(id.0)
    }

    pub fn find_arc(&self, name: &str) -> Option<ArcId> {
        self.arcs.iter().position(|a| a.name == name).map(ArcId)
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    /// Forward kinematics with the stored articulations
    pub fn forward_kinematics(&self) -> Pose {
        let articulations: Vec<DMat4> = self.arcs.iter().map(|a| a.articulation).collect();
        traverse(self, &articulations)
    }

    /// Forward kinematics for `theta` without touching stored articulations.
    ///
    /// Entries past the end of `theta` read as zero, clamped to their limits.
    pub fn evaluate(&self, layout: &ThetaLayout, theta: &[f64]) -> Pose {
        let mut articulations: Vec<DMat4> = self.arcs.iter().map(|a| a.articulation).collect();
        for slot in layout.slots() {
            let arc = &self.arcs[slot.arc.0];
            let end = slot.range.end.min(theta.len());
            let start = slot.range.start.min(end);
            articulations[slot.arc.0] = arc.articulation_for(&theta[start..end]);
        }
        traverse(self, &articulations)
    }

    /// Clamp `theta` to joint limits and rebuild every actuated articulation
    pub fn apply_theta(&mut self, layout: &ThetaLayout, theta: &mut [f64]) -> ChainResult<()> {
        layout.check(theta)?;
        self.write_theta(layout, theta);
        Ok(())
    }

    /// `apply_theta` for callers that already hold a matching vector
    pub(crate) fn write_theta(&mut self, layout: &ThetaLayout, theta: &mut [f64]) {
        for slot in layout.slots() {
            if let (Some(arc), Some(slice)) =
                (self.arcs.get_mut(slot.arc.0), theta.get_mut(slot.range.clone()))
            {
                arc.clamp_slice(slice);
                arc.update_articulation(slice);
            }
        }
    }

    /// Copy end-effector positions from a pose into the cache
    pub fn refresh_end_effectors(&mut self, pose: &Pose) {
        for (i, arc) in self.arcs.iter_mut().enumerate() {
            if let (Some(effector), Some(position)) =
                (arc.end_effector.as_mut(), pose.end_effector(ArcId(i)))
            {
                effector.global_position = position;
            }
        }
    }

    /// Cached global position of the end effector on `arc`
    pub fn end_effector_position(&self, arc: ArcId) -> Option<DVec3> {
        self.arc(arc)?
            .end_effector
            .as_ref()
            .map(|e| e.global_position)
    }
}

/// Incremental chain construction with tree-shape checks
#[derive(Debug, Default)]
pub struct ChainBuilder {
    nodes: Vec<KinematicNode>,
    arcs: Vec<Arc>,
    root: Option<ArcId>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        shape: ShapeKind,
        transform: DMat4,
    ) -> NodeId {
        self.nodes.push(KinematicNode {
            name: name.into(),
            shape,
            transform,
            children: Vec::new(),
            parent_arc: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Add the arc that places the first node in world space
    pub fn add_root(
        &mut self,
        name: impl Into<String>,
        child: NodeId,
        location: DMat4,
    ) -> ChainResult<ArcId> {
        if let Some(existing) = self.root {
            return Err(ChainError::DuplicateRoot {
                existing: self.arcs[existing.0].name.clone(),
            });
        }
        let id = self.attach(name.into(), None, child, location)?;
        self.root = Some(id);
        Ok(id)
    }

    /// Add an arc from `parent` to `child`; `child` must not have a parent yet
    pub fn add_arc(
        &mut self,
        name: impl Into<String>,
        parent: NodeId,
        child: NodeId,
        location: DMat4,
    ) -> ChainResult<ArcId> {
        self.node_index(parent)?;
        let name = name.into();
        self.node_index(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(ChainError::Cycle { arc: name });
        }
        let id = self.attach(name, Some(parent), child, location)?;
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn set_dof(&mut self, arc: ArcId, dof: DofMask) -> ChainResult<()> {
        self.arc_mut(arc)?.dof = dof;
        Ok(())
    }

    pub fn set_limit(&mut self, arc: ArcId, axis: Axis, limit: JointLimit) -> ChainResult<()> {
        self.arc_mut(arc)?.limits[axis.index()] = Some(limit);
        Ok(())
    }

    /// Rest articulation, kept for arcs that are never actuated
    pub fn set_articulation(&mut self, arc: ArcId, articulation: DMat4) -> ChainResult<()> {
        self.arc_mut(arc)?.articulation = articulation;
        Ok(())
    }

    pub fn attach_end_effector(
        &mut self,
        arc: ArcId,
        name: impl Into<String>,
        local_position: DVec3,
    ) -> ChainResult<()> {
        self.arc_mut(arc)?.end_effector = Some(EndEffector::new(name, local_position));
        Ok(())
    }

    pub fn build(self) -> ChainResult<KinematicChain> {
        let root = self.root.ok_or(ChainError::MissingRoot)?;

        let mut chain = KinematicChain {
            nodes: self.nodes,
            arcs: self.arcs,
            root,
        };

        let pose = chain.forward_kinematics();
        if let Some(node) = chain
            .nodes
            .iter()
            .enumerate()
            .find(|(i, _)| !pose.reached(NodeId(*i)))
            .map(|(_, n)| n.name.clone())
        {
            return Err(ChainError::UnreachableNode { node });
        }

        chain.refresh_end_effectors(&pose);
        Ok(chain)
    }

    fn attach(
        &mut self,
        name: String,
        parent: Option<NodeId>,
        child: NodeId,
        location: DMat4,
    ) -> ChainResult<ArcId> {
        let child_index = self.node_index(child)?;
        if let Some(existing) = self.nodes[child_index].parent_arc {
            return Err(ChainError::NodeAlreadyAttached {
                node: self.nodes[child_index].name.clone(),
                existing: self.arcs[existing.0].name.clone(),
            });
        }

        let id = ArcId(self.arcs.len());
        self.arcs.push(Arc::new(name, parent, child, location));
        self.nodes[child_index].parent_arc = Some(id);
        Ok(id)
    }

    /// Walk up from `node` looking for `ancestor`
    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id.0]
                .parent_arc
                .and_then(|arc| self.arcs[arc.0].parent);
        }
        false
    }

    fn node_index(&self, id: NodeId) -> ChainResult<usize> {
        if id.0 < self.nodes.len() {
            Ok(id.0)
        } else {
            Err(ChainError::UnknownNode(id.0))
        }
    }

    fn arc_mut(&mut self, id: ArcId) -> ChainResult<&mut Arc> {
        self.arcs.get_mut(id.0).ok_or(ChainError::UnknownArc(id.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn translation(x: f64, y: f64, z: f64) -> DMat4 {
        DMat4::from_translation(DVec3::new(x, y, z))
    }

    #[test]
    fn test_dof_mask_count() {
        assert_eq!(DofMask::NONE.count(), 0);
        assert_eq!(DofMask::ALL.count(), 3);
        assert_eq!(DofMask::new(true, false, true).count(), 2);
        let axes: Vec<Axis> = DofMask::new(false, true, true).axes().collect();
        assert_eq!(axes, vec![Axis::Y, Axis::Z]);
    }

    #[test]
    fn test_articulation_consumes_slice_positionally() {
        let mut arc = Arc::new("wrist".into(), None, NodeId(0), DMat4::IDENTITY);
        arc.dof = DofMask::new(true, false, true);

        // First value drives Rx, second drives Rz
        arc.update_articulation(&[0.0, FRAC_PI_2]);
        let p = arc.articulation.transform_point3(DVec3::X);
        assert!((p - DVec3::Y).length() < EPS);

        arc.update_articulation(&[FRAC_PI_2, 0.0]);
        let p = arc.articulation.transform_point3(DVec3::Y);
        assert!((p - DVec3::Z).length() < EPS);
    }

    #[test]
    fn test_articulation_rebuilt_from_scratch() {
        let mut arc = Arc::new("elbow".into(), None, NodeId(0), DMat4::IDENTITY);
        arc.dof = DofMask::new(false, false, true);
        arc.update_articulation(&[0.4]);
        arc.update_articulation(&[0.4]);
        let expected = DMat4::from_rotation_z(0.4);
        assert!(arc.articulation.abs_diff_eq(expected, EPS));
    }

    #[test]
    fn test_articulation_order_x_then_y_then_z() {
        let mut arc = Arc::new("shoulder".into(), None, NodeId(0), DMat4::IDENTITY);
        arc.dof = DofMask::ALL;
        arc.update_articulation(&[0.3, -0.7, 1.1]);
        let expected = DMat4::from_rotation_z(1.1)
            * DMat4::from_rotation_y(-0.7)
            * DMat4::from_rotation_x(0.3);
        assert!(arc.articulation.abs_diff_eq(expected, EPS));
    }

    #[test]
    fn test_limits_clamp_slice() {
        let mut arc = Arc::new("shoulder".into(), None, NodeId(0), DMat4::IDENTITY);
        arc.dof = DofMask::ALL;
        arc.limits[Axis::Y.index()] = Some(JointLimit::at_most(-0.1));
        arc.limits[Axis::Z.index()] = Some(JointLimit::new(-1.0, 1.0));

        let mut theta = [0.5, 0.5, 3.0];
        arc.clamp_slice(&mut theta);
        assert_eq!(theta, [0.5, -0.1, 1.0]);
    }

    #[test]
    fn test_padded_angles_are_clamped() {
        let mut arc = Arc::new("shoulder".into(), None, NodeId(0), DMat4::IDENTITY);
        arc.dof = DofMask::ALL;
        arc.limits[Axis::Y.index()] = Some(JointLimit::at_most(-0.1));

        let short = arc.articulation_for(&[0.3]);
        let full = arc.articulation_for(&[0.3, -0.1, 0.0]);
        assert!(short.abs_diff_eq(full, EPS));
    }

    #[test]
    fn test_wrap_slice_stays_inside_limits() {
        let mut arc = Arc::new("shoulder".into(), None, NodeId(0), DMat4::IDENTITY);
        arc.dof = DofMask::ALL;
        arc.limits[Axis::Y.index()] = Some(JointLimit::at_most(-0.1));
        arc.limits[Axis::Z.index()] = Some(JointLimit::new(-13.0, -12.0));

        // Rx is free and wraps plainly; Ry would wrap to -0.017, past its cap
        let mut theta = [7.0, -6.3, -12.6];
        arc.wrap_slice(&mut theta);

        assert!((theta[0] - (7.0 - TAU)).abs() < EPS);
        assert!((theta[1] + 6.3).abs() < EPS);
        assert!(theta[1] <= -0.1);
        // Neither -0.034 nor one turn either side of it fits in [-13, -12]
        assert_eq!(theta[2], -12.6);

        let mut far = [0.0, -12.6, -12.6];
        arc.wrap_slice(&mut far);
        assert!((far[1] - (-12.6 + TAU)).abs() < EPS);
        assert!((far[1].sin() - (-12.6f64).sin()).abs() < EPS);
    }

    #[test]
    fn test_builder_rejects_second_parent() {
        let mut b = KinematicChain::builder();
        let a = b.add_node("a", ShapeKind::None, DMat4::IDENTITY);
        let c = b.add_node("c", ShapeKind::None, DMat4::IDENTITY);
        b.add_root("root", a, DMat4::IDENTITY).unwrap();
        b.add_arc("a_c", a, c, DMat4::IDENTITY).unwrap();

        let err = b.add_arc("again", a, c, DMat4::IDENTITY).unwrap_err();
        assert!(matches!(err, ChainError::NodeAlreadyAttached { .. }));
    }

    #[test]
    fn test_builder_rejects_cycle() {
        let mut b = KinematicChain::builder();
        let a = b.add_node("a", ShapeKind::None, DMat4::IDENTITY);
        let c = b.add_node("c", ShapeKind::None, DMat4::IDENTITY);
        b.add_arc("a_c", a, c, DMat4::IDENTITY).unwrap();

        // c -> a would close a loop through the unattached a
        let err = b.add_arc("c_a", c, a, DMat4::IDENTITY).unwrap_err();
        assert!(matches!(err, ChainError::Cycle { .. }));

        let err = b.add_arc("self", c, c, DMat4::IDENTITY).unwrap_err();
        assert!(matches!(err, ChainError::Cycle { .. }));
    }

    #[test]
    fn test_builder_rejects_second_root_and_unknown_ids() {
        let mut b = KinematicChain::builder();
        let a = b.add_node("a", ShapeKind::None, DMat4::IDENTITY);
        let c = b.add_node("c", ShapeKind::None, DMat4::IDENTITY);
        b.add_root("root", a, DMat4::IDENTITY).unwrap();

        assert!(matches!(
            b.add_root("root2", c, DMat4::IDENTITY),
            Err(ChainError::DuplicateRoot { .. })
        ));
        assert!(matches!(
            b.add_arc("x", a, NodeId(9), DMat4::IDENTITY),
            Err(ChainError::UnknownNode(9))
        ));
        assert!(matches!(
            b.set_dof(ArcId(5), DofMask::ALL),
            Err(ChainError::UnknownArc(5))
        ));
    }

    #[test]
    fn test_build_requires_root_and_reachability() {
        let mut b = KinematicChain::builder();
        b.add_node("a", ShapeKind::None, DMat4::IDENTITY);
        assert!(matches!(b.build(), Err(ChainError::MissingRoot)));

        let mut b = KinematicChain::builder();
        let a = b.add_node("a", ShapeKind::None, DMat4::IDENTITY);
        b.add_node("floating", ShapeKind::None, DMat4::IDENTITY);
        b.add_root("root", a, DMat4::IDENTITY).unwrap();
        assert!(matches!(
            b.build(),
            Err(ChainError::UnreachableNode { node }) if node == "floating"
        ));
    }

    #[test]
    fn test_build_refreshes_end_effector_cache() {
        let mut b = KinematicChain::builder();
        let a = b.add_node("a", ShapeKind::Sphere, DMat4::IDENTITY);
        let root = b.add_root("root", a, translation(1.0, 2.0, 3.0)).unwrap();
        b.attach_end_effector(root, "tip", DVec3::new(0.5, 0.0, 0.0))
            .unwrap();
        let chain = b.build().unwrap();

        let p = chain.end_effector_position(root).unwrap();
        assert!((p - DVec3::new(1.5, 2.0, 3.0)).length() < EPS);
        assert_eq!(chain.find_arc("root"), Some(root));
        assert_eq!(chain.find_node("a"), Some(a));
        assert!(chain.find_arc("missing").is_none());
    }
}
