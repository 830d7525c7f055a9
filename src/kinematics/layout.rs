//! Theta vector layout
//!
//! Maps each actuated arc to the range of joint angles it reads.

use std::ops::Range;

use super::chain::{ArcId, KinematicChain};
use crate::error::{ChainError, ChainResult};

/// The slice of the theta vector owned by one actuated arc
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThetaSlot {
    pub arc: ArcId,
    pub range: Range<usize>,
}

/// Mapping from global theta indices to the arcs that consume them.
///
/// Slots are contiguous and follow the order the arcs were given in; each is
/// as wide as its arc's enabled-axis count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThetaLayout {
    slots: Vec<ThetaSlot>,
    len: usize,
}

impl ThetaLayout {
    pub fn new(chain: &KinematicChain, actuated: &[ArcId]) -> ChainResult<Self> {
        let mut slots: Vec<ThetaSlot> = Vec::with_capacity(actuated.len());
        let mut offset = 0;

        for &id in actuated {
            let arc = chain.arc(id).ok_or(ChainError::UnknownArc(id.0))?;
            if slots.iter().any(|s| s.arc == id) {
                return Err(ChainError::DuplicateActuation {
                    arc: arc.name.clone(),
                });
            }

            let width = arc.dof.count();
            slots.push(ThetaSlot {
                arc: id,
                range: offset..offset + width,
            });
            offset += width;
        }

        Ok(Self { slots, len: offset })
    }

    /// Total number of joint angles
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn slots(&self) -> &[ThetaSlot] {
        &self.slots
    }

    pub fn slot_for(&self, arc: ArcId) -> Option<&ThetaSlot> {
        self.slots.iter().find(|s| s.arc == arc)
    }

    /// Arc that owns theta entry `index`
    pub fn joint_at(&self, index: usize) -> Option<ArcId> {
        self.slots
            .iter()
            .find(|s| s.range.contains(&index))
            .map(|s| s.arc)
    }

    pub fn check(&self, theta: &[f64]) -> ChainResult<()> {
        if theta.len() == self.len {
            Ok(())
        } else {
            Err(ChainError::ThetaLength {
                expected: self.len,
                actual: theta.len(),
            })
        }
    }

    /// Clamp every slot of `theta` to its arc's limits
    pub fn clamp(&self, chain: &KinematicChain, theta: &mut [f64]) {
        for slot in &self.slots {
            if let (Some(arc), Some(slice)) =
                (chain.arc(slot.arc), theta.get_mut(slot.range.clone()))
            {
                arc.clamp_slice(slice);
            }
        }
    }

    /// Wrap every slot of `theta` into (-2π, 2π) where its limits allow
    pub fn wrap(&self, chain: &KinematicChain, theta: &mut [f64]) {
        for slot in &self.slots {
            if let (Some(arc), Some(slice)) =
                (chain.arc(slot.arc), theta.get_mut(slot.range.clone()))
            {
                arc.wrap_slice(slice);
            }
        }
    }
}
