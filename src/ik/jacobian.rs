//! Finite-difference Jacobian of an end effector with respect to theta

use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::kinematics::{ArcId, KinematicChain, ThetaLayout};

/// How each Jacobian column is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DifferenceScheme {
    /// Forward difference with a random step sign per column
    RandomSign,
    /// Symmetric difference with a fixed step
    #[default]
    Central,
}

/// Estimate the 3×n Jacobian of `effector`'s position at `theta`.
///
/// Only a scratch copy of `theta` is perturbed; each entry is put back to its
/// exact original value before the next one is probed.
pub fn estimate_jacobian<R: Rng>(
    chain: &KinematicChain,
    layout: &ThetaLayout,
    theta: &[f64],
    effector: ArcId,
    scheme: DifferenceScheme,
    epsilon: f64,
    rng: &mut R,
) -> DMatrix<f64> {
    let mut jacobian = DMatrix::zeros(3, theta.len());
    let position = |probe: &[f64]| {
        chain
            .evaluate(layout, probe)
            .end_effector(effector)
            .unwrap_or_default()
    };

    let base = match scheme {
        DifferenceScheme::RandomSign => position(theta),
        DifferenceScheme::Central => Default::default(),
    };

    let mut probe = theta.to_vec();
    for j in 0..probe.len() {
        let original = probe[j];

        let column = match scheme {
            DifferenceScheme::RandomSign => {
                let step = if rng.random_bool(0.5) { epsilon } else { -epsilon };
                probe[j] = original + step;
                (position(&probe) - base) / step
            }
            DifferenceScheme::Central => {
                probe[j] = original + epsilon;
                let ahead = position(&probe);
                probe[j] = original - epsilon;
                let behind = position(&probe);
                (ahead - behind) / (2.0 * epsilon)
            }
        };
        probe[j] = original;

        jacobian[(0, j)] = column.x;
        jacobian[(1, j)] = column.y;
        jacobian[(2, j)] = column.z;
    }

    jacobian
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::{DofMask, ShapeKind};
    use glam::{DMat4, DVec3};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    /// One hinge about z with the tip `length` along x
    fn hinge(length: f64) -> (KinematicChain, ThetaLayout, ArcId) {
        let mut b = KinematicChain::builder();
        let link = b.add_node("link", ShapeKind::None, DMat4::IDENTITY);
        let root = b.add_root("hinge", link, DMat4::IDENTITY).unwrap();
        b.set_dof(root, DofMask::new(false, false, true)).unwrap();
        b.attach_end_effector(root, "tip", DVec3::new(length, 0.0, 0.0))
            .unwrap();
        let chain = b.build().unwrap();
        let layout = ThetaLayout::new(&chain, &[root]).unwrap();
        (chain, layout, root)
    }

    #[test]
    fn test_hinge_jacobian_matches_analytic() {
        let (chain, layout, tip) = hinge(2.0);
        let mut rng = Pcg32::seed_from_u64(1);

        for scheme in [DifferenceScheme::Central, DifferenceScheme::RandomSign] {
            for angle in [0.0, 0.7, -2.1] {
                let j = estimate_jacobian(&chain, &layout, &[angle], tip, scheme, 1e-6, &mut rng);
                assert_eq!(j.shape(), (3, 1));
                // d/dθ (2cosθ, 2sinθ, 0)
                assert!((j[(0, 0)] + 2.0 * f64::sin(angle)).abs() < 1e-4);
                assert!((j[(1, 0)] - 2.0 * f64::cos(angle)).abs() < 1e-4);
                assert!(j[(2, 0)].abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_jacobian_does_not_touch_chain() {
        let (chain, layout, tip) = hinge(1.0);
        let before = chain.forward_kinematics();
        let mut rng = Pcg32::seed_from_u64(2);
        let scheme = DifferenceScheme::RandomSign;
        let _ = estimate_jacobian(&chain, &layout, &[0.4], tip, scheme, 1e-6, &mut rng);
        assert_eq!(chain.forward_kinematics(), before);
    }

    #[test]
    fn test_jacobian_zero_for_pivot_effector() {
        let (chain, layout, tip) = hinge(0.0);
        let mut rng = Pcg32::seed_from_u64(3);
        let scheme = DifferenceScheme::Central;
        let j = estimate_jacobian(&chain, &layout, &[0.4], tip, scheme, 1e-6, &mut rng);
        assert!(j.iter().all(|v| v.abs() < 1e-12));
    }
}
