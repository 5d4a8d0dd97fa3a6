//! C2 — `F1Structure`: graph compilation against a gravity direction
//! (spec.md §3/§4.1).
//!
//! Derives, per link, the signed normal/tangential conductivities against
//! gravity, and builds each node's adjacency list of contacts. Built once
//! per solve and then treated as read-only.

use std::sync::Arc;

use nalgebra::{RealField, Vector3};
use num_traits::Float;

use crate::error::Result;
use crate::graph::{ContactIndex, LinkIndex, NodeIndex, Structure};
use crate::vector::NormalizedVec3;

/// One directed entry in a node's adjacency list: the neighbour, the link
/// it rides on, and the two directional conductivities as seen from this
/// node (`cond_plus` applies when the neighbour's potential is higher).
#[derive(Debug, Clone, Copy)]
pub struct F1Contact<F> {
    pub other_node_id: NodeIndex,
    pub link_id: LinkIndex,
    pub cond_plus: F,
    pub cond_minus: F,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeInfo<F> {
    pub weight: F,
    pub contacts: Vec<F1Contact<F>>,
}

/// Per-endpoint offsets into the other endpoint's contact list, recorded so
/// a `(link_id, side)` pair resolves to its matching contact in O(1).
#[derive(Debug, Clone, Copy)]
pub(crate) struct LinkInfo {
    pub local_contact_id: usize,
    pub other_contact_id: usize,
}

/// The compiled, gravity-aware view of a [`Structure`]. Read-only once built.
pub struct F1Structure<F> {
    structure: Arc<Structure<F>>,
    normalized_g: NormalizedVec3<F>,
    node_infos: Vec<NodeInfo<F>>,
    link_infos: Vec<LinkInfo>,
}

impl<F: Float> F1Structure<F> {
    pub fn new(structure: Arc<Structure<F>>, g: Vector3<F>) -> Result<Self>
    where
        F: RealField,
    {
        let normalized_g = NormalizedVec3::try_new(g)?;
        let g_norm = g.norm();

        let mut node_infos: Vec<NodeInfo<F>> = structure
            .nodes()
            .iter()
            .map(|node| NodeInfo {
                weight: node.mass * g_norm,
                contacts: Vec::new(),
            })
            .collect();
        let mut link_infos = Vec::with_capacity(structure.link_count());

        for (link_id, link) in structure.links().iter().enumerate() {
            let n = normalized_g.dot(&link.normal.as_vector());
            let (cond_plus_from_local, cond_minus_from_local) =
                directional_conductivities(n, &link.conductivity);

            let local = link.local_node_id;
            let other = link.other_node_id;

            let local_contact_id = node_infos[local].contacts.len();
            node_infos[local].contacts.push(F1Contact {
                other_node_id: other,
                link_id,
                cond_plus: cond_plus_from_local,
                cond_minus: cond_minus_from_local,
            });

            // From the other endpoint, "higher potential" is on the opposite
            // side of the same physical interface, so plus/minus swap.
            let other_contact_id = node_infos[other].contacts.len();
            node_infos[other].contacts.push(F1Contact {
                other_node_id: local,
                link_id,
                cond_plus: cond_minus_from_local,
                cond_minus: cond_plus_from_local,
            });

            link_infos.push(LinkInfo {
                local_contact_id,
                other_contact_id,
            });
        }

        Ok(Self {
            structure,
            normalized_g,
            node_infos,
            link_infos,
        })
    }

    pub fn structure(&self) -> &Arc<Structure<F>> {
        &self.structure
    }

    pub fn normalized_g(&self) -> NormalizedVec3<F> {
        self.normalized_g
    }

    pub fn node_count(&self) -> usize {
        self.node_infos.len()
    }

    pub fn weight(&self, node_id: NodeIndex) -> F {
        self.node_infos[node_id].weight
    }

    pub(crate) fn contacts(&self, node_id: NodeIndex) -> &[F1Contact<F>] {
        &self.node_infos[node_id].contacts
    }

    /// Resolves a `(link, side)` contact index to its concrete contact and
    /// owning node.
    pub(crate) fn contact_at(&self, index: ContactIndex) -> (NodeIndex, &F1Contact<F>) {
        let link = self.structure.link(index.link_id);
        let info = &self.link_infos[index.link_id];
        if index.is_on_local_node {
            (link.local_node_id, &self.node_infos[link.local_node_id].contacts[info.local_contact_id])
        } else {
            (link.other_node_id, &self.node_infos[link.other_node_id].contacts[info.other_contact_id])
        }
    }
}

/// Splits a link's conductivity triple into the `(+n, -n)` directional
/// conductivities against gravity, per spec.md §3/§4.1's edge-case rules:
/// `n² = 1` makes tangential infinite; `n = 0` makes both normals infinite.
fn directional_conductivities<F: Float>(n: F, conductivity: &crate::stress::Stress<F>) -> (F, F) {
    let one = F::one();
    let n_sq = n * n;
    let tangential = if n_sq >= one {
        F::infinity()
    } else {
        conductivity.shear / (one - n_sq).sqrt()
    };

    let abs_n = n.abs();
    let normal_plus = normal_conductivity(n, abs_n, conductivity);
    let normal_minus = normal_conductivity(-n, abs_n, conductivity);

    (tangential.min(normal_plus), tangential.min(normal_minus))
}

/// `(n ≤ 0 ? compression : tensile) / |n|`, with `|n| = 0` yielding infinity.
fn normal_conductivity<F: Float>(n: F, abs_n: F, conductivity: &crate::stress::Stress<F>) -> F {
    if abs_n.is_zero() {
        return F::infinity();
    }
    let side = if n <= F::zero() {
        conductivity.compression
    } else {
        conductivity.tensile
    };
    side / abs_n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stress::Stress;

    fn unit<F: Float + RealField>(v: Vector3<F>) -> NormalizedVec3<F> {
        NormalizedVec3::try_new(v).unwrap()
    }

    #[test]
    fn aligned_link_has_infinite_tangential() {
        let cond = Stress::new(10.0, 5.0, 2.0);
        let (plus, minus) = directional_conductivities(1.0, &cond);
        // tangential is infinite, so min() picks the normal conductivities.
        assert!((plus - 2.0).abs() < 1e-12); // n=1 -> plus side is tensile/1
        assert!((minus - 10.0).abs() < 1e-12); // minus side is compression/1
    }

    #[test]
    fn perpendicular_link_has_infinite_normals() {
        let cond = Stress::new(10.0, 5.0, 2.0);
        let (plus, minus) = directional_conductivities(0.0, &cond);
        assert!((plus - 5.0).abs() < 1e-12);
        assert!((minus - 5.0).abs() < 1e-12);
    }

    #[test]
    fn f1_structure_builds_symmetric_contacts() {
        let mut structure = Structure::<f64>::new();
        let a = structure.add_node(10.0, true);
        let b = structure.add_node(10.0, false);
        structure
            .add_link(a, b, unit(Vector3::new(0.0, 1.0, 0.0)), Stress::new(10.0, 5.0, 2.0))
            .unwrap();
        let f = F1Structure::new(Arc::new(structure), Vector3::new(0.0, -10.0, 0.0)).unwrap();
        assert_eq!(f.contacts(a).len(), 1);
        assert_eq!(f.contacts(b).len(), 1);
        assert_eq!(f.contacts(a)[0].other_node_id, b);
        assert_eq!(f.contacts(b)[0].other_node_id, a);
    }
}
