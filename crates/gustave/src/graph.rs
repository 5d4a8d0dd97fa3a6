//! C1 — the solver-level graph model (spec.md §3/§4.1).
//!
//! `Structure` is plain append-only data: nodes carry mass and a foundation
//! flag, links carry the two endpoints, a unit normal, and a conductivity
//! triple. Nothing here knows about gravity or potentials — that is
//! [`crate::f1_structure::F1Structure`]'s job.

use nalgebra::{RealField, Vector3};
use num_traits::Float;

use crate::error::{GustaveError, Result};
use crate::stress::Stress;
use crate::vector::NormalizedVec3;

pub type NodeIndex = usize;
pub type LinkIndex = usize;

#[derive(Debug, Clone, Copy)]
pub struct Node<F> {
    pub mass: F,
    pub is_foundation: bool,
}

#[derive(Debug, Clone)]
pub struct Link<F> {
    pub local_node_id: NodeIndex,
    pub other_node_id: NodeIndex,
    pub normal: NormalizedVec3<F>,
    pub conductivity: Stress<F>,
}

/// A contact is identified by a link plus which of its two endpoints is
/// being viewed from (spec.md §4.1's "given a link id and a side").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContactIndex {
    pub link_id: LinkIndex,
    pub is_on_local_node: bool,
}

impl ContactIndex {
    pub fn opposite(self) -> Self {
        Self {
            link_id: self.link_id,
            is_on_local_node: !self.is_on_local_node,
        }
    }
}

/// The solver's own view of a structure: nodes and links only, no scene
/// bookkeeping. Append-only; frozen once handed to [`crate::solver::Force1Solver`].
#[derive(Debug, Clone, Default)]
pub struct Structure<F> {
    nodes: Vec<Node<F>>,
    links: Vec<Link<F>>,
}

impl<F: Float> Structure<F> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn add_node(&mut self, mass: F, is_foundation: bool) -> NodeIndex {
        self.nodes.push(Node { mass, is_foundation });
        self.nodes.len() - 1
    }

    pub fn add_link(
        &mut self,
        local_node_id: NodeIndex,
        other_node_id: NodeIndex,
        normal: NormalizedVec3<F>,
        conductivity: Stress<F>,
    ) -> Result<LinkIndex> {
        if local_node_id == other_node_id {
            return Err(GustaveError::SelfLink(local_node_id));
        }
        let len = self.nodes.len();
        if local_node_id >= len {
            return Err(GustaveError::NodeIndexOutOfRange {
                index: local_node_id,
                len,
            });
        }
        if other_node_id >= len {
            return Err(GustaveError::NodeIndexOutOfRange {
                index: other_node_id,
                len,
            });
        }
        self.links.push(Link {
            local_node_id,
            other_node_id,
            normal,
            conductivity,
        });
        Ok(self.links.len() - 1)
    }

    pub fn nodes(&self) -> &[Node<F>] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link<F>] {
        &self.links
    }

    pub fn node(&self, id: NodeIndex) -> &Node<F> {
        &self.nodes[id]
    }

    pub fn link(&self, id: LinkIndex) -> &Link<F> {
        &self.links[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// The link's normal as seen from `node_id`, which must be one of its
    /// two endpoints. Flips sign when viewed from the "other" side.
    pub fn normal_from(&self, link_id: LinkIndex, node_id: NodeIndex) -> Vector3<F>
    where
        F: RealField,
    {
        let link = &self.links[link_id];
        if link.local_node_id == node_id {
            link.normal.as_vector()
        } else {
            -link.normal.as_vector()
        }
    }

    /// Count of nodes reachable from a foundation, ignoring gravity and
    /// conductivity entirely — pure topological BFS over the links
    /// (mirrors the original `LayerStructure::reachedCount()`, which this
    /// crate also computes, with gravity, via
    /// [`crate::decomposition::DepthDecomposition`] during a solve; this
    /// standalone variant lets `StructureData` answer the same question
    /// cheaply without running the solver).
    pub fn foundation_reachable_count(&self) -> usize {
        let mut adjacency: Vec<Vec<NodeIndex>> = vec![Vec::new(); self.nodes.len()];
        for link in &self.links {
            adjacency[link.local_node_id].push(link.other_node_id);
            adjacency[link.other_node_id].push(link.local_node_id);
        }
        let mut reached = vec![false; self.nodes.len()];
        let mut stack: Vec<NodeIndex> = (0..self.nodes.len())
            .filter(|&i| self.nodes[i].is_foundation)
            .collect();
        for &id in &stack {
            reached[id] = true;
        }
        let mut count = stack.len();
        while let Some(node_id) = stack.pop() {
            for &other in &adjacency[node_id] {
                if !reached[other] {
                    reached[other] = true;
                    count += 1;
                    stack.push(other);
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_x() -> NormalizedVec3<f64> {
        NormalizedVec3::try_new(Vector3::new(1.0, 0.0, 0.0)).unwrap()
    }

    #[test]
    fn add_node_returns_stable_indices() {
        let mut s = Structure::<f64>::new();
        let a = s.add_node(1.0, false);
        let b = s.add_node(2.0, true);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(s.node_count(), 2);
    }

    #[test]
    fn add_link_rejects_self_link() {
        let mut s = Structure::<f64>::new();
        let a = s.add_node(1.0, false);
        let err = s
            .add_link(a, a, unit_x(), Stress::zero())
            .unwrap_err();
        assert!(matches!(err, GustaveError::SelfLink(_)));
    }

    #[test]
    fn add_link_rejects_out_of_range_endpoints() {
        let mut s = Structure::<f64>::new();
        let a = s.add_node(1.0, false);
        let err = s
            .add_link(a, 5, unit_x(), Stress::zero())
            .unwrap_err();
        assert!(matches!(err, GustaveError::NodeIndexOutOfRange { .. }));
    }

    #[test]
    fn contact_index_opposite_round_trips() {
        let c = ContactIndex {
            link_id: 3,
            is_on_local_node: true,
        };
        assert_eq!(c.opposite().opposite(), c);
    }
}
