//! C3 — `ForceRepartition`: pure functions from a potential vector to
//! per-node force, derivative, and relative error (spec.md §3/§4.2).

use nalgebra::{RealField, Vector3};
use num_traits::Float;

use crate::f1_structure::{F1Contact, F1Structure};
use crate::graph::{ContactIndex, NodeIndex};

#[derive(Debug, Clone, Copy)]
pub struct NodeStats<F> {
    pub force: F,
    pub derivative: F,
    pub relative_error: F,
}

/// The contact force law of spec.md §3: `ΔP ≥ 0` uses `cond_plus`, else
/// `cond_minus`. `derivative` is `-cond` of whichever side applied.
fn contact_force<F: Float>(contact: &F1Contact<F>, delta: F) -> (F, F) {
    if delta >= F::zero() {
        (contact.cond_plus * delta, -contact.cond_plus)
    } else {
        (contact.cond_minus * delta, -contact.cond_minus)
    }
}

/// Stateless, borrows an [`F1Structure`] and a potential vector. Exposes the
/// force/derivative/relative-error queries the solver and `Solution` both
/// need.
pub struct ForceRepartition<'a, F> {
    f_structure: &'a F1Structure<F>,
    potentials: &'a [F],
}

impl<'a, F: Float> ForceRepartition<'a, F> {
    pub fn new(f_structure: &'a F1Structure<F>, potentials: &'a [F]) -> Self {
        Self {
            f_structure,
            potentials,
        }
    }

    pub fn stats_of(&self, node_id: NodeIndex) -> NodeStats<F> {
        let weight = self.f_structure.weight(node_id);
        let local_p = self.potentials[node_id];
        let mut force = weight;
        let mut derivative = F::zero();
        let mut abs_contact_force_sum = F::zero();

        for contact in self.f_structure.contacts(node_id) {
            let other_p = self.potentials[contact.other_node_id];
            let (f, d) = contact_force(contact, other_p - local_p);
            force = force + f;
            derivative = derivative + d;
            abs_contact_force_sum = abs_contact_force_sum + f.abs();
        }

        let denom = weight + abs_contact_force_sum;
        let relative_error = if denom.is_zero() {
            F::zero()
        } else {
            (force.abs()) / denom
        };

        NodeStats {
            force,
            derivative,
            relative_error,
        }
    }

    /// The global maximum relative error, restricted to non-foundation
    /// nodes — spec.md §8's "Balance" property and boundary case (a lone
    /// foundation with no contacts reports zero) are both scoped this way;
    /// a foundation's own weight has no counterpart contact to balance it
    /// against and would otherwise dominate this figure.
    pub fn max_relative_error(&self) -> F {
        (0..self.f_structure.node_count())
            .filter(|&id| !self.f_structure.structure().node(id).is_foundation)
            .map(|id| self.stats_of(id).relative_error)
            .fold(F::zero(), |acc, e| acc.max(e))
    }

    pub fn sum_relative_error(&self) -> F {
        (0..self.f_structure.node_count())
            .filter(|&id| !self.f_structure.structure().node(id).is_foundation)
            .map(|id| self.stats_of(id).relative_error)
            .fold(F::zero(), |acc, e| acc + e)
    }

    /// Signed scalar force along gravity direction on the given endpoint.
    pub fn force_on_contact(&self, index: ContactIndex) -> F {
        let (node_id, contact) = self.f_structure.contact_at(index);
        let delta = self.potentials[contact.other_node_id] - self.potentials[node_id];
        contact_force(contact, delta).0
    }

    pub fn force_vector_on_contact(&self, index: ContactIndex) -> Vector3<F>
    where
        F: RealField,
    {
        self.f_structure.normalized_g().as_vector() * self.force_on_contact(index)
    }

    /// Direct pairwise force query, independent of a [`ContactIndex`] —
    /// looks up the contact from `to` pointing at `from`.
    pub fn force_coord(&self, to: NodeIndex, from: NodeIndex) -> F {
        let local_p = self.potentials[to];
        self.f_structure
            .contacts(to)
            .iter()
            .filter(|c| c.other_node_id == from)
            .map(|c| contact_force(c, self.potentials[from] - local_p).0)
            .fold(F::zero(), |acc, f| acc + f)
    }

    pub fn force_vector(&self, to: NodeIndex, from: NodeIndex) -> Vector3<F>
    where
        F: RealField,
    {
        self.f_structure.normalized_g().as_vector() * self.force_coord(to, from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Structure;
    use crate::stress::Stress;
    use crate::vector::NormalizedVec3;
    use std::sync::Arc;

    fn column() -> (F1Structure<f64>, Vec<f64>) {
        let mut structure = Structure::<f64>::new();
        let foundation = structure.add_node(10.0, true);
        let top = structure.add_node(10.0, false);
        structure
            .add_link(
                foundation,
                top,
                NormalizedVec3::try_new(Vector3::new(0.0, 1.0, 0.0)).unwrap(),
                Stress::new(1000.0, 1000.0, 1000.0),
            )
            .unwrap();
        let f = F1Structure::new(Arc::new(structure), Vector3::new(0.0, -10.0, 0.0)).unwrap();
        let potentials = vec![0.0, 0.0];
        (f, potentials)
    }

    #[test]
    fn force_conservation_across_a_link() {
        let (f, potentials) = column();
        let fr = ForceRepartition::new(&f, &potentials);
        let on_local = fr.force_on_contact(ContactIndex {
            link_id: 0,
            is_on_local_node: true,
        });
        let on_other = fr.force_on_contact(ContactIndex {
            link_id: 0,
            is_on_local_node: false,
        });
        assert!((on_local + on_other).abs() < 1e-9);
    }

    #[test]
    fn max_relative_error_ignores_foundation_nodes() {
        // A lone foundation with no contacts at all: its own weight is an
        // unbalanced residual with nothing to compare it against, so
        // `max_relative_error` must report zero rather than blowing up to 1.0.
        let mut structure = Structure::<f64>::new();
        structure.add_node(10.0, true);
        let f = F1Structure::new(Arc::new(structure), Vector3::new(0.0, -10.0, 0.0)).unwrap();
        let potentials = vec![0.0];
        let fr = ForceRepartition::new(&f, &potentials);
        assert_eq!(fr.max_relative_error(), 0.0);
        assert_eq!(fr.sum_relative_error(), 0.0);
    }

    #[test]
    fn stats_of_reports_weight_when_balanced() {
        let (f, potentials) = column();
        let fr = ForceRepartition::new(&f, &potentials);
        let stats = fr.stats_of(1);
        assert!((stats.force - 100.0).abs() < 1e-9);
    }
}
