//! C4 — `BasicStepRunner`: the per-node Newton/secant pass (spec.md §4.3).

use num_traits::Float;
use rayon::prelude::*;

use crate::f1_structure::F1Structure;
use crate::force_repartition::ForceRepartition;
use crate::graph::{NodeIndex, Structure};
use crate::root_finder::find_root;

/// Budgets each node's root-finder tolerance under the global target so the
/// sweep as a whole stays inside `config.targetMaxError` (spec.md §4.3).
const PER_NODE_ERROR_FACTOR: f64 = 0.75;

#[derive(Debug, Clone, Copy)]
pub(crate) struct StepResult<F> {
    /// The worst relative error observed *at entry* to this sweep, i.e.
    /// before any of this sweep's updates were applied (spec.md §4.3 step 6).
    pub current_max_error: F,
}

pub(crate) struct BasicStepRunner;

impl BasicStepRunner {
    pub fn new() -> Self {
        Self
    }

    /// Sweeps every non-foundation node once. Reads exclusively from
    /// `potentials` and writes each node's own slot in `next_potentials`;
    /// the two buffers must swap after this call returns. Independent
    /// across nodes, so the sweep runs in parallel.
    pub fn run_step<F: Float + Send + Sync>(
        &self,
        structure: &Structure<F>,
        f_structure: &F1Structure<F>,
        potentials: &[F],
        next_potentials: &mut [F],
        target_max_error: F,
    ) -> StepResult<F> {
        let per_node_factor = F::from(PER_NODE_ERROR_FACTOR).unwrap();
        let fr = ForceRepartition::new(f_structure, potentials);

        let results: Vec<(F, F)> = (0..structure.node_count())
            .into_par_iter()
            .map(|id| {
                if structure.node(id).is_foundation {
                    return (potentials[id], F::zero());
                }
                run_node_step(
                    id,
                    &fr,
                    f_structure,
                    potentials,
                    target_max_error * per_node_factor * f_structure.weight(id),
                )
            })
            .collect();

        let mut current_max_error = F::zero();
        for (id, (next_p, rel_err)) in results.into_iter().enumerate() {
            next_potentials[id] = next_p;
            current_max_error = current_max_error.max(rel_err);
        }

        StepResult { current_max_error }
    }
}

/// The 1-D root-finder of spec.md §4.3 applied to a single node's force law.
fn run_node_step<F: Float>(
    node_id: NodeIndex,
    fr: &ForceRepartition<F>,
    f_structure: &F1Structure<F>,
    potentials: &[F],
    max_force_error: F,
) -> (F, F) {
    let weight = f_structure.weight(node_id);
    let _ = weight;
    let start_stats = fr.stats_of(node_id);
    let start_p = potentials[node_id];

    let eval = |p: F| -> (F, F) {
        let mut force = f_structure.weight(node_id);
        let mut derivative = F::zero();
        for contact in f_structure.contacts(node_id) {
            let delta = potentials[contact.other_node_id] - p;
            let (f, d) = if delta >= F::zero() {
                (contact.cond_plus * delta, -contact.cond_plus)
            } else {
                (contact.cond_minus * delta, -contact.cond_minus)
            };
            force = force + f;
            derivative = derivative + d;
        }
        (force, derivative)
    };

    let next_p = find_root(
        start_p,
        (start_stats.force, start_stats.derivative),
        max_force_error,
        eval,
    );
    (next_p, start_stats.relative_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stress::Stress;
    use crate::vector::NormalizedVec3;
    use nalgebra::Vector3;
    use std::sync::Arc;

    #[test]
    fn a_single_free_node_above_a_foundation_converges() {
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
        let structure = Arc::new(structure);
        let f_structure =
            F1Structure::new(Arc::clone(&structure), Vector3::new(0.0, -10.0, 0.0)).unwrap();

        let mut potentials = vec![0.0, 0.0];
        let mut next_potentials = vec![0.0, 0.0];
        let runner = BasicStepRunner::new();
        for _ in 0..50 {
            runner.run_step(&structure, &f_structure, &potentials, &mut next_potentials, 1e-6);
            std::mem::swap(&mut potentials, &mut next_potentials);
        }

        let fr = ForceRepartition::new(&f_structure, &potentials);
        assert!(fr.stats_of(top).relative_error < 1e-3);
    }
}
