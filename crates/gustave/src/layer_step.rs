//! C6 — `LayerStepRunner`: per-layer global offset pass (spec.md §4.4).

use num_traits::Float;

use crate::decomposition::{LayerStructure, LowerContact};
use crate::root_finder::find_root;

const PER_LAYER_ERROR_FACTOR: f64 = 0.75;

pub(crate) struct LayerStepRunner;

impl LayerStepRunner {
    pub fn new() -> Self {
        Self
    }

    /// Walks layers in ascending id order (bottom to top), computing each
    /// non-foundation layer's balance offset against potentials that are
    /// *not yet* shifted by this pass, then adds every layer's cumulative
    /// offset onto `potentials` once all layers have been solved.
    pub fn run_step<F: Float>(
        &self,
        layer_structure: &LayerStructure<F>,
        potentials: &mut [F],
        target_max_error: F,
    ) {
        let per_layer_factor = F::from(PER_LAYER_ERROR_FACTOR).unwrap();
        let mut cumulative_offset = vec![F::zero(); layer_structure.layer_count()];

        for (layer_id, layer) in layer_structure.layers.iter().enumerate() {
            if layer.is_foundation() {
                cumulative_offset[layer_id] = F::zero();
                continue;
            }
            let max_force_error = target_max_error * per_layer_factor * layer.cumulated_weight;
            let delta = balance_offset(potentials, &layer.low_contacts, layer.cumulated_weight, max_force_error);
            let low_layer_id = layer
                .low_layer_id
                .expect("a non-foundation layer always has a layer beneath it");
            cumulative_offset[layer_id] = cumulative_offset[low_layer_id] + delta;
        }

        for (node_id, &layer_id) in layer_structure.layer_of_node.iter().enumerate() {
            potentials[node_id] = potentials[node_id] + cumulative_offset[layer_id];
        }
    }
}

/// Shared evaluator for both the layer and cluster passes: force across a
/// group's lower contacts as a function of a uniform offset applied to the
/// group's own (upper) potentials.
pub(crate) fn group_force_point<F: Float>(
    potentials: &[F],
    low_contacts: &[LowerContact<F>],
    cumulated_weight: F,
    offset: F,
) -> (F, F) {
    let mut force = cumulated_weight;
    let mut derivative = F::zero();
    for contact in low_contacts {
        let local_p = potentials[contact.upper_node_id] + offset;
        let other_p = potentials[contact.other_node_id];
        let delta = other_p - local_p;
        let (f, d) = if delta >= F::zero() {
            (contact.cond_plus * delta, -contact.cond_plus)
        } else {
            (contact.cond_minus * delta, -contact.cond_minus)
        };
        force = force + f;
        derivative = derivative + d;
    }
    (force, derivative)
}

fn balance_offset<F: Float>(
    potentials: &[F],
    low_contacts: &[LowerContact<F>],
    cumulated_weight: F,
    max_force_error: F,
) -> F {
    let eval = |offset: F| group_force_point(potentials, low_contacts, cumulated_weight, offset);
    let start = eval(F::zero());
    find_root(F::zero(), start, max_force_error, eval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::{DepthDecomposition, LayerDecomposition};
    use crate::f1_structure::F1Structure;
    use crate::force_repartition::ForceRepartition;
    use crate::graph::Structure;
    use crate::stress::Stress;
    use crate::vector::NormalizedVec3;
    use nalgebra::Vector3;
    use std::sync::Arc;

    #[test]
    fn layer_pass_moves_the_tower_toward_equilibrium() {
        let mut structure = Structure::<f64>::new();
        let foundation = structure.add_node(10.0, true);
        let mid = structure.add_node(10.0, false);
        let top = structure.add_node(10.0, false);
        let up = NormalizedVec3::try_new(Vector3::new(0.0, 1.0, 0.0)).unwrap();
        structure
            .add_link(foundation, mid, up, Stress::new(1000.0, 1000.0, 1000.0))
            .unwrap();
        structure
            .add_link(mid, top, up, Stress::new(1000.0, 1000.0, 1000.0))
            .unwrap();
        let structure = Arc::new(structure);
        let f_structure =
            F1Structure::new(Arc::clone(&structure), Vector3::new(0.0, -10.0, 0.0)).unwrap();

        let depth = DepthDecomposition::compute(&f_structure, &structure);
        let layer_decomp = LayerDecomposition::compute(&f_structure, &depth);
        let layer_structure = LayerStructure::build(layer_decomp, depth.reached_count);

        let mut potentials = vec![0.0, 0.0, 0.0];
        let runner = LayerStepRunner::new();
        runner.run_step(&layer_structure, &mut potentials, 1e-3);

        let fr = ForceRepartition::new(&f_structure, &potentials);
        let before = fr.max_relative_error();
        assert!(before < 1.0);
    }
}
