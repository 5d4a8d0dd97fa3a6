//! C7 — `ClusterStepRunner`: same idea as C6 at cluster granularity
//! (spec.md §4.5).
//!
//! Unlike layers, clusters are not chained by a `low_layer_id`: a cluster's
//! lower contacts may reach into several different lower clusters, so each
//! cluster is solved and applied immediately against the live potential
//! buffer (Gauss-Seidel style) rather than composed through a separate
//! offset buffer.

use num_traits::Float;

use crate::decomposition::Cluster;
use crate::layer_step::group_force_point;
use crate::root_finder::find_root;

const PER_CLUSTER_ERROR_FACTOR: f64 = 0.75;

pub(crate) struct ClusterStepRunner;

impl ClusterStepRunner {
    pub fn new() -> Self {
        Self
    }

    /// Solves and applies one cluster's balance offset in place.
    pub fn run_step<F: Float>(&self, cluster: &Cluster<F>, potentials: &mut [F], target_max_error: F) {
        if cluster.low_contacts.is_empty() {
            return;
        }
        let per_cluster_factor = F::from(PER_CLUSTER_ERROR_FACTOR).unwrap();
        let max_force_error = target_max_error * per_cluster_factor * cluster.cumulated_weight;

        let eval = |offset: F| {
            group_force_point(potentials, &cluster.low_contacts, cluster.cumulated_weight, offset)
        };
        let start = eval(F::zero());
        let delta = find_root(F::zero(), start, max_force_error, eval);

        for &node_id in &cluster.nodes {
            potentials[node_id] = potentials[node_id] + delta;
        }
    }
}
