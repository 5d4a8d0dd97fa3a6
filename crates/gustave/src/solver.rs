//! C8 — `Force1Solver`: orchestrates {layer → clusters → basic} until
//! convergence or the iteration cap (spec.md §4.6).

use std::sync::Arc;

use nalgebra::{RealField, Vector3};
use num_traits::Float;

use crate::basic_step::BasicStepRunner;
use crate::cluster_step::ClusterStepRunner;
use crate::decomposition::{ClusterDecomposition, DepthDecomposition, LayerDecomposition, LayerStructure};
use crate::error::{GustaveError, Result};
use crate::f1_structure::F1Structure;
use crate::force_repartition::ForceRepartition;
use crate::graph::{ContactIndex, NodeIndex, Structure};
use crate::layer_step::LayerStepRunner;

/// Bounds the iteration and termination tolerance of a solve. Validated at
/// construction (spec.md §6/§7).
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig<F> {
    pub g: Vector3<F>,
    pub target_max_error: F,
    pub max_iterations: u64,
}

impl<F: Float + RealField> SolverConfig<F> {
    pub fn new(g: Vector3<F>, target_max_error: F, max_iterations: u64) -> Result<Self> {
        if target_max_error <= F::zero() {
            return Err(GustaveError::NonPositive {
                field: "target_max_error",
                value: target_max_error.to_f64().unwrap_or(0.0),
            });
        }
        // Fail fast on a degenerate gravity vector here rather than lazily
        // inside F1Structure::new, so `Force1Solver::run` itself is
        // infallible.
        crate::vector::NormalizedVec3::try_new(g)?;
        Ok(Self {
            g,
            target_max_error,
            max_iterations,
        })
    }
}

/// The final state of a converged solve: immutable potentials plus a
/// shared-ownership reference to the solver-level [`Structure`] (spec.md
/// §5's concurrency note). Lazily builds a [`ForceRepartition`] per query.
pub struct Solution<F> {
    structure: Arc<Structure<F>>,
    f_structure: F1Structure<F>,
    potentials: Vec<F>,
    config: SolverConfig<F>,
}

impl<F: Float> Solution<F> {
    pub fn structure(&self) -> &Structure<F> {
        &self.structure
    }

    pub fn config(&self) -> &SolverConfig<F> {
        &self.config
    }

    pub fn potential_of(&self, node: NodeIndex) -> F {
        self.potentials[node]
    }

    pub fn weight_of(&self, node: NodeIndex) -> F {
        self.f_structure.weight(node)
    }

    fn force_repartition(&self) -> ForceRepartition<F> {
        ForceRepartition::new(&self.f_structure, &self.potentials)
    }

    pub fn relative_error_of(&self, node: NodeIndex) -> F {
        self.force_repartition().stats_of(node).relative_error
    }

    pub fn max_relative_error(&self) -> F {
        self.force_repartition().max_relative_error()
    }

    pub fn sum_relative_error(&self) -> F {
        self.force_repartition().sum_relative_error()
    }

    pub fn force_on_contact(&self, index: ContactIndex) -> F {
        self.force_repartition().force_on_contact(index)
    }

    pub fn force_vector_on_contact(&self, index: ContactIndex) -> Vector3<F>
    where
        F: RealField,
    {
        self.force_repartition().force_vector_on_contact(index)
    }
}

/// `Solver::Result` of spec.md §6: `solution` is `None` when not converged
/// or the structure was unsolvable.
pub struct SolveResult<F> {
    pub iterations: u64,
    pub solution: Option<Solution<F>>,
}

impl<F: Float> SolveResult<F> {
    pub fn is_solved(&self) -> bool {
        self.solution.is_some()
    }

    fn unsolved(iterations: u64) -> Self {
        Self {
            iterations,
            solution: None,
        }
    }
}

pub struct Force1Solver<F> {
    config: SolverConfig<F>,
}

impl<F: Float + RealField + Send + Sync> Force1Solver<F> {
    pub fn new(config: SolverConfig<F>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig<F> {
        &self.config
    }

    pub fn run(&self, structure: Arc<Structure<F>>) -> SolveResult<F> {
        let f_structure = F1Structure::new(Arc::clone(&structure), self.config.g)
            .expect("gravity vector validated at SolverConfig::new");

        let depth = DepthDecomposition::compute(&f_structure, &structure);
        let layer_decomposition = LayerDecomposition::compute(&f_structure, &depth);
        let layer_structure = LayerStructure::build(layer_decomposition, depth.reached_count);
        let cluster_decomposition = ClusterDecomposition::compute(&f_structure, &depth);

        if layer_structure.reached_count < structure.node_count() {
            return SolveResult::unsolved(0);
        }

        let n = structure.node_count();
        let mut potentials = vec![F::zero(); n];
        let mut next_potentials = vec![F::zero(); n];

        let layer_runner = LayerStepRunner::new();
        let cluster_runner = ClusterStepRunner::new();
        let basic_runner = BasicStepRunner::new();

        for iteration in 1..=self.config.max_iterations {
            layer_runner.run_step(&layer_structure, &mut potentials, self.config.target_max_error);
            for cluster in &cluster_decomposition.clusters {
                cluster_runner.run_step(cluster, &mut potentials, self.config.target_max_error);
            }

            let step_result = basic_runner.run_step(
                &structure,
                &f_structure,
                &potentials,
                &mut next_potentials,
                self.config.target_max_error,
            );
            std::mem::swap(&mut potentials, &mut next_potentials);

            if step_result.current_max_error < self.config.target_max_error {
                return SolveResult {
                    iterations: iteration,
                    solution: Some(Solution {
                        structure,
                        f_structure,
                        potentials,
                        config: self.config,
                    }),
                };
            }
        }

        SolveResult::unsolved(self.config.max_iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stress::Stress;
    use crate::vector::NormalizedVec3;

    fn three_block_column() -> Arc<Structure<f64>> {
        let mut structure = Structure::<f64>::new();
        let foundation = structure.add_node(14_400.0, true);
        let mid = structure.add_node(14_400.0, false);
        let top = structure.add_node(14_400.0, false);
        let up = NormalizedVec3::try_new(Vector3::new(0.0, 1.0, 0.0)).unwrap();
        let cond = Stress::new(1.0e7, 1.0e7, 1.0e7);
        structure.add_link(foundation, mid, up, cond).unwrap();
        structure.add_link(mid, top, up, cond).unwrap();
        Arc::new(structure)
    }

    #[test]
    fn three_block_column_converges_and_balances_weight() {
        let structure = three_block_column();
        let config = SolverConfig::new(Vector3::new(0.0, -10.0, 0.0), 1e-3, 1000).unwrap();
        let solver = Force1Solver::new(config);
        let result = solver.run(structure);
        assert!(result.is_solved());
        let solution = result.solution.unwrap();
        assert!(solution.max_relative_error() < 2.0 * 1e-3);
    }

    #[test]
    fn floating_cube_is_unsolved() {
        let mut structure = Structure::<f64>::new();
        structure.add_node(10.0, false);
        let structure = Arc::new(structure);
        let config = SolverConfig::new(Vector3::new(0.0, -10.0, 0.0), 1e-3, 100).unwrap();
        let solver = Force1Solver::new(config);
        let result = solver.run(structure);
        assert!(!result.is_solved());
    }

    #[test]
    fn lone_foundation_is_trivially_solved_with_zero_error() {
        let mut structure = Structure::<f64>::new();
        structure.add_node(10.0, true);
        let config = SolverConfig::new(Vector3::new(0.0, -10.0, 0.0), 1e-3, 10).unwrap();
        let result = Force1Solver::new(config).run(Arc::new(structure));
        assert!(result.is_solved());
        let solution = result.solution.unwrap();
        assert_eq!(solution.max_relative_error(), 0.0);
    }

    #[test]
    fn convergence_cap_reports_unsolved_then_solved() {
        let structure = three_block_column();
        let config_capped = SolverConfig::new(Vector3::new(0.0, -10.0, 0.0), 1e-6, 1).unwrap();
        let capped = Force1Solver::new(config_capped).run(Arc::clone(&structure));
        assert!(!capped.is_solved());

        let config_full = SolverConfig::new(Vector3::new(0.0, -10.0, 0.0), 1e-6, 2000).unwrap();
        let full = Force1Solver::new(config_full).run(structure);
        assert!(full.is_solved());
    }
}
