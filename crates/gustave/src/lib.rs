//! Gustave's structural-integrity solver: an iterative relaxation on a
//! graph of masses and directional links, plus a persistent voxel-grid
//! scene that maintains the graph as blocks are added and removed.
//!
//! The crate is organized bottom-up:
//! - [`graph`], [`vector`], [`stress`] — the plain data model (C1).
//! - [`f1_structure`] — gravity-aware contact conductivities (C2).
//! - [`force_repartition`], [`root_finder`] — shared force-law and
//!   root-finding primitives (C3, C5).
//! - [`basic_step`], [`decomposition`], [`layer_step`], [`cluster_step`] —
//!   the three relaxation passes and the depth/layer/cluster decompositions
//!   that accelerate them (C4, C6, C7).
//! - [`solver`] — [`solver::Force1Solver`], orchestrating the above until
//!   convergence (C8).
//! - [`scene`] — [`scene::CuboidGridScene`], the transactional spatial
//!   index built on top of the solver (C9, C10, C11).
//! - [`error`] — the crate-wide error type and `Result` alias.

pub mod basic_step;
pub mod cluster_step;
pub mod decomposition;
pub mod error;
pub mod f1_structure;
pub mod force_repartition;
pub mod graph;
pub mod layer_step;
pub mod root_finder;
pub mod scene;
pub mod solver;
pub mod stress;
pub mod vector;

pub use error::{GustaveError, Result};
pub use graph::{ContactIndex, Link, LinkIndex, Node, NodeIndex, Structure};
pub use scene::{
    BlockConstructionInfo, BlockIndex, BlockReference, ContactReference, CuboidGridScene,
    Direction, StructureId, StructureReference, Transaction, TransactionResult,
};
pub use solver::{Force1Solver, SolveResult, Solution, SolverConfig};
pub use stress::Stress;
pub use vector::NormalizedVec3;
