//! Error taxonomy for the crate (spec.md §7).
//!
//! Mirrors the teacher's `ccx-io::error` module: a single `thiserror`-derived
//! enum and a crate-local `Result` alias. Nothing here panics or logs;
//! argument validation and transaction validation fail at construction time
//! and leave caller-visible state untouched.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GustaveError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GustaveError {
    #[error("{field} must be strictly positive (got {value})")]
    NonPositive { field: &'static str, value: f64 },

    #[error("cannot normalize a vector with magnitude {magnitude} (below the threshold)")]
    DegenerateVector { magnitude: f64 },

    #[error("link endpoints must differ (got node {0} twice)")]
    SelfLink(usize),

    #[error("node index {index} out of range (structure has {len} nodes)")]
    NodeIndexOutOfRange { index: usize, len: usize },

    #[error("block {0:?} is added and removed in the same transaction")]
    AddRemoveConflict(crate::scene::BlockIndex),

    #[error("block {0:?} is added twice in the same transaction")]
    DuplicateAdd(crate::scene::BlockIndex),

    #[error("block {0:?} cannot be removed: it is not in the scene")]
    RemoveMissing(crate::scene::BlockIndex),

    #[error("no block at {0:?}")]
    NoSuchBlock(crate::scene::BlockIndex),

    #[error("no structure with id {0:?}")]
    NoSuchStructure(crate::scene::StructureId),
}
