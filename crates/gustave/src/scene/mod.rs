//! C9 — `CuboidGridScene`: the persistent spatial index of blocks on an
//! integer lattice, and its structure partition (spec.md §3/§4.7).

mod block;
mod reference;
mod structure_data;
mod transaction;

use std::collections::HashMap;

use nalgebra::{RealField, Vector3};
use num_traits::Float;
use slotmap::{new_key_type, SlotMap};

pub use block::{BlockConstructionInfo, BlockIndex, Direction};
pub use reference::{BlockReference, ContactReference, StructureReference};
pub use transaction::{Transaction, TransactionResult};

use block::BlockData;
use structure_data::StructureData;

use crate::error::{GustaveError, Result};
use crate::solver::{Force1Solver, SolveResult};

new_key_type! {
    /// Uniquely identifies a live structure; never reused while the scene
    /// lives, satisfied by `slotmap`'s generational keys (spec.md §3's
    /// "monotonically increasing id that is never reused" — the generation
    /// counter gives the same externally-observable guarantee without a
    /// separate hand-rolled counter).
    pub struct StructureId;
}

pub struct CuboidGridScene<F, UserData = ()> {
    block_size: Vector3<F>,
    blocks: HashMap<BlockIndex, BlockData<F, UserData>>,
    structures: SlotMap<StructureId, StructureData<F, UserData>>,
    foundation_membership: HashMap<BlockIndex, Vec<StructureId>>,
}

impl<F: Float + RealField, UserData: Clone> CuboidGridScene<F, UserData> {
    pub fn new(block_size: Vector3<F>) -> Result<Self> {
        for (field, value) in [
            ("block_size.x", block_size.x),
            ("block_size.y", block_size.y),
            ("block_size.z", block_size.z),
        ] {
            if value <= F::zero() {
                return Err(GustaveError::NonPositive {
                    field,
                    value: value.to_f64().unwrap_or(0.0),
                });
            }
        }
        Ok(Self {
            block_size,
            blocks: HashMap::new(),
            structures: SlotMap::with_key(),
            foundation_membership: HashMap::new(),
        })
    }

    pub fn block_size(&self) -> Vector3<F> {
        self.block_size
    }

    /// Product of the two block-size components perpendicular to
    /// `direction` (spec.md §4.7).
    pub fn contact_area_along(&self, direction: Direction) -> F {
        match direction {
            Direction::PlusX | Direction::MinusX => self.block_size.y * self.block_size.z,
            Direction::PlusY | Direction::MinusY => self.block_size.x * self.block_size.z,
            Direction::PlusZ | Direction::MinusZ => self.block_size.x * self.block_size.y,
        }
    }

    /// The block-size component along `direction` (spec.md §4.7).
    pub fn thickness_along(&self, direction: Direction) -> F {
        match direction {
            Direction::PlusX | Direction::MinusX => self.block_size.x,
            Direction::PlusY | Direction::MinusY => self.block_size.y,
            Direction::PlusZ | Direction::MinusZ => self.block_size.z,
        }
    }

    pub fn modify(&mut self, transaction: Transaction<F, UserData>) -> Result<TransactionResult> {
        transaction::run_transaction(self, transaction)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn structure_count(&self) -> usize {
        self.structures.len()
    }

    pub fn blocks(&self) -> impl Iterator<Item = BlockReference<'_, F, UserData>> {
        self.blocks.keys().map(move |&idx| BlockReference::new(self, idx))
    }

    pub fn structures(&self) -> impl Iterator<Item = StructureReference<'_, F, UserData>> {
        self.structures
            .keys()
            .map(move |id| StructureReference::new(self, id))
    }

    /// Total lookup: `None` for an absent index (spec.md §7's "find"
    /// flavour).
    pub fn find_block(&self, index: BlockIndex) -> Option<BlockReference<'_, F, UserData>> {
        self.blocks.contains_key(&index).then(|| BlockReference::new(self, index))
    }

    /// Partial lookup: errors for an absent index (spec.md §7's "at"
    /// flavour).
    pub fn block_at(&self, index: BlockIndex) -> Result<BlockReference<'_, F, UserData>> {
        self.find_block(index).ok_or(GustaveError::NoSuchBlock(index))
    }

    pub fn find_structure(&self, id: StructureId) -> Option<StructureReference<'_, F, UserData>> {
        self.structures.contains_key(id).then(|| StructureReference::new(self, id))
    }

    pub fn structure_at(&self, id: StructureId) -> Result<StructureReference<'_, F, UserData>> {
        self.find_structure(id).ok_or(GustaveError::NoSuchStructure(id))
    }

    /// Solves the structure with `solver` and caches the result on it,
    /// replacing whatever was cached before (spec.md §4.9's "solved? →
    /// solution handle"; see [`StructureData`] for the caching-scope note).
    pub fn solve_structure(&mut self, id: StructureId, solver: &Force1Solver<F>) -> Result<&SolveResult<F>>
    where
        F: Send + Sync,
    {
        let data = self
            .structures
            .get_mut(id)
            .ok_or(GustaveError::NoSuchStructure(id))?;
        let result = solver.run(std::sync::Arc::clone(&data.structure));
        data.last_solution = Some(result);
        Ok(data.last_solution.as_ref().unwrap())
    }

    pub(crate) fn register_foundation_membership(&mut self, index: BlockIndex, id: StructureId) {
        self.foundation_membership.entry(index).or_default().push(id);
    }

    pub(crate) fn unregister_foundation_membership(&mut self, index: BlockIndex, id: StructureId) {
        if let Some(owners) = self.foundation_membership.get_mut(&index) {
            owners.retain(|&o| o != id);
            if owners.is_empty() {
                self.foundation_membership.remove(&index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_size_must_be_strictly_positive() {
        let err = CuboidGridScene::<f64, ()>::new(Vector3::new(0.0, 1.0, 1.0)).unwrap_err();
        assert!(matches!(err, GustaveError::NonPositive { .. }));
    }

    #[test]
    fn contact_area_is_perpendicular_product() {
        let scene = CuboidGridScene::<f64, ()>::new(Vector3::new(3.0, 2.0, 1.0)).unwrap();
        assert_eq!(scene.contact_area_along(Direction::PlusY), 3.0);
        assert_eq!(scene.thickness_along(Direction::PlusY), 2.0);
    }
}
