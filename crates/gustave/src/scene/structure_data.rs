//! C11 — `StructureData`: the per-structure block ↔ solver-node mapping and
//! the compiled solver [`Structure`] it feeds to [`crate::solver::Force1Solver`]
//! (spec.md §3/§4.8).

use std::collections::HashMap;

use num_traits::Float;

use crate::graph::{ContactIndex, NodeIndex, Structure};
use crate::solver::SolveResult;

use super::block::{BlockIndex, Direction};

/// Owns the solver-level graph for one connected component, plus the
/// mapping that lets scene code translate between lattice coordinates and
/// solver node ids (spec.md §3 "Lifecycle": `StructureData` owns its
/// `Structure` and the block-index → solver-index map).
pub struct StructureData<F, UserData> {
    pub(crate) structure: std::sync::Arc<Structure<F>>,
    pub(crate) blocks: Vec<BlockIndex>,
    pub(crate) node_of_block: HashMap<BlockIndex, NodeIndex>,
    pub(crate) contact_index_of: HashMap<(BlockIndex, Direction), ContactIndex>,
    pub(crate) location_of_contact: HashMap<ContactIndex, (BlockIndex, Direction)>,
    /// Result of the last explicit solve requested through the scene, if
    /// any (spec.md §4.9's "solved? → solution handle"; the scene caches
    /// at most one result per structure, replaced on the next `modify` or
    /// explicit re-solve, rather than the richer cross-transaction caching
    /// policy the out-of-scope world façade implements).
    pub(crate) last_solution: Option<SolveResult<F>>,
    _user_data: std::marker::PhantomData<UserData>,
}

impl<F: Float, UserData> StructureData<F, UserData> {
    pub(crate) fn new(
        structure: Structure<F>,
        blocks: Vec<BlockIndex>,
        node_of_block: HashMap<BlockIndex, NodeIndex>,
        contact_index_of: HashMap<(BlockIndex, Direction), ContactIndex>,
    ) -> Self {
        let location_of_contact = contact_index_of.iter().map(|(&loc, &idx)| (idx, loc)).collect();
        Self {
            structure: std::sync::Arc::new(structure),
            blocks,
            node_of_block,
            contact_index_of,
            location_of_contact,
            last_solution: None,
            _user_data: std::marker::PhantomData,
        }
    }

    pub fn structure(&self) -> &Structure<F> {
        &self.structure
    }

    pub fn blocks(&self) -> &[BlockIndex] {
        &self.blocks
    }

    pub fn node_of(&self, index: BlockIndex) -> Option<NodeIndex> {
        self.node_of_block.get(&index).copied()
    }

    pub fn contact_index_of(&self, index: BlockIndex, direction: Direction) -> Option<ContactIndex> {
        self.contact_index_of.get(&(index, direction)).copied()
    }

    pub fn location_of(&self, index: ContactIndex) -> Option<(BlockIndex, Direction)> {
        self.location_of_contact.get(&index).copied()
    }

    /// Count of nodes reachable from a foundation, surfaced alongside
    /// `structure().node_count()` as a cheap diagnostic (mirrors the
    /// original `LayerStructure::reachedCount()`).
    pub fn reached_count(&self) -> usize {
        self.structure.foundation_reachable_count()
    }

    pub fn is_solved(&self) -> bool {
        self.last_solution.as_ref().is_some_and(SolveResult::is_solved)
    }

    pub fn last_solution(&self) -> Option<&SolveResult<F>> {
        self.last_solution.as_ref()
    }
}
