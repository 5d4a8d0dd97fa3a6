//! C10 — the transaction engine (spec.md §4.8). `Transaction` is a builder
//! for a batch of add/remove commands; [`run_transaction`] is "SceneUpdater"
//! — it validates the batch, computes the set of structures the batch
//! invalidates, and re-explores from every touched block to rebuild them.

use std::collections::{HashSet, VecDeque};

use nalgebra::{RealField, Vector3};
use num_traits::Float;

use crate::error::{GustaveError, Result};
use crate::graph::{ContactIndex, NodeIndex, Structure};
use crate::vector::NormalizedVec3;

use super::block::{BlockConstructionInfo, BlockData, BlockIndex, Direction};
use super::structure_data::StructureData;
use super::{CuboidGridScene, StructureId};

enum Command<F, UserData> {
    Add(BlockConstructionInfo<F, UserData>),
    Remove(BlockIndex),
}

/// An unordered batch of add/remove commands (spec.md §6). Builder style,
/// mirroring the teacher's `Sets` construction pattern.
pub struct Transaction<F, UserData> {
    commands: Vec<Command<F, UserData>>,
}

impl<F, UserData> Default for Transaction<F, UserData> {
    fn default() -> Self {
        Self { commands: Vec::new() }
    }
}

impl<F, UserData> Transaction<F, UserData> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, info: BlockConstructionInfo<F, UserData>) -> &mut Self {
        self.commands.push(Command::Add(info));
        self
    }

    pub fn remove_block(&mut self, index: BlockIndex) -> &mut Self {
        self.commands.push(Command::Remove(index));
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        self.commands.clear();
        self
    }

    fn additions(&self) -> impl Iterator<Item = &BlockConstructionInfo<F, UserData>> {
        self.commands.iter().filter_map(|c| match c {
            Command::Add(info) => Some(info),
            Command::Remove(_) => None,
        })
    }

    fn removals(&self) -> impl Iterator<Item = BlockIndex> + '_ {
        self.commands.iter().filter_map(|c| match c {
            Command::Remove(idx) => Some(*idx),
            Command::Add(_) => None,
        })
    }
}

/// The output of a transaction: the structures it created and the ones it
/// tore down (spec.md §6).
#[derive(Debug, Clone, Default)]
pub struct TransactionResult {
    pub new_structures: Vec<StructureId>,
    pub removed_structures: Vec<StructureId>,
}

pub(crate) fn run_transaction<F, UserData>(
    scene: &mut CuboidGridScene<F, UserData>,
    transaction: Transaction<F, UserData>,
) -> Result<TransactionResult>
where
    F: Float + RealField,
    UserData: Clone,
{
    validate(scene, &transaction)?;

    let removed_indices: HashSet<BlockIndex> = transaction.removals().collect();

    let mut dirty: HashSet<StructureId> = HashSet::new();
    for idx in &removed_indices {
        collect_owners(scene, *idx, &mut dirty);
    }
    for info in transaction.additions() {
        for direction in Direction::ALL {
            if let Some(neighbor) = info.index.neighbor(direction) {
                if removed_indices.contains(&neighbor) {
                    continue;
                }
                collect_owners(scene, neighbor, &mut dirty);
            }
        }
    }

    let mut to_reexplore: Vec<BlockIndex> = Vec::new();
    for key in &dirty {
        if let Some(data) = scene.structures.remove(*key) {
            for &idx in data.blocks() {
                if let Some(block) = scene.blocks.get_mut(&idx) {
                    block.structure_id = None;
                }
                scene.unregister_foundation_membership(idx, *key);
                if !removed_indices.contains(&idx) {
                    to_reexplore.push(idx);
                }
            }
        }
    }

    for idx in &removed_indices {
        scene.blocks.remove(idx);
    }
    for info in transaction.commands.into_iter().filter_map(|c| match c {
        Command::Add(info) => Some(info),
        Command::Remove(_) => None,
    }) {
        let idx = info.index;
        to_reexplore.push(idx);
        scene.blocks.insert(idx, BlockData { info, structure_id: None });
    }

    to_reexplore.sort();
    to_reexplore.dedup();

    let mut new_structures = Vec::new();
    for seed in to_reexplore {
        let Some(block) = scene.blocks.get(&seed) else {
            continue;
        };
        if block.info.is_foundation {
            continue;
        }
        if block.structure_id.is_some() {
            continue;
        }
        new_structures.push(explore_structure(scene, seed));
    }

    Ok(TransactionResult {
        new_structures,
        removed_structures: dirty.into_iter().collect(),
    })
}

fn validate<F, UserData>(scene: &CuboidGridScene<F, UserData>, transaction: &Transaction<F, UserData>) -> Result<()> {
    let mut added: HashSet<BlockIndex> = HashSet::new();
    for info in transaction.additions() {
        if !added.insert(info.index) {
            return Err(GustaveError::DuplicateAdd(info.index));
        }
    }
    let mut removed: HashSet<BlockIndex> = HashSet::new();
    for idx in transaction.removals() {
        if !removed.insert(idx) {
            return Err(GustaveError::RemoveMissing(idx));
        }
        if added.contains(&idx) {
            return Err(GustaveError::AddRemoveConflict(idx));
        }
        if !scene.blocks.contains_key(&idx) {
            return Err(GustaveError::RemoveMissing(idx));
        }
    }
    Ok(())
}

fn collect_owners<F, UserData>(
    scene: &CuboidGridScene<F, UserData>,
    idx: BlockIndex,
    dirty: &mut HashSet<StructureId>,
) {
    let Some(block) = scene.blocks.get(&idx) else {
        return;
    };
    if block.info.is_foundation {
        if let Some(owners) = scene.foundation_membership.get(&idx) {
            dirty.extend(owners.iter().copied());
        }
    } else if let Some(owner) = block.structure_id {
        dirty.insert(owner);
    }
}

/// BFS from `seed` (a non-foundation block with no current structure),
/// building a fresh [`Structure`] and [`StructureData`], per spec.md §4.8
/// step 4.
fn explore_structure<F, UserData>(scene: &mut CuboidGridScene<F, UserData>, seed: BlockIndex) -> StructureId
where
    F: Float + RealField,
    UserData: Clone,
{
    let mut structure = Structure::<F>::new();
    let mut node_of_block: std::collections::HashMap<BlockIndex, NodeIndex> = std::collections::HashMap::new();
    let mut contact_index_of: std::collections::HashMap<(BlockIndex, Direction), ContactIndex> =
        std::collections::HashMap::new();
    let mut blocks: Vec<BlockIndex> = Vec::new();

    let seed_info = &scene.blocks[&seed].info;
    let seed_node = structure.add_node(seed_info.mass, seed_info.is_foundation);
    node_of_block.insert(seed, seed_node);
    blocks.push(seed);

    let mut queue: VecDeque<BlockIndex> = VecDeque::new();
    queue.push_back(seed);

    while let Some(current) = queue.pop_front() {
        for direction in Direction::ALL {
            let Some(neighbor_idx) = current.neighbor(direction) else {
                continue;
            };
            let Some(neighbor_data) = scene.blocks.get(&neighbor_idx) else {
                continue;
            };
            let neighbor_is_foundation = neighbor_data.info.is_foundation;

            if node_of_block.get(&neighbor_idx).is_none() {
                let node = structure.add_node(neighbor_data.info.mass, neighbor_is_foundation);
                node_of_block.insert(neighbor_idx, node);
                blocks.push(neighbor_idx);
                if !neighbor_is_foundation {
                    queue.push_back(neighbor_idx);
                }
            }

            // Canonicalize on the positive-direction side regardless of
            // which endpoint the BFS happens to visit first: a foundation
            // neighbour is never enqueued, so if we only created the link
            // when `direction.is_positive()` a foundation sitting in the
            // negative direction from its non-foundation neighbour (the
            // common case — gravity pulls down onto a foundation below)
            // would never be visited from its own side and the link would
            // be silently dropped.
            let (low, high, canonical_direction) = if direction.is_positive() {
                (current, neighbor_idx, direction)
            } else {
                (neighbor_idx, current, direction.opposite())
            };
            if !contact_index_of.contains_key(&(low, canonical_direction)) {
                let area = scene.contact_area_along(canonical_direction);
                let thickness = scene.thickness_along(canonical_direction);
                let low_info = &scene.blocks[&low].info;
                let high_info = &scene.blocks[&high].info;
                let conductivity = low_info
                    .max_pressure_stress
                    .min(&high_info.max_pressure_stress)
                    .scale(area / thickness);
                let normal = NormalizedVec3::try_new(direction_unit_vector::<F>(canonical_direction))
                    .expect("axis-aligned unit vectors always normalize");
                let low_node = node_of_block[&low];
                let high_node = node_of_block[&high];
                let link_id = structure
                    .add_link(low_node, high_node, normal, conductivity)
                    .expect("endpoints were just created on this structure");
                contact_index_of.insert(
                    (low, canonical_direction),
                    ContactIndex {
                        link_id,
                        is_on_local_node: true,
                    },
                );
                contact_index_of.insert(
                    (high, canonical_direction.opposite()),
                    ContactIndex {
                        link_id,
                        is_on_local_node: false,
                    },
                );
            }
        }
    }

    let key = scene.structures.insert_with_key(|_| {
        StructureData::new(structure, blocks.clone(), node_of_block, contact_index_of)
    });
    for &idx in &blocks {
        let is_foundation = scene.blocks[&idx].info.is_foundation;
        if is_foundation {
            scene.register_foundation_membership(idx, key);
        } else {
            scene.blocks.get_mut(&idx).unwrap().structure_id = Some(key);
        }
    }
    key
}

fn direction_unit_vector<F: Float + RealField>(direction: Direction) -> Vector3<F> {
    direction.axis_unit_vector()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::CuboidGridScene;
    use crate::stress::Stress;

    fn info(x: i32, y: i32, z: i32, mass: f64, is_foundation: bool) -> BlockConstructionInfo<f64, ()> {
        BlockConstructionInfo::new(
            BlockIndex::new(x, y, z),
            Stress::new(20_000.0, 20_000.0, 20_000.0),
            mass,
            is_foundation,
            (),
        )
        .unwrap()
    }

    #[test]
    fn three_block_column_forms_one_structure() {
        let mut scene = CuboidGridScene::<f64, ()>::new(Vector3::new(3.0, 2.0, 1.0)).unwrap();
        let mut txn = Transaction::new();
        txn.add_block(info(0, 0, 0, 14_400.0, true));
        txn.add_block(info(0, 1, 0, 14_400.0, false));
        txn.add_block(info(0, 2, 0, 14_400.0, false));
        let result = scene.modify(txn).unwrap();
        assert_eq!(result.new_structures.len(), 1);
        assert!(result.removed_structures.is_empty());
        assert_eq!(scene.structures.len(), 1);
    }

    #[test]
    fn transaction_with_add_remove_conflict_is_rejected() {
        let mut scene = CuboidGridScene::<f64, ()>::new(Vector3::new(1.0, 1.0, 1.0)).unwrap();
        let mut seed = Transaction::new();
        seed.add_block(info(0, 0, 0, 1.0, true));
        scene.modify(seed).unwrap();

        let mut txn = Transaction::new();
        txn.add_block(info(0, 0, 0, 1.0, true));
        txn.remove_block(BlockIndex::new(0, 0, 0));
        let err = scene.modify(txn).unwrap_err();
        assert!(matches!(err, GustaveError::AddRemoveConflict(_)));
        assert_eq!(scene.blocks.len(), 1);
    }

    #[test]
    fn floating_non_foundation_block_forms_its_own_structure() {
        let mut scene = CuboidGridScene::<f64, ()>::new(Vector3::new(1.0, 1.0, 1.0)).unwrap();
        let mut txn = Transaction::new();
        txn.add_block(info(0, 5, 0, 10.0, false));
        let result = scene.modify(txn).unwrap();
        assert_eq!(result.new_structures.len(), 1);
        let structure = scene.structures.get(result.new_structures[0]).unwrap();
        assert_eq!(structure.blocks().len(), 1);
    }

    #[test]
    fn removing_a_block_dirties_and_may_split_its_structure() {
        let mut scene = CuboidGridScene::<f64, ()>::new(Vector3::new(1.0, 1.0, 1.0)).unwrap();
        let mut seed = Transaction::new();
        seed.add_block(info(0, 0, 0, 1.0, true));
        seed.add_block(info(0, 1, 0, 1.0, false));
        seed.add_block(info(0, 2, 0, 1.0, false));
        scene.modify(seed).unwrap();
        assert_eq!(scene.structures.len(), 1);

        let mut txn = Transaction::new();
        txn.remove_block(BlockIndex::new(0, 1, 0));
        let result = scene.modify(txn).unwrap();
        assert_eq!(result.removed_structures.len(), 1);
        // (0,2,0) survives but is now disconnected from the foundation.
        assert_eq!(scene.blocks.len(), 2);
    }
}
