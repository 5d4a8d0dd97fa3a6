//! C11 (part 2) — the read-only reference/iteration surface (spec.md §4.9).
//!
//! The original distinguishes mutable/immutable views at compile time via
//! template parameters; per spec.md §9's design note, this crate instead
//! exposes a single borrowing, read-only reference type per entity kind —
//! Rust's borrow checker already prevents a reference from outliving a
//! `modify` call, so no separate invalid/stale-handle machinery is needed
//! beyond the `find`/`at` duality on the scene itself.

use nalgebra::{RealField, Vector3};
use num_traits::Float;

use crate::graph::ContactIndex;
use crate::stress::Stress;

use super::block::{BlockIndex, Direction};
use super::{CuboidGridScene, StructureId};

#[derive(Clone, Copy)]
pub struct BlockReference<'a, F, UserData> {
    scene: &'a CuboidGridScene<F, UserData>,
    index: BlockIndex,
}

impl<'a, F: Float, UserData: Clone> BlockReference<'a, F, UserData> {
    pub(crate) fn new(scene: &'a CuboidGridScene<F, UserData>, index: BlockIndex) -> Self {
        Self { scene, index }
    }

    pub fn index(&self) -> BlockIndex {
        self.index
    }

    fn data(&self) -> &'a super::BlockData<F, UserData> {
        &self.scene.blocks[&self.index]
    }

    pub fn mass(&self) -> F {
        self.data().info.mass
    }

    pub fn is_foundation(&self) -> bool {
        self.data().info.is_foundation
    }

    pub fn max_pressure_stress(&self) -> Stress<F> {
        self.data().info.max_pressure_stress
    }

    pub fn user_data(&self) -> &'a UserData {
        &self.data().info.user_data
    }

    /// The owning structure, for a non-foundation block; `None` for a
    /// foundation (which may belong to several — use
    /// [`CuboidGridScene::structures`] and filter by membership instead) or
    /// for a not-yet-(re)explored non-foundation block.
    pub fn structure(&self) -> Option<StructureReference<'a, F, UserData>> {
        self.data()
            .structure_id
            .map(|id| StructureReference::new(self.scene, id))
    }

    /// One [`ContactReference`] per face whose contact is valid (spec.md
    /// §3: at least one endpoint non-foundation).
    pub fn contacts(&self) -> impl Iterator<Item = ContactReference<'a, F, UserData>> + 'a {
        let scene = self.scene;
        let index = self.index;
        Direction::ALL.into_iter().filter_map(move |direction| {
            let neighbor = index.neighbor(direction)?;
            let neighbor_data = scene.blocks.get(&neighbor)?;
            let local_is_foundation = scene.blocks[&index].info.is_foundation;
            if local_is_foundation && neighbor_data.info.is_foundation {
                return None;
            }
            ContactReference::find(scene, index, direction)
        })
    }
}

#[derive(Clone, Copy)]
pub struct ContactReference<'a, F, UserData> {
    scene: &'a CuboidGridScene<F, UserData>,
    structure_id: StructureId,
    local_block: BlockIndex,
    direction: Direction,
}

impl<'a, F: Float + RealField, UserData: Clone> ContactReference<'a, F, UserData> {
    /// Builds a contact reference for `(local_block, direction)` if it is a
    /// valid, currently-structured contact.
    pub(crate) fn find(
        scene: &'a CuboidGridScene<F, UserData>,
        local_block: BlockIndex,
        direction: Direction,
    ) -> Option<Self> {
        let local = scene.blocks.get(&local_block)?;
        let structure_id = if local.info.is_foundation {
            let neighbor = local_block.neighbor(direction)?;
            scene.blocks.get(&neighbor)?.structure_id?
        } else {
            local.structure_id?
        };
        Some(Self {
            scene,
            structure_id,
            local_block,
            direction,
        })
    }

    pub fn area(&self) -> F {
        self.scene.contact_area_along(self.direction)
    }

    pub fn normal(&self) -> Vector3<F> {
        self.direction.axis_unit_vector()
    }

    pub fn max_pressure_stress(&self) -> Stress<F> {
        let local = self.local_block();
        let other = self.other_block();
        match other {
            Some(other) => local.max_pressure_stress().min(&other.max_pressure_stress()),
            None => local.max_pressure_stress(),
        }
    }

    pub fn local_block(&self) -> BlockReference<'a, F, UserData> {
        BlockReference::new(self.scene, self.local_block)
    }

    pub fn other_block(&self) -> Option<BlockReference<'a, F, UserData>> {
        let neighbor = self.local_block.neighbor(self.direction)?;
        self.scene.blocks.contains_key(&neighbor).then(|| BlockReference::new(self.scene, neighbor))
    }

    pub fn opposite(&self) -> Option<Self> {
        let other_index = self.local_block.neighbor(self.direction)?;
        Self::find(self.scene, other_index, self.direction.opposite())
    }

    pub fn structure(&self) -> StructureReference<'a, F, UserData> {
        StructureReference::new(self.scene, self.structure_id)
    }

    fn contact_index(&self) -> Option<ContactIndex> {
        self.scene
            .structures
            .get(self.structure_id)?
            .contact_index_of(self.local_block, self.direction)
    }

    pub fn force_vector(&self) -> Option<Vector3<F>> {
        let index = self.contact_index()?;
        let data = self.scene.structures.get(self.structure_id)?;
        let solution = data.last_solution.as_ref()?.solution.as_ref()?;
        Some(solution.force_vector_on_contact(index))
    }

    /// Projects the force vector onto `normal` to recover
    /// compression/tensile sign; the tangential magnitude is reported as
    /// `shear` (spec.md §4.9).
    pub fn force_stress(&self) -> Option<Stress<F>> {
        let force = self.force_vector()?;
        let normal = self.normal();
        let along_normal = force.dot(&normal);
        let tangential = (force - normal * along_normal).norm();
        let (compression, tensile) = if along_normal <= F::zero() {
            (-along_normal, F::zero())
        } else {
            (F::zero(), along_normal)
        };
        Some(Stress::new(compression, tangential, tensile))
    }

    pub fn pressure_stress(&self) -> Option<Stress<F>> {
        Some(self.force_stress()?.div_scalar(self.area()))
    }

    pub fn stress_ratio(&self) -> Option<Stress<F>> {
        let force_stress = self.force_stress()?;
        let limit = self.max_pressure_stress().scale(self.area());
        Some(force_stress.div_stress(&limit))
    }
}

#[derive(Clone, Copy)]
pub struct StructureReference<'a, F, UserData> {
    scene: &'a CuboidGridScene<F, UserData>,
    id: StructureId,
}

impl<'a, F: Float, UserData: Clone> StructureReference<'a, F, UserData> {
    pub(crate) fn new(scene: &'a CuboidGridScene<F, UserData>, id: StructureId) -> Self {
        Self { scene, id }
    }

    pub fn id(&self) -> StructureId {
        self.id
    }

    fn data(&self) -> &'a super::StructureData<F, UserData> {
        &self.scene.structures[self.id]
    }

    pub fn blocks(&self) -> impl Iterator<Item = BlockReference<'a, F, UserData>> + 'a {
        let scene = self.scene;
        self.data().blocks().iter().map(move |&idx| BlockReference::new(scene, idx))
    }

    pub fn contact_at(&self, index: ContactIndex) -> Option<ContactReference<'a, F, UserData>> {
        let (block, direction) = self.data().location_of(index)?;
        ContactReference::find(self.scene, block, direction)
    }

    /// Every internal contact once, oriented outward along `+x/+y/+z`
    /// (spec.md §4.9).
    pub fn links(&self) -> impl Iterator<Item = ContactReference<'a, F, UserData>> + 'a {
        let scene = self.scene;
        self.data().blocks().to_vec().into_iter().flat_map(move |idx| {
            Direction::POSITIVE
                .into_iter()
                .filter_map(move |direction| ContactReference::find(scene, idx, direction))
        })
    }

    pub fn is_solved(&self) -> bool {
        self.data().is_solved()
    }

    pub fn reached_count(&self) -> usize {
        self.data().reached_count()
    }
}
