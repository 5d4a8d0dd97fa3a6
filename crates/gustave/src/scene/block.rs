//! Blocks, directions, and the lattice index that identifies them
//! (spec.md §3 "Block (scene entity)").

use nalgebra::{RealField, Vector3};
use num_traits::Float;

use crate::error::{GustaveError, Result};
use crate::stress::Stress;

/// An integer lattice coordinate. Two blocks are adjacent iff they differ
/// by exactly one unit along exactly one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockIndex {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockIndex {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The lattice neighbour along `direction`, or `None` if the
    /// coordinate would overflow `i32` (spec.md §8's boundary behaviour at
    /// `(INT_MAX, 0, 0)`).
    pub fn neighbor(&self, direction: Direction) -> Option<BlockIndex> {
        let (dx, dy, dz) = direction.delta();
        Some(BlockIndex {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
            z: self.z.checked_add(dz)?,
        })
    }
}

/// One of the six axis-aligned face directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    PlusX,
    MinusX,
    PlusY,
    MinusY,
    PlusZ,
    MinusZ,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::PlusX,
        Direction::MinusX,
        Direction::PlusY,
        Direction::MinusY,
        Direction::PlusZ,
        Direction::MinusZ,
    ];

    /// The three directions whose outgoing contact, if valid, is recorded
    /// by the lower-coordinate endpoint (spec.md §4.8's link orientation).
    pub const POSITIVE: [Direction; 3] = [Direction::PlusX, Direction::PlusY, Direction::PlusZ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::PlusX => Direction::MinusX,
            Direction::MinusX => Direction::PlusX,
            Direction::PlusY => Direction::MinusY,
            Direction::MinusY => Direction::PlusY,
            Direction::PlusZ => Direction::MinusZ,
            Direction::MinusZ => Direction::PlusZ,
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Direction::PlusX | Direction::PlusY | Direction::PlusZ)
    }

    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Direction::PlusX => (1, 0, 0),
            Direction::MinusX => (-1, 0, 0),
            Direction::PlusY => (0, 1, 0),
            Direction::MinusY => (0, -1, 0),
            Direction::PlusZ => (0, 0, 1),
            Direction::MinusZ => (0, 0, -1),
        }
    }

    pub fn axis_unit_vector<F: Float + RealField>(self) -> Vector3<F> {
        let one = F::one();
        let zero = F::zero();
        match self {
            Direction::PlusX => Vector3::new(one, zero, zero),
            Direction::MinusX => Vector3::new(-one, zero, zero),
            Direction::PlusY => Vector3::new(zero, one, zero),
            Direction::MinusY => Vector3::new(zero, -one, zero),
            Direction::PlusZ => Vector3::new(zero, zero, one),
            Direction::MinusZ => Vector3::new(zero, zero, -one),
        }
    }
}

/// The immutable description of a block, validated at construction
/// (spec.md §6/§7).
#[derive(Debug, Clone)]
pub struct BlockConstructionInfo<F, UserData = ()> {
    pub index: BlockIndex,
    pub max_pressure_stress: Stress<F>,
    pub mass: F,
    pub is_foundation: bool,
    pub user_data: UserData,
}

impl<F: Float, UserData> BlockConstructionInfo<F, UserData> {
    pub fn new(
        index: BlockIndex,
        max_pressure_stress: Stress<F>,
        mass: F,
        is_foundation: bool,
        user_data: UserData,
    ) -> Result<Self> {
        if mass <= F::zero() {
            return Err(GustaveError::NonPositive {
                field: "mass",
                value: mass.to_f64().unwrap_or(0.0),
            });
        }
        for (field, value) in [
            ("max_pressure_stress.compression", max_pressure_stress.compression),
            ("max_pressure_stress.shear", max_pressure_stress.shear),
            ("max_pressure_stress.tensile", max_pressure_stress.tensile),
        ] {
            if value <= F::zero() {
                return Err(GustaveError::NonPositive {
                    field,
                    value: value.to_f64().unwrap_or(0.0),
                });
            }
        }
        Ok(Self {
            index,
            max_pressure_stress,
            mass,
            is_foundation,
            user_data,
        })
    }
}

/// Scene-owned block state. Structure membership for non-foundation blocks
/// is cached here as a fast existence check; the authoritative member list
/// lives on [`crate::scene::structure_data::StructureData`] itself, since a
/// foundation block may belong to many structures at once (spec.md §3) and
/// so cannot be represented by a single id on the block.
#[derive(Debug, Clone)]
pub(crate) struct BlockData<F, UserData> {
    pub info: BlockConstructionInfo<F, UserData>,
    pub structure_id: Option<super::StructureId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbor_overflow_is_none_not_a_panic() {
        let edge = BlockIndex::new(i32::MAX, 0, 0);
        assert_eq!(edge.neighbor(Direction::PlusX), None);
        assert_eq!(
            edge.neighbor(Direction::MinusX),
            Some(BlockIndex::new(i32::MAX - 1, 0, 0))
        );
    }

    #[test]
    fn opposite_direction_round_trips() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn construction_info_rejects_non_positive_mass() {
        let err = BlockConstructionInfo::<f64, ()>::new(
            BlockIndex::new(0, 0, 0),
            Stress::new(1.0, 1.0, 1.0),
            0.0,
            false,
            (),
        )
        .unwrap_err();
        assert!(matches!(err, GustaveError::NonPositive { field: "mass", .. }));
    }
}
