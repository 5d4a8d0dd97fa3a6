//! Normalised 3-vectors and the gravity-projection helpers built on them.

use nalgebra::{RealField, Vector3};
use num_traits::Float;

use crate::error::{GustaveError, Result};

/// Below this magnitude a vector is considered degenerate and cannot be
/// normalised (spec.md §3, "construction fails when the source magnitude is
/// below a small fixed threshold").
fn normalize_threshold<F: Float>() -> F {
    F::from(1e-9).unwrap_or_else(F::epsilon)
}

/// A 3-vector of unit length. The only way to build one is [`NormalizedVec3::try_new`],
/// which fails rather than producing NaN components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedVec3<F>(Vector3<F>);

impl<F: Float + RealField> NormalizedVec3<F> {
    pub fn try_new(v: Vector3<F>) -> Result<Self> {
        let magnitude = v.norm();
        if magnitude <= normalize_threshold::<F>() {
            return Err(GustaveError::DegenerateVector {
                magnitude: magnitude.to_f64().unwrap_or(0.0),
            });
        }
        Ok(Self(v / magnitude))
    }

    pub fn as_vector(&self) -> Vector3<F> {
        self.0
    }

    pub fn dot(&self, other: &Vector3<F>) -> F {
        self.0.dot(other)
    }

    pub fn x(&self) -> F {
        self.0.x
    }
    pub fn y(&self) -> F {
        self.0.y
    }
    pub fn z(&self) -> F {
        self.0.z
    }
}

impl<F: Float + RealField> std::ops::Neg for NormalizedVec3<F> {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_vector() {
        let err = NormalizedVec3::try_new(Vector3::<f64>::new(0.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, GustaveError::DegenerateVector { .. }));
    }

    #[test]
    fn normalizes_to_unit_length() {
        let n = NormalizedVec3::try_new(Vector3::new(3.0, 4.0, 0.0)).unwrap();
        assert!((n.as_vector().norm() - 1.0).abs() < 1e-12);
    }
}
