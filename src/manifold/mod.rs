//! Manifold representations for pose optimization.
//!
//! This module provides the two Lie groups the direct alignment needs:
//! - **SE(3)**: Special Euclidean group (rigid body transformations)
//! - **SO(3)**: Special Orthogonal group (rotations)
//!
//! Lie group M,° | size   | dim | X ∈ M                   | Constraint      | T_E M             | T_X M                 | Exp(T)             | Comp. | Action
//! ------------- | ------ | --- | ----------------------- | --------------- | ----------------- | --------------------- | ------------------ | ----- | ------
//! Rotation      | SO(3),.| 9   | 3   | R                 | RᵀR = I         | [θ]x ∈ so(3)      | [θ] ∈ R³              | R = exp([θ]x)      | R₁R₂  | Rx
//! Rigid motion  | SE(3),.| 16  | 6   | M = [R t; 0 1]    | RᵀR = I         | [v̂] ∈ se(3)       | [v̂] ∈ R⁶              | Exp([v̂])           | M₁M₂  | Rx+t
//!
//! Tangent vectors of SE(3) are ordered `[v; ω]`: translation generator first,
//! rotation generator second. The photometric Jacobian in [`crate::direct`] uses the
//! same ordering, so the two must stay in sync.
//!
//! # Example
//!
//! ```rust
//! use direct_align::manifold::se3::{SE3, SE3Tangent};
//! use direct_align::manifold::{LieGroup, Tangent};
//! use nalgebra::Vector3;
//!
//! let pose = SE3::identity();
//! let delta = SE3Tangent::new(Vector3::new(0.1, 0.0, 0.0), Vector3::new(0.0, 0.05, 0.0));
//! let updated = pose.left_plus(&delta);
//! assert!(updated.is_valid(1e-9));
//! ```

use nalgebra::Vector3;
use std::fmt::Debug;
use thiserror::Error;

pub mod se3;
pub mod so3;

/// Rotation angles at or below this are treated as zero by the exponential maps.
pub const SMALL_ANGLE_THRESHOLD: f64 = 1e-10;

/// Errors that can occur during manifold operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManifoldError {
    /// Invalid manifold element
    #[error("Invalid manifold element: {0}")]
    InvalidElement(String),
}

/// Result type for manifold operations.
pub type ManifoldResult<T> = Result<T, ManifoldError>;

/// Core trait for Lie group operations used by the pose optimizer.
///
/// Associated types define the mathematical structure:
/// - `TangentVector`: The tangent space vector type (e.g., `SE3Tangent` for SE(3))
/// - `LieAlgebra`: Matrix form of the Lie algebra
pub trait LieGroup: Clone + Debug + PartialEq + Sized {
    /// The tangent space vector type
    type TangentVector: Tangent<Self>;

    /// Associated Lie algebra type
    type LieAlgebra: Clone + Debug + PartialEq;

    /// Space dimension - dimension of the ambient space that the group acts on
    const DIM: usize;

    /// Degrees of freedom - dimension of the tangent space
    const DOF: usize;

    /// Get the identity element of the group.
    fn identity() -> Self;

    /// Compute the inverse of this element, g⁻¹ such that g ∘ g⁻¹ = e.
    fn inverse(&self) -> Self;

    /// Compose this element with another (group multiplication g₁ ∘ g₂).
    fn compose(&self, other: &Self) -> Self;

    /// Act on a vector v: g ⊙ v.
    fn act(&self, vector: &Vector3<f64>) -> Vector3<f64>;

    /// Left plus operation: φ ⊞ g = exp(φ^∧) ∘ g.
    fn left_plus(&self, tangent: &Self::TangentVector) -> Self {
        tangent.exp().compose(self)
    }

    /// Compute g₁⁻¹ ∘ g₂ (relative transformation).
    fn between(&self, other: &Self) -> Self {
        self.inverse().compose(other)
    }

    /// Re-project onto the manifold after accumulated round-off.
    fn normalize(&mut self);

    /// Check if the element satisfies the group constraints within `tolerance`.
    fn is_valid(&self, tolerance: f64) -> bool;
}

/// Trait for Lie algebra (tangent space) operations.
pub trait Tangent<Group: LieGroup>: Clone + Debug + PartialEq {
    /// Dimension of the tangent space
    const DIM: usize;

    /// Exponential map to the Lie group.
    fn exp(&self) -> Group;

    /// Hat operator: φ^∧ (vector to matrix).
    fn hat(&self) -> Group::LieAlgebra;

    /// Zero tangent vector.
    fn zero() -> Self;

    /// Check if the tangent vector is approximately zero.
    fn is_zero(&self, tolerance: f64) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifold_error_display() {
        let err = ManifoldError::InvalidElement("rotation is not orthonormal".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid manifold element: rotation is not orthonormal"
        );
    }
}
