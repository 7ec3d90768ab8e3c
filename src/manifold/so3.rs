//! SO(3) - Special Orthogonal Group in 3D
//!
//! Rotations are stored directly as 3x3 orthonormal matrices so that the
//! closed-form exponential map lands on exactly the matrix the optimizer composes with.
//! SO(3) tangent elements are axis-angle vectors θ ∈ R³.

use crate::manifold::{LieGroup, ManifoldError, ManifoldResult, SMALL_ANGLE_THRESHOLD, Tangent};
use nalgebra::{Matrix3, Rotation3, Vector3};
use std::fmt;

/// SO(3) group element representing rotations in 3D.
#[derive(Clone, Debug, PartialEq)]
pub struct SO3 {
    matrix: Matrix3<f64>,
}

impl fmt::Display for SO3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (roll, pitch, yaw) = Rotation3::from_matrix_unchecked(self.matrix).euler_angles();
        write!(
            f,
            "SO3(roll: {roll:.4}, pitch: {pitch:.4}, yaw: {yaw:.4})"
        )
    }
}

/// SO(3) tangent space element (axis-angle vector).
#[derive(Clone, Debug, PartialEq)]
pub struct SO3Tangent {
    data: Vector3<f64>,
}

impl fmt::Display for SO3Tangent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "so3([{:.4}, {:.4}, {:.4}])",
            self.data.x, self.data.y, self.data.z
        )
    }
}

impl SO3 {
    /// Create an SO3 element from a rotation matrix, checking orthonormality.
    pub fn from_matrix(matrix: Matrix3<f64>, tolerance: f64) -> ManifoldResult<Self> {
        let rotation = SO3 { matrix };
        if !rotation.is_valid(tolerance) {
            return Err(ManifoldError::InvalidElement(
                "rotation block is not orthonormal with unit determinant".to_string(),
            ));
        }
        Ok(rotation)
    }

    /// Create an SO3 element without validating the matrix.
    pub fn from_matrix_unchecked(matrix: Matrix3<f64>) -> Self {
        SO3 { matrix }
    }

    /// Create SO3 from Euler angles (roll, pitch, yaw).
    pub fn from_euler_angles(roll: f64, pitch: f64, yaw: f64) -> Self {
        SO3 {
            matrix: Rotation3::from_euler_angles(roll, pitch, yaw).into_inner(),
        }
    }

    /// Create SO3 from a unit axis and an angle.
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Self {
        SO3Tangent::new(axis.normalize() * angle).exp()
    }

    /// Get the rotation matrix.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.matrix
    }
}

impl LieGroup for SO3 {
    type TangentVector = SO3Tangent;
    type LieAlgebra = Matrix3<f64>;

    const DIM: usize = 3;
    const DOF: usize = 3;

    fn identity() -> Self {
        SO3 {
            matrix: Matrix3::identity(),
        }
    }

    fn inverse(&self) -> Self {
        SO3 {
            matrix: self.matrix.transpose(),
        }
    }

    fn compose(&self, other: &Self) -> Self {
        SO3 {
            matrix: self.matrix * other.matrix,
        }
    }

    fn act(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.matrix * vector
    }

    fn normalize(&mut self) {
        self.matrix = Rotation3::from_matrix(&self.matrix).into_inner();
    }

    fn is_valid(&self, tolerance: f64) -> bool {
        let orthogonality = (self.matrix.transpose() * self.matrix - Matrix3::identity()).norm();
        orthogonality < tolerance && (self.matrix.determinant() - 1.0).abs() < tolerance
    }
}

impl SO3Tangent {
    /// Create a new SO3Tangent from an axis-angle vector.
    pub fn new(axis_angle: Vector3<f64>) -> Self {
        SO3Tangent { data: axis_angle }
    }

    /// Create SO3Tangent from individual components.
    pub fn from_components(x: f64, y: f64, z: f64) -> Self {
        SO3Tangent {
            data: Vector3::new(x, y, z),
        }
    }

    /// Get the axis-angle vector.
    pub fn axis_angle(&self) -> Vector3<f64> {
        self.data
    }

    /// Rotation angle θ = ‖ω‖.
    pub fn angle(&self) -> f64 {
        self.data.norm()
    }

    /// Left Jacobian of SO(3), the V matrix of the SE(3) exponential.
    ///
    /// # Notes
    /// V(θ) = I + (1 - cos θ)/θ² [θ]ₓ + (θ - sin θ)/θ³ [θ]ₓ²
    ///
    /// Returns the identity when θ is below [`SMALL_ANGLE_THRESHOLD`].
    pub fn left_jacobian(&self) -> Matrix3<f64> {
        let theta = self.angle();
        if theta <= SMALL_ANGLE_THRESHOLD {
            return Matrix3::identity();
        }
        let skew = self.hat();
        let theta_sq = theta * theta;
        let gamma = (1.0 - theta.cos()) / theta_sq;
        let delta = (theta - theta.sin()) / (theta_sq * theta);
        Matrix3::identity() + gamma * skew + delta * skew * skew
    }
}

impl Tangent<SO3> for SO3Tangent {
    const DIM: usize = 3;

    /// Rodrigues exponential.
    ///
    /// # Notes
    /// R = I + (sin θ/θ) [ω]ₓ + ((1 - cos θ)/θ²) [ω]ₓ²
    fn exp(&self) -> SO3 {
        let theta = self.angle();
        if theta <= SMALL_ANGLE_THRESHOLD {
            return SO3::identity();
        }
        let skew = self.hat();
        let alpha = theta.sin() / theta;
        let beta = (1.0 - theta.cos()) / (theta * theta);
        SO3 {
            matrix: Matrix3::identity() + alpha * skew + beta * skew * skew,
        }
    }

    /// Skew-symmetric matrix [ω]ₓ such that [ω]ₓ v = ω × v.
    fn hat(&self) -> Matrix3<f64> {
        let w = &self.data;
        Matrix3::new(0.0, -w.z, w.y, w.z, 0.0, -w.x, -w.y, w.x, 0.0)
    }

    fn zero() -> Self {
        SO3Tangent {
            data: Vector3::zeros(),
        }
    }

    fn is_zero(&self, tolerance: f64) -> bool {
        self.data.norm() < tolerance
    }
}
