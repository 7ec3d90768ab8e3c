//! SE(3) - Special Euclidean Group in 3D
//!
//! This module implements the Special Euclidean group SE(3), which represents
//! rigid body transformations in 3D space (rotation + translation).
//!
//! SE(3) elements are represented as a combination of an SO(3) rotation and a Vector3
//! translation, and convert losslessly to and from 4x4 homogeneous matrices.
//! SE(3) tangent elements are represented as [v(3), ω(3)] = 6 components,
//! where v is the translational generator and ω is the rotational generator.

use crate::manifold::so3::{SO3, SO3Tangent};
use crate::manifold::{LieGroup, ManifoldResult, SMALL_ANGLE_THRESHOLD, Tangent};
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4, Vector6};
use std::fmt;

/// SE(3) group element representing rigid body transformations in 3D.
#[derive(Clone, Debug, PartialEq)]
pub struct SE3 {
    /// Rotation part as SO(3) element
    rotation: SO3,
    /// Translation part as Vector3
    translation: Vector3<f64>,
}

impl fmt::Display for SE3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.translation();
        write!(
            f,
            "SE3(translation: [{:.4}, {:.4}, {:.4}], rotation: {})",
            t.x, t.y, t.z, self.rotation
        )
    }
}

/// SE(3) tangent space element representing elements in the Lie algebra se(3).
///
/// Internally represented as [v(3), ω(3)] where:
/// - v: translational generator [v_x, v_y, v_z]
/// - ω: rotational generator [ω_x, ω_y, ω_z]
#[derive(Clone, Debug, PartialEq)]
pub struct SE3Tangent {
    /// Internal data: [v_x, v_y, v_z, ω_x, ω_y, ω_z]
    data: Vector6<f64>,
}

impl fmt::Display for SE3Tangent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.rho();
        let w = self.theta();
        write!(
            f,
            "se3(v: [{:.4}, {:.4}, {:.4}], omega: [{:.4}, {:.4}, {:.4}])",
            v.x, v.y, v.z, w.x, w.y, w.z
        )
    }
}

impl SE3 {
    /// Create SE3 from a translation and an SO3 rotation.
    pub fn from_translation_so3(translation: Vector3<f64>, rotation: SO3) -> Self {
        SE3 {
            rotation,
            translation,
        }
    }

    /// Pure translation.
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::from_translation_so3(translation, SO3::identity())
    }

    /// Create SE3 from translation components and Euler angles.
    pub fn from_translation_euler(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self::from_translation_so3(
            Vector3::new(x, y, z),
            SO3::from_euler_angles(roll, pitch, yaw),
        )
    }

    /// Create SE3 from a 4x4 homogeneous matrix.
    ///
    /// The bottom row is ignored; the rotation block must be orthonormal within `tolerance`.
    pub fn from_matrix(matrix: &Matrix4<f64>, tolerance: f64) -> ManifoldResult<Self> {
        let rotation = SO3::from_matrix(matrix.fixed_view::<3, 3>(0, 0).into_owned(), tolerance)?;
        let translation = matrix.fixed_view::<3, 1>(0, 3).into_owned();
        Ok(Self::from_translation_so3(translation, rotation))
    }

    /// Get the translation part as a Vector3.
    pub fn translation(&self) -> Vector3<f64> {
        self.translation
    }

    /// Get the rotation part as SO3.
    pub fn rotation_so3(&self) -> SO3 {
        self.rotation.clone()
    }

    /// Get the rotation block as a 3x3 matrix.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation.rotation_matrix()
    }

    /// Get the transformation matrix (4x4 homogeneous matrix).
    pub fn matrix(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&self.rotation.rotation_matrix());
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    /// Transform a homogeneous point.
    pub fn act_homogeneous(&self, point: &Vector4<f64>) -> Vector4<f64> {
        self.matrix() * point
    }
}

impl LieGroup for SE3 {
    type TangentVector = SE3Tangent;
    type LieAlgebra = Matrix4<f64>;

    const DIM: usize = 3;
    const DOF: usize = 6;

    fn identity() -> Self {
        SE3 {
            rotation: SO3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// # Notes
    /// M⁻¹ = [ Rᵀ -Rᵀt ]
    ///       [ 0    1   ]
    fn inverse(&self) -> Self {
        let rot_inv = self.rotation.inverse();
        let trans_inv = -rot_inv.act(&self.translation);
        SE3::from_translation_so3(trans_inv, rot_inv)
    }

    /// # Notes
    /// M_a M_b = [ R_a*R_b   R_a*t_b + t_a ]
    ///           [ 0             1         ]
    fn compose(&self, other: &Self) -> Self {
        let composed_rotation = self.rotation.compose(&other.rotation);
        let composed_translation = self.rotation.act(&other.translation) + self.translation;
        SE3::from_translation_so3(composed_translation, composed_rotation)
    }

    fn act(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.act(vector) + self.translation
    }

    fn normalize(&mut self) {
        self.rotation.normalize();
    }

    fn is_valid(&self, tolerance: f64) -> bool {
        self.rotation.is_valid(tolerance) && self.translation.iter().all(|t| t.is_finite())
    }
}

impl SE3Tangent {
    /// Create a new SE3Tangent from v (translational) and ω (rotational) components.
    pub fn new(rho: Vector3<f64>, theta: Vector3<f64>) -> Self {
        let mut data = Vector6::zeros();
        data.fixed_rows_mut::<3>(0).copy_from(&rho);
        data.fixed_rows_mut::<3>(3).copy_from(&theta);
        SE3Tangent { data }
    }

    /// Wrap a raw `[v; ω]` vector, e.g. the solution of the normal equations.
    pub fn from_vector(data: Vector6<f64>) -> Self {
        SE3Tangent { data }
    }

    /// Create SE3Tangent from individual components.
    pub fn from_components(
        rho_x: f64,
        rho_y: f64,
        rho_z: f64,
        theta_x: f64,
        theta_y: f64,
        theta_z: f64,
    ) -> Self {
        SE3Tangent {
            data: Vector6::new(rho_x, rho_y, rho_z, theta_x, theta_y, theta_z),
        }
    }

    /// Get the v (translational) part.
    pub fn rho(&self) -> Vector3<f64> {
        self.data.fixed_rows::<3>(0).into_owned()
    }

    /// Get the ω (rotational) part.
    pub fn theta(&self) -> Vector3<f64> {
        self.data.fixed_rows::<3>(3).into_owned()
    }

    /// Raw `[v; ω]` coefficients.
    pub fn coeffs(&self) -> Vector6<f64> {
        self.data
    }
}

impl Tangent<SE3> for SE3Tangent {
    const DIM: usize = 6;

    /// Closed-form SE(3) exponential (Strasdat 2012, pp. 47-53).
    ///
    /// # Notes
    /// M = exp(τ) = [ R(ω)   V(ω) v ]
    ///              [ 0        1    ]
    ///
    /// For ‖ω‖ ≤ 1e-10 the result is the pure translation [I v; 0 1].
    fn exp(&self) -> SE3 {
        let theta_tangent = SO3Tangent::new(self.theta());
        if theta_tangent.angle() <= SMALL_ANGLE_THRESHOLD {
            return SE3::from_translation(self.rho());
        }
        let rotation = theta_tangent.exp();
        let translation = theta_tangent.left_jacobian() * self.rho();
        SE3::from_translation_so3(translation, rotation)
    }

    /// Hat operator: the 4x4 matrix
    /// [  ω_×   v  ]
    /// [  0     0  ]
    fn hat(&self) -> Matrix4<f64> {
        let mut lie_alg = Matrix4::zeros();
        let theta_hat = SO3Tangent::new(self.theta()).hat();
        lie_alg.fixed_view_mut::<3, 3>(0, 0).copy_from(&theta_hat);
        lie_alg.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.rho());
        lie_alg
    }

    fn zero() -> Self {
        SE3Tangent {
            data: Vector6::zeros(),
        }
    }

    fn is_zero(&self, tolerance: f64) -> bool {
        self.data.norm() < tolerance
    }
}
