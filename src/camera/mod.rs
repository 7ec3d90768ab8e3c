//! Pinhole camera model used by the projection filter and the photometric optimizer.
//!
//! # Mathematical Model
//!
//! ## Projection (3D → 2D)
//!
//! For a 3D point p = (x, y, z) in camera coordinates:
//!
//! ```text
//! u = fx · (x/z) + cx
//! v = fy · (y/z) + cy
//! ```
//!
//! ## Back-projection (2D + depth → 3D)
//!
//! ```text
//! P = d · ((u - cx)/fx, (v - cy)/fy, 1)
//! ```
//!
//! Intrinsics are plain values handed to every consumer; nothing here is global.

use nalgebra::{Matrix3x4, SMatrix, Vector2, Vector3};
use thiserror::Error;

/// Minimum depth for a point to be projectable (meters).
pub const MIN_DEPTH: f64 = 1e-6;

/// Errors produced by camera model construction and projection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CameraModelError {
    #[error("z is close to zero, point is at camera center")]
    PointAtCameraCenter,
    #[error("Focal length must be positive")]
    FocalLengthMustBePositive,
    #[error("Principal point must be finite")]
    PrincipalPointMustBeFinite,
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
}

/// Pinhole camera intrinsics (fx, fy, cx, cy).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeIntrinsics {
    /// Focal length in x direction (pixels)
    pub fx: f64,
    /// Focal length in y direction (pixels)
    pub fy: f64,
    /// Principal point x-coordinate (pixels)
    pub cx: f64,
    /// Principal point y-coordinate (pixels)
    pub cy: f64,
}

impl PinholeIntrinsics {
    /// Create new pinhole intrinsics with validation.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self, CameraModelError> {
        if !(fx > 0.0 && fy > 0.0 && fx.is_finite() && fy.is_finite()) {
            return Err(CameraModelError::FocalLengthMustBePositive);
        }
        if !cx.is_finite() || !cy.is_finite() {
            return Err(CameraModelError::PrincipalPointMustBeFinite);
        }
        Ok(Self { fx, fy, cx, cy })
    }

    /// Extract intrinsics from a 3x4 projection matrix `[K | 0]`.
    ///
    /// Skew and a non-zero fourth column are rejected.
    pub fn from_projection_matrix(p: &Matrix3x4<f64>) -> Result<Self, CameraModelError> {
        if p[(0, 1)].abs() > f64::EPSILON || (p[(2, 2)] - 1.0).abs() > 1e-9 {
            return Err(CameraModelError::InvalidParams(
                "projection matrix must be of the form [K | 0] with unit K[2,2] and no skew"
                    .to_string(),
            ));
        }
        Self::new(p[(0, 0)], p[(1, 1)], p[(0, 2)], p[(1, 2)])
    }

    /// The 3x4 intrinsic projection matrix `[K | 0]`.
    pub fn projection_matrix(&self) -> Matrix3x4<f64> {
        Matrix3x4::new(
            self.fx, 0.0, self.cx, 0.0, //
            0.0, self.fy, self.cy, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        )
    }

    /// Projects a 3D camera-frame point to pixel coordinates.
    pub fn project(&self, p_cam: &Vector3<f64>) -> Result<Vector2<f64>, CameraModelError> {
        if p_cam.z < MIN_DEPTH {
            return Err(CameraModelError::PointAtCameraCenter);
        }
        Ok(self.project_unchecked(p_cam))
    }

    /// Projection without the depth check; the caller guarantees z != 0.
    #[inline]
    pub fn project_unchecked(&self, p_cam: &Vector3<f64>) -> Vector2<f64> {
        let inv_z = 1.0 / p_cam.z;
        Vector2::new(
            self.fx * p_cam.x * inv_z + self.cx,
            self.fy * p_cam.y * inv_z + self.cy,
        )
    }

    /// Back-projects a pixel with known depth to a 3D camera-frame point.
    #[inline]
    pub fn back_project(&self, pixel: &Vector2<f64>, depth: f64) -> Vector3<f64> {
        depth
            * Vector3::new(
                (pixel.x - self.cx) / self.fx,
                (pixel.y - self.cy) / self.fy,
                1.0,
            )
    }

    /// Jacobian of the projected pixel with respect to a left se(3) perturbation
    /// of the point, columns ordered `[t_x, t_y, t_z, ω_x, ω_y, ω_z]`.
    ///
    /// ```text
    /// [ fx/Z   0     -fx·X/Z²   -fx·X·Y/Z²      fx + fx·X²/Z²   -fx·Y/Z ]
    /// [ 0      fy/Z  -fy·Y/Z²   -fy - fy·Y²/Z²   fy·X·Y/Z²       fy·X/Z ]
    /// ```
    #[inline]
    pub fn pixel_jacobian_se3(&self, p_cam: &Vector3<f64>) -> SMatrix<f64, 2, 6> {
        let (x, y, z) = (p_cam.x, p_cam.y, p_cam.z);
        let z_inv = 1.0 / z;
        let z2_inv = z_inv * z_inv;
        let (fx, fy) = (self.fx, self.fy);

        SMatrix::<f64, 2, 6>::new(
            fx * z_inv,
            0.0,
            -fx * x * z2_inv,
            -fx * x * y * z2_inv,
            fx + fx * x * x * z2_inv,
            -fx * y * z_inv,
            //
            0.0,
            fy * z_inv,
            -fy * y * z2_inv,
            -fy - fy * y * y * z2_inv,
            fy * x * y * z2_inv,
            fy * x * z_inv,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::se3::SE3Tangent;
    use crate::manifold::{LieGroup, Tangent};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn assert_approx_eq(a: f64, b: f64, eps: f64) {
        assert!(
            (a - b).abs() < eps,
            "Values {} and {} differ by more than {}",
            a,
            b,
            eps
        );
    }

    #[test]
    fn test_intrinsics_validation() {
        assert!(PinholeIntrinsics::new(500.0, 500.0, 320.0, 240.0).is_ok());
        assert_eq!(
            PinholeIntrinsics::new(0.0, 500.0, 320.0, 240.0),
            Err(CameraModelError::FocalLengthMustBePositive)
        );
        assert_eq!(
            PinholeIntrinsics::new(500.0, 500.0, f64::NAN, 240.0),
            Err(CameraModelError::PrincipalPointMustBeFinite)
        );
    }

    #[test]
    fn test_projection_off_axis() -> TestResult {
        let camera = PinholeIntrinsics::new(500.0, 500.0, 320.0, 240.0)?;
        let uv = camera.project(&Vector3::new(0.1, 0.2, 1.0))?;

        assert_approx_eq(uv.x, 370.0, 1e-10);
        assert_approx_eq(uv.y, 340.0, 1e-10);
        Ok(())
    }

    #[test]
    fn test_projection_behind_camera() -> TestResult {
        let camera = PinholeIntrinsics::new(500.0, 500.0, 320.0, 240.0)?;
        assert_eq!(
            camera.project(&Vector3::new(0.0, 0.0, -1.0)),
            Err(CameraModelError::PointAtCameraCenter)
        );
        Ok(())
    }

    #[test]
    fn test_back_project_inverts_project() -> TestResult {
        let camera = PinholeIntrinsics::new(718.856, 718.856, 607.1928, 185.2157)?;
        let point = Vector3::new(-1.3, 0.4, 12.5);
        let uv = camera.project(&point)?;
        let recovered = camera.back_project(&uv, point.z);
        assert!((recovered - point).norm() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_projection_matrix_roundtrip() -> TestResult {
        let camera = PinholeIntrinsics::new(718.856, 718.856, 607.1928, 185.2157)?;
        let p = camera.projection_matrix();
        assert_eq!(PinholeIntrinsics::from_projection_matrix(&p)?, camera);

        let homogeneous = p * nalgebra::Vector4::new(1.0, 2.0, 10.0, 1.0);
        let uv = camera.project(&Vector3::new(1.0, 2.0, 10.0))?;
        assert_approx_eq(homogeneous.x / homogeneous.z, uv.x, 1e-9);
        assert_approx_eq(homogeneous.y / homogeneous.z, uv.y, 1e-9);
        Ok(())
    }

    #[test]
    fn test_pixel_jacobian_numerical() -> TestResult {
        let camera = PinholeIntrinsics::new(520.0, 510.0, 320.0, 240.0)?;
        let point = Vector3::new(0.4, -0.3, 3.0);
        let analytic = camera.pixel_jacobian_se3(&point);
        let eps = 1e-6;

        for col in 0..6 {
            let mut delta = nalgebra::Vector6::zeros();
            delta[col] = eps;
            let plus = SE3Tangent::from_vector(delta).exp().act(&point);
            let minus = SE3Tangent::from_vector(-delta).exp().act(&point);
            let numeric =
                (camera.project(&plus)? - camera.project(&minus)?) / (2.0 * eps);
            assert_approx_eq(analytic[(0, col)], numeric.x, 1e-4);
            assert_approx_eq(analytic[(1, col)], numeric.y, 1e-4);
        }
        Ok(())
    }
}
