//! KITTI odometry calibration: LiDAR→camera extrinsic plus camera intrinsics.

use crate::camera::PinholeIntrinsics;
use crate::error::AlignResult;
use crate::io::{self, IoError};
use nalgebra::{Matrix3x4, Matrix4};
use std::path::Path;

/// Calibration of one camera relative to the velodyne.
#[derive(Debug, Clone, PartialEq)]
pub struct KittiCalibration {
    /// Transform taking LiDAR points into the camera frame.
    pub t_cam_lidar: Matrix4<f64>,
    pub intrinsics: PinholeIntrinsics,
}

/// Ground-truth camera poses of the first two frames of sequence 00.
pub const SEQUENCE_00_T_WC0: [[f64; 4]; 3] = [
    [1.000000e+00, 9.043680e-12, 2.326809e-11, 5.551115e-17],
    [9.043683e-12, 1.000000e+00, 2.392370e-10, 3.330669e-16],
    [2.326810e-11, 2.392370e-10, 9.999999e-01, -4.440892e-16],
];

pub const SEQUENCE_00_T_WC1: [[f64; 4]; 3] = [
    [9.999978e-01, 5.272628e-04, -2.066935e-03, -4.690294e-02],
    [-5.296506e-04, 9.999992e-01, -1.154865e-03, -2.839928e-02],
    [2.066324e-03, 1.155958e-03, 9.999971e-01, 8.586941e-01],
];

/// Lift three rows of a rigid transform into a homogeneous 4x4 matrix.
pub fn homogeneous(rows: &[[f64; 4]; 3]) -> Matrix4<f64> {
    let mut m = Matrix4::identity();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            m[(r, c)] = *value;
        }
    }
    m
}

fn extend_3x4(m: &Matrix3x4<f64>) -> Matrix4<f64> {
    let mut out = Matrix4::identity();
    out.fixed_view_mut::<3, 4>(0, 0).copy_from(m);
    out
}

impl KittiCalibration {
    /// Camera 0 of KITTI odometry sequence 00.
    pub fn sequence_00() -> AlignResult<Self> {
        let t_cam_lidar = homogeneous(&[
            [4.276802385584e-04, -9.999672484946e-01, -8.084491683471e-03, -1.198459927713e-02],
            [-7.210626507497e-03, 8.081198471645e-03, -9.999413164504e-01, -5.403984729748e-02],
            [9.999738645903e-01, 4.859485810390e-04, -7.206933692422e-03, -2.921968648686e-01],
        ]);
        let intrinsics = PinholeIntrinsics::new(718.856, 718.856, 607.1928, 185.2157)?;
        Ok(Self {
            t_cam_lidar,
            intrinsics,
        })
    }

    /// Read `P0` (projection) and `Tr` (velodyne → camera 0) from a KITTI `calib.txt`.
    pub fn from_calib_file<P: AsRef<Path>>(path: P) -> AlignResult<Self> {
        let content = std::fs::read_to_string(path).map_err(IoError::from)?;
        Self::from_calib_str(&content)
    }

    pub fn from_calib_str(content: &str) -> AlignResult<Self> {
        let entries = io::parse_calibration(content)?;
        let projection = io::calibration_matrix(&entries, "P0")?;
        let tr = io::calibration_matrix(&entries, "Tr")?;
        Ok(Self {
            t_cam_lidar: extend_3x4(&tr),
            intrinsics: PinholeIntrinsics::from_projection_matrix(&projection)?,
        })
    }

    /// The combined 3x4 `K · T_cam_lidar` projection of LiDAR points.
    pub fn lidar_projection(&self) -> Matrix3x4<f64> {
        self.intrinsics.projection_matrix() * self.t_cam_lidar
    }

    /// LiDAR motion between two frames given the world poses of their cameras:
    /// `T_L0L1 = T_cam_lidar⁻¹ · (T_WC0⁻¹ · T_WC1) · T_cam_lidar`.
    pub fn relative_lidar_motion(
        &self,
        t_wc0: &Matrix4<f64>,
        t_wc1: &Matrix4<f64>,
    ) -> AlignResult<Matrix4<f64>> {
        let t_c0c1 = invert(t_wc0)? * t_wc1;
        Ok(invert(&self.t_cam_lidar)? * t_c0c1 * self.t_cam_lidar)
    }
}

fn invert(m: &Matrix4<f64>) -> AlignResult<Matrix4<f64>> {
    m.try_inverse().ok_or_else(|| {
        crate::error::AlignError::InvalidInput("transform is not invertible".to_string())
    })
}
