//! LiDAR to camera projection filter.
//!
//! Every scan point is moved into the camera frame with `T_cam_lidar` and projected
//! with a single combined `K(3x4) · T_cam_lidar` product. Points are kept when the
//! projected depth lies in the closed [`DepthBand`] and the pixel lies inside
//! `[0, width] × [0, height]`.
//!
//! The upper pixel bound is inclusive (`u <= width`), one past the last pixel
//! centre. Accepted counts depend on it, so it is kept as is; the intensity sampler
//! reads the border sample for such points.

use crate::image::{Image, Intensity};
use nalgebra::{Matrix3x4, Matrix4, Vector2, Vector3, Vector4};
use tracing::debug;

/// A single LiDAR return: position in the sensor frame plus reflectance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LidarPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

impl LidarPoint {
    pub fn new(x: f32, y: f32, z: f32, intensity: f32) -> Self {
        Self { x, y, z, intensity }
    }

    /// Homogeneous position `(x, y, z, 1)`.
    #[inline]
    pub fn homogeneous(&self) -> Vector4<f64> {
        Vector4::new(self.x as f64, self.y as f64, self.z as f64, 1.0)
    }
}

/// Closed depth interval `[min, max]` of usable LiDAR/camera overlap, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBand {
    pub min: f64,
    pub max: f64,
}

impl Default for DepthBand {
    fn default() -> Self {
        Self {
            min: 5.0,
            max: 70.0,
        }
    }
}

impl DepthBand {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, depth: f64) -> bool {
        depth >= self.min && depth <= self.max
    }
}

/// Overlay record for a point that landed in the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointInView {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub u: f32,
    pub v: f32,
}

/// Output of [`project_points_in_view`], correlated by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointsInView {
    /// Camera-frame position with the sampled image intensity as fourth component.
    pub points: Vec<Vector4<f32>>,
    /// `(u, v, depth)` of each accepted point.
    pub uv_depth: Vec<Vector3<f64>>,
}

impl PointsInView {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Pixel coordinates, suitable as reference keypoints for the direct estimator.
    pub fn keypoints(&self) -> Vec<Vector2<f64>> {
        self.uv_depth.iter().map(|p| Vector2::new(p.x, p.y)).collect()
    }

    /// Projected depths, parallel to [`Self::keypoints`].
    pub fn depths(&self) -> Vec<f64> {
        self.uv_depth.iter().map(|p| p.z).collect()
    }

    /// Overlay records with the sampled intensity replicated into rgb.
    pub fn overlay(&self) -> Vec<PointInView> {
        self.points
            .iter()
            .zip(&self.uv_depth)
            .map(|(p, uvd)| PointInView {
                x: p.x,
                y: p.y,
                z: p.z,
                r: p.w,
                g: p.w,
                b: p.w,
                u: uvd.x as f32,
                v: uvd.y as f32,
            })
            .collect()
    }
}

/// Project a scan into a camera image and keep the points that land inside it.
///
/// `intrinsic` is the 3x4 projection matrix of the camera, `t_cam_lidar` maps
/// LiDAR coordinates into the camera frame.
pub fn project_points_in_view<T: Intensity>(
    cloud: &[LidarPoint],
    image: &Image<T>,
    t_cam_lidar: &Matrix4<f64>,
    intrinsic: &Matrix3x4<f64>,
    band: DepthBand,
) -> PointsInView {
    let projection = intrinsic * t_cam_lidar;
    let width = image.width() as f64;
    let height = image.height() as f64;

    let mut out = PointsInView::default();
    for point in cloud {
        let p = point.homogeneous();
        let p_proj = projection * p;
        let depth = p_proj.z;
        if !band.contains(depth) {
            continue;
        }

        let u = p_proj.x / depth;
        let v = p_proj.y / depth;
        if !(u >= 0.0 && u <= width && v >= 0.0 && v <= height) {
            continue;
        }

        let p_cam = t_cam_lidar * p;
        let intensity = image.interpolate(u as f32, v as f32);
        out.points.push(Vector4::new(
            p_cam.x as f32,
            p_cam.y as f32,
            p_cam.z as f32,
            intensity,
        ));
        out.uv_depth.push(Vector3::new(u, v, depth));
    }

    debug!(
        "{} of {} points in view ({}x{})",
        out.len(),
        cloud.len(),
        image.width(),
        image.height()
    );
    out
}
