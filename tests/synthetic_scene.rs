//! Shared utilities for direct alignment integration tests
//!
//! Renders a textured plane seen from two camera poses. The plane is fixed in the
//! reference camera frame; the current image is ray-traced through the known motion
//! so that pixel correspondences are exact up to interpolation.

#![allow(dead_code)]
#![allow(clippy::expect_used)]

use direct_align::camera::PinholeIntrinsics;
use direct_align::image::Image;
use direct_align::manifold::LieGroup;
use direct_align::manifold::se3::SE3;
use nalgebra::{Vector2, Vector3};

pub const WIDTH: usize = 160;
pub const HEIGHT: usize = 120;

/// Wide field of view camera (90° horizontally) so that rotation and translation
/// produce distinguishable flow on a plane.
pub fn wide_camera() -> PinholeIntrinsics {
    PinholeIntrinsics {
        fx: 80.0,
        fy: 80.0,
        cx: 80.0,
        cy: 60.0,
    }
}

/// Smooth multi-frequency texture on the plane, indexed by reference-frame X and Y.
pub fn plane_texture(x: f64, y: f64) -> f64 {
    128.0
        + 40.0 * (6.0 * x).sin() * (5.0 * y).cos()
        + 30.0 * (4.0 * x + 3.0 * y + 0.5).sin()
        + 20.0 * (7.0 * y - 2.0 * x).cos()
}

/// Plane `n·X = d` in the reference camera frame.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub distance: f64,
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            normal: Vector3::new(0.1, -0.2, 1.0).normalize(),
            distance: 2.0,
        }
    }
}

pub struct SyntheticScene {
    pub camera: PinholeIntrinsics,
    pub reference: Image<f32>,
    pub current: Image<f32>,
    pub keypoints: Vec<Vector2<f64>>,
    pub depths: Vec<f64>,
    /// Ground truth transform from the reference to the current frame
    pub t21: SE3,
}

fn ray(camera: &PinholeIntrinsics, u: f64, v: f64) -> Vector3<f64> {
    Vector3::new((u - camera.cx) / camera.fx, (v - camera.cy) / camera.fy, 1.0)
}

/// Render the reference and current views of `plane` under motion `t21`, and pick
/// reference keypoints on a regular grid with `step` pixel spacing.
pub fn render_scene(plane: Plane, t21: &SE3, step: usize) -> SyntheticScene {
    let camera = wide_camera();
    let rotation = t21.rotation_matrix();
    let translation = t21.translation();
    let rotated_normal = rotation * plane.normal;

    let reference_depth = |u: f64, v: f64| plane.distance / plane.normal.dot(&ray(&camera, u, v));

    let reference = Image::from_fn(WIDTH, HEIGHT, |u, v| {
        let (u, v) = (u as f64, v as f64);
        let point = reference_depth(u, v) * ray(&camera, u, v);
        plane_texture(point.x, point.y) as f32
    })
    .expect("valid image size");

    // current pixel ray r' hits the plane at s·r' with
    // s = (d + (R n)·t) / ((R n)·r'), X_ref = Rᵀ (s r' - t)
    let current = Image::from_fn(WIDTH, HEIGHT, |u, v| {
        let r = ray(&camera, u as f64, v as f64);
        let s = (plane.distance + rotated_normal.dot(&translation)) / rotated_normal.dot(&r);
        let point = rotation.transpose() * (s * r - translation);
        plane_texture(point.x, point.y) as f32
    })
    .expect("valid image size");

    let margin = 8;
    let mut keypoints = Vec::new();
    let mut depths = Vec::new();
    for v in (margin..HEIGHT - margin).step_by(step) {
        for u in (margin..WIDTH - margin).step_by(step) {
            let (u, v) = (u as f64, v as f64);
            keypoints.push(Vector2::new(u, v));
            depths.push(reference_depth(u, v));
        }
    }

    SyntheticScene {
        camera,
        reference,
        current,
        keypoints,
        depths,
        t21: t21.clone(),
    }
}

/// Translation and rotation-angle difference between two poses.
pub fn pose_error(estimate: &SE3, truth: &SE3) -> (f64, f64) {
    let delta = truth.between(estimate);
    let rotation = delta.rotation_matrix();
    let cos_angle = ((rotation.trace() - 1.0) / 2.0).clamp(-1.0, 1.0);
    (delta.translation().norm(), cos_angle.acos())
}
