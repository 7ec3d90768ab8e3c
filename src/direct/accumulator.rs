//! Photometric Jacobian accumulation for one SE(3) pose.
//!
//! For each reference keypoint with known depth, the point is moved into the
//! current frame with the pose under evaluation and projected. A square patch
//! around both pixels contributes the photometric residual `I_ref - I_cur` and its
//! 6-DoF Jacobian to the Gauss-Newton system:
//!
//! ```text
//! J = -(∇I_cur(u')ᵀ · ∂u'/∂ξ)ᵀ
//! H += J·Jᵀ      b += -e·J      cost += e²
//! ```
//!
//! Index ranges are linearized independently into [`RangeContribution`]s which are
//! folded with an associative merge, so the result does not depend on how the
//! keypoints are partitioned (up to floating-point summation order).

use crate::camera::PinholeIntrinsics;
use crate::error::{AlignError, AlignResult};
use crate::image::{Image, Intensity};
use crate::manifold::se3::SE3;
use nalgebra::{Matrix6, Vector2, Vector6};
use rayon::prelude::*;
use std::ops::Range;

/// Partial Gauss-Newton sums over a range of keypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeContribution {
    pub hessian: Matrix6<f64>,
    pub bias: Vector6<f64>,
    /// Sum of squared patch residuals.
    pub cost_sum: f64,
    /// Keypoints that projected inside the current image.
    pub good_count: usize,
    /// `(keypoint index, projected pixel)` of every good keypoint.
    pub projections: Vec<(usize, Vector2<f64>)>,
}

impl Default for RangeContribution {
    fn default() -> Self {
        Self::empty()
    }
}

impl RangeContribution {
    pub fn empty() -> Self {
        Self {
            hessian: Matrix6::zeros(),
            bias: Vector6::zeros(),
            cost_sum: 0.0,
            good_count: 0,
            projections: Vec::new(),
        }
    }

    /// Combine two partial sums.
    pub fn merge(mut self, other: Self) -> Self {
        self.hessian += other.hessian;
        self.bias += other.bias;
        self.cost_sum += other.cost_sum;
        self.good_count += other.good_count;
        self.projections.extend(other.projections);
        self
    }
}

/// Accumulates `H`, `b` and cost of the photometric error between two images.
///
/// The accumulator borrows its inputs and never owns the pose; each pass receives
/// the pose to evaluate.
pub struct JacobianAccumulator<'a, T: Intensity = u8> {
    reference: &'a Image<T>,
    current: &'a Image<T>,
    keypoints: &'a [Vector2<f64>],
    depths: &'a [f64],
    camera: PinholeIntrinsics,
    half_patch_size: i32,

    hessian: Matrix6<f64>,
    bias: Vector6<f64>,
    cost_sum: f64,
    good_count: usize,
    projections: Vec<Option<Vector2<f64>>>,
}

impl<'a, T: Intensity> JacobianAccumulator<'a, T> {
    /// Bind the image pair and the reference keypoints with their depths.
    pub fn new(
        reference: &'a Image<T>,
        current: &'a Image<T>,
        keypoints: &'a [Vector2<f64>],
        depths: &'a [f64],
        camera: PinholeIntrinsics,
    ) -> AlignResult<Self> {
        if keypoints.len() != depths.len() {
            return Err(AlignError::InvalidInput(format!(
                "{} keypoints but {} depths",
                keypoints.len(),
                depths.len()
            )));
        }
        Ok(Self {
            reference,
            current,
            keypoints,
            depths,
            camera,
            half_patch_size: 1,
            hessian: Matrix6::zeros(),
            bias: Vector6::zeros(),
            cost_sum: 0.0,
            good_count: 0,
            projections: vec![None; keypoints.len()],
        })
    }

    /// Patch radius in pixels (1 gives a 3x3 patch and a 1 pixel border margin).
    ///
    /// Radii beyond `i32::MAX` saturate; such a margin rejects every keypoint.
    pub fn with_half_patch_size(mut self, half_patch_size: usize) -> Self {
        self.half_patch_size = i32::try_from(half_patch_size).unwrap_or(i32::MAX);
        self
    }

    /// Number of reference keypoints.
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Clear `H`, `b`, cost and the projected-points cache.
    pub fn reset(&mut self) {
        self.hessian = Matrix6::zeros();
        self.bias = Vector6::zeros();
        self.cost_sum = 0.0;
        self.good_count = 0;
        self.projections.fill(None);
    }

    /// Linearize `range` at `pose` (reference → current) without touching any state.
    pub fn linearize_range(&self, range: Range<usize>, pose: &SE3) -> RangeContribution {
        let mut contribution = RangeContribution::empty();
        let rotation = pose.rotation_matrix();
        let translation = pose.translation();

        let half = self.half_patch_size;
        let margin = half as f64;
        let max_u = self.current.width() as f64 - margin;
        let max_v = self.current.height() as f64 - margin;

        let end = range.end.min(self.keypoints.len());
        for i in range.start..end {
            let px_ref = self.keypoints[i];
            let point_ref = self.camera.back_project(&px_ref, self.depths[i]);
            let point_cur = rotation * point_ref + translation;
            if point_cur.z < 0.0 {
                continue;
            }

            let px_cur = self.camera.project_unchecked(&point_cur);
            let (u, v) = (px_cur.x, px_cur.y);
            if !(u >= margin && u <= max_u && v >= margin && v <= max_v) {
                continue;
            }

            contribution.projections.push((i, px_cur));
            contribution.good_count += 1;

            let j_pixel_xi = self.camera.pixel_jacobian_se3(&point_cur);
            for dx in -half..=half {
                for dy in -half..=half {
                    let (ox, oy) = (dx as f64, dy as f64);
                    let error = self.reference.sample_clamped(px_ref.x + ox, px_ref.y + oy)
                        - self.current.sample_clamped(u + ox, v + oy);

                    let gradient = Vector2::new(
                        0.5 * (self.current.sample_clamped(u + 1.0 + ox, v + oy)
                            - self.current.sample_clamped(u - 1.0 + ox, v + oy)),
                        0.5 * (self.current.sample_clamped(u + ox, v + 1.0 + oy)
                            - self.current.sample_clamped(u + ox, v - 1.0 + oy)),
                    );

                    let jacobian: Vector6<f64> = -(gradient.transpose() * j_pixel_xi).transpose();

                    contribution.hessian += jacobian * jacobian.transpose();
                    contribution.bias += -error * jacobian;
                    contribution.cost_sum += error * error;
                }
            }
        }

        contribution
    }

    /// Linearize `range` at `pose` and add it to the accumulated system.
    ///
    /// Squared errors and good-point counts are pooled across calls, so after several
    /// ranges `cost()` is the mean over all good keypoints, not a sum of per-range means.
    pub fn accumulate(&mut self, range: Range<usize>, pose: &SE3) {
        let contribution = self.linearize_range(range, pose);
        self.absorb(contribution);
    }

    /// Linearize every keypoint in chunks of `chunk_size`, in parallel when requested.
    pub fn accumulate_chunked(&mut self, pose: &SE3, chunk_size: usize, parallel: bool) {
        let total = self.keypoints.len();
        let chunk_size = chunk_size.max(1);
        let chunks = total.div_ceil(chunk_size);
        let chunk_range = |c: usize| c * chunk_size..((c + 1) * chunk_size).min(total);

        let this = &*self;
        let contribution = if parallel {
            (0..chunks)
                .into_par_iter()
                .map(|c| this.linearize_range(chunk_range(c), pose))
                .reduce(RangeContribution::empty, RangeContribution::merge)
        } else {
            (0..chunks)
                .map(|c| this.linearize_range(chunk_range(c), pose))
                .fold(RangeContribution::empty(), RangeContribution::merge)
        };
        self.absorb(contribution);
    }

    fn absorb(&mut self, contribution: RangeContribution) {
        self.hessian += contribution.hessian;
        self.bias += contribution.bias;
        self.cost_sum += contribution.cost_sum;
        self.good_count += contribution.good_count;
        for (index, pixel) in contribution.projections {
            self.projections[index] = Some(pixel);
        }
    }

    pub fn hessian(&self) -> &Matrix6<f64> {
        &self.hessian
    }

    pub fn bias(&self) -> &Vector6<f64> {
        &self.bias
    }

    /// Mean squared patch residual per good keypoint (0 with no good keypoints).
    pub fn cost(&self) -> f64 {
        if self.good_count == 0 {
            0.0
        } else {
            self.cost_sum / self.good_count as f64
        }
    }

    pub fn good_count(&self) -> usize {
        self.good_count
    }

    /// Projected pixel of each keypoint from the last pass, `None` when rejected.
    pub fn projected_points(&self) -> &[Option<Vector2<f64>>] {
        &self.projections
    }
}
