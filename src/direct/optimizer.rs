//! Gauss-Newton estimation of a single SE(3) pose from photometric error.
//!
//! Each iteration re-linearizes every keypoint at the current pose, solves the 6x6
//! normal equations and applies the increment on the left: `T ← exp(δ)·T`.
//!
//! Stopping rules, in order:
//! 1. the increment is not finite (or the solve fails): [`AlignmentStatus::IllConditioned`],
//!    the pose is left untouched;
//! 2. the cost rose after the first iteration: [`AlignmentStatus::Diverged`], the
//!    pose of the previous iteration is returned;
//! 3. `‖δ‖` fell below the threshold: [`AlignmentStatus::Converged`].

use crate::camera::PinholeIntrinsics;
use crate::direct::accumulator::JacobianAccumulator;
use crate::error::AlignResult;
use crate::image::{Image, Intensity};
use crate::linalg::{LinearSolverType, solve_normal_equations};
use crate::manifold::LieGroup;
use crate::manifold::se3::{SE3, SE3Tangent};
use nalgebra::Vector2;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Configuration for the direct pose estimator.
#[derive(Debug, Clone)]
pub struct DirectAlignConfig {
    /// Maximum number of Gauss-Newton iterations
    pub max_iterations: usize,
    /// Stop once the update norm is below this
    pub convergence_threshold: f64,
    /// Patch radius around every keypoint
    pub half_patch_size: usize,
    /// Linearize chunks on the rayon thread pool
    pub parallel: bool,
    /// Keypoints per linearization chunk
    pub chunk_size: usize,
    /// Factorization for the normal equations
    pub linear_solver_type: LinearSolverType,
}

impl Default for DirectAlignConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            convergence_threshold: 1e-3,
            half_patch_size: 1,
            parallel: true,
            chunk_size: 512,
            linear_solver_type: LinearSolverType::default(),
        }
    }
}

impl DirectAlignConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_convergence_threshold(mut self, convergence_threshold: f64) -> Self {
        self.convergence_threshold = convergence_threshold;
        self
    }

    pub fn with_half_patch_size(mut self, half_patch_size: usize) -> Self {
        self.half_patch_size = half_patch_size;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_linear_solver_type(mut self, linear_solver_type: LinearSolverType) -> Self {
        self.linear_solver_type = linear_solver_type;
        self
    }
}

/// Why the estimator stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentStatus {
    /// Update norm fell below the convergence threshold
    Converged,
    /// Iteration cap reached
    MaxIterationsReached,
    /// The normal equations produced no finite update (e.g. textureless patches)
    IllConditioned,
    /// Cost increased between iterations
    Diverged,
}

impl fmt::Display for AlignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentStatus::Converged => write!(f, "Converged"),
            AlignmentStatus::MaxIterationsReached => write!(f, "Maximum iterations reached"),
            AlignmentStatus::IllConditioned => write!(f, "Ill-conditioned system"),
            AlignmentStatus::Diverged => write!(f, "Cost diverged"),
        }
    }
}

/// Result of one estimation run.
#[derive(Debug, Clone)]
pub struct AlignmentSummary {
    /// Refined transform from the reference to the current camera frame
    pub pose: SE3,
    pub status: AlignmentStatus,
    /// Cost at the initial pose
    pub initial_cost: f64,
    /// Cost belonging to the returned pose's linearization
    pub final_cost: f64,
    /// Gauss-Newton iterations run
    pub iterations: usize,
    /// Keypoints that projected into the current image in the last pass
    pub good_points: usize,
    /// Projected pixel of every keypoint in the last pass
    pub projections: Vec<Option<Vector2<f64>>>,
    pub elapsed_time: Duration,
}

impl fmt::Display for AlignmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Direct alignment summary:")?;
        writeln!(f, "  Status: {}", self.status)?;
        writeln!(f, "  Initial cost: {:.6}", self.initial_cost)?;
        writeln!(f, "  Final cost: {:.6}", self.final_cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Good points: {}", self.good_points)?;
        writeln!(f, "  Elapsed: {:.3?}", self.elapsed_time)?;
        write!(f, "  Pose: {}", self.pose)
    }
}

/// Single-layer direct (photometric) pose estimator.
#[derive(Debug, Clone)]
pub struct DirectPoseEstimator {
    camera: PinholeIntrinsics,
    config: DirectAlignConfig,
}

impl DirectPoseEstimator {
    pub fn new(camera: PinholeIntrinsics) -> Self {
        Self::with_config(camera, DirectAlignConfig::default())
    }

    pub fn with_config(camera: PinholeIntrinsics, config: DirectAlignConfig) -> Self {
        Self { camera, config }
    }

    pub fn config(&self) -> &DirectAlignConfig {
        &self.config
    }

    pub fn camera(&self) -> &PinholeIntrinsics {
        &self.camera
    }

    /// Estimate the transform taking reference-frame points into the current frame.
    ///
    /// `keypoints` and `depths` describe reference pixels with known depth; `initial`
    /// is the starting guess for `T21`.
    pub fn estimate<T: Intensity>(
        &self,
        reference: &Image<T>,
        current: &Image<T>,
        keypoints: &[Vector2<f64>],
        depths: &[f64],
        initial: &SE3,
    ) -> AlignResult<AlignmentSummary> {
        let start = Instant::now();
        let mut accumulator =
            JacobianAccumulator::new(reference, current, keypoints, depths, self.camera)?
                .with_half_patch_size(self.config.half_patch_size);

        let mut pose = initial.clone();
        let mut previous_pose = initial.clone();
        let mut status = AlignmentStatus::MaxIterationsReached;
        let mut initial_cost = None;
        let mut last_cost = 0.0;
        let mut final_cost = 0.0;
        let mut iterations = 0;

        for iteration in 0..self.config.max_iterations {
            iterations = iteration + 1;
            accumulator.reset();
            accumulator.accumulate_chunked(&pose, self.config.chunk_size, self.config.parallel);
            let cost = accumulator.cost();
            if initial_cost.is_none() {
                initial_cost = Some(cost);
            }

            let update = match solve_normal_equations(
                accumulator.hessian(),
                accumulator.bias(),
                self.config.linear_solver_type,
            ) {
                Ok(update) if update.iter().all(|v| v.is_finite()) => update,
                Ok(_) => {
                    warn!("iteration {iteration}: update is not finite");
                    status = AlignmentStatus::IllConditioned;
                    final_cost = cost;
                    break;
                }
                Err(err) => {
                    warn!("iteration {iteration}: {err}");
                    status = AlignmentStatus::IllConditioned;
                    final_cost = cost;
                    break;
                }
            };

            if iteration > 0 && cost > last_cost {
                warn!("iteration {iteration}: cost increased {cost:.6} > {last_cost:.6}");
                status = AlignmentStatus::Diverged;
                pose = previous_pose;
                final_cost = last_cost;
                break;
            }

            let update_norm = update.norm();
            debug!(
                "iteration {iteration}: cost {cost:.6}, |update| {update_norm:.3e}, good {}",
                accumulator.good_count()
            );

            previous_pose = pose.clone();
            pose = pose.left_plus(&SE3Tangent::from_vector(update));
            final_cost = cost;

            if update_norm < self.config.convergence_threshold {
                status = AlignmentStatus::Converged;
                break;
            }
            last_cost = cost;
        }

        Ok(AlignmentSummary {
            pose,
            status,
            initial_cost: initial_cost.unwrap_or(0.0),
            final_cost,
            iterations,
            good_points: accumulator.good_count(),
            projections: accumulator.projected_points().to_vec(),
            elapsed_time: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn flat(value: f32) -> Result<Image<f32>, crate::image::ImageError> {
        Image::from_fn(40, 30, move |_, _| value)
    }

    #[test]
    fn test_config_builder() {
        let config = DirectAlignConfig::new()
            .with_max_iterations(25)
            .with_convergence_threshold(1e-5)
            .with_parallel(false)
            .with_chunk_size(64)
            .with_linear_solver_type(LinearSolverType::Qr);
        assert_eq!(config.max_iterations, 25);
        assert_eq!(config.convergence_threshold, 1e-5);
        assert!(!config.parallel);
        assert_eq!(config.chunk_size, 64);
        assert_eq!(config.linear_solver_type, LinearSolverType::Qr);
        assert_eq!(config.half_patch_size, 1);
    }

    #[test]
    fn test_default_config_matches_reference_policy() {
        let config = DirectAlignConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.convergence_threshold, 1e-3);
        assert_eq!(config.linear_solver_type, LinearSolverType::Cholesky);
    }

    #[test]
    fn test_textureless_image_is_ill_conditioned() -> TestResult {
        let image = flat(128.0)?;
        let camera = PinholeIntrinsics::new(30.0, 30.0, 20.0, 15.0)?;
        let keypoints = vec![Vector2::new(20.0, 15.0), Vector2::new(10.0, 8.0)];
        let depths = vec![3.0, 4.0];
        let initial = SE3::from_translation_euler(0.01, 0.0, 0.0, 0.0, 0.0, 0.0);

        let summary = DirectPoseEstimator::new(camera)
            .estimate(&image, &image, &keypoints, &depths, &initial)?;

        assert_eq!(summary.status, AlignmentStatus::IllConditioned);
        assert_eq!(summary.iterations, 1);
        assert_eq!(summary.pose, initial);
        Ok(())
    }

    #[test]
    fn test_no_keypoints_does_not_panic() -> TestResult {
        let image = flat(10.0)?;
        let camera = PinholeIntrinsics::new(30.0, 30.0, 20.0, 15.0)?;
        let summary =
            DirectPoseEstimator::new(camera).estimate(&image, &image, &[], &[], &SE3::identity())?;
        assert_eq!(summary.status, AlignmentStatus::IllConditioned);
        assert_eq!(summary.final_cost, 0.0);
        assert_eq!(summary.good_points, 0);
        Ok(())
    }

    #[test]
    fn test_mismatched_inputs_error() -> TestResult {
        let image = flat(10.0)?;
        let camera = PinholeIntrinsics::new(30.0, 30.0, 20.0, 15.0)?;
        let keypoints = vec![Vector2::new(5.0, 5.0)];
        let result =
            DirectPoseEstimator::new(camera).estimate(&image, &image, &keypoints, &[], &SE3::identity());
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn test_zero_iteration_cap() -> TestResult {
        let image = flat(10.0)?;
        let camera = PinholeIntrinsics::new(30.0, 30.0, 20.0, 15.0)?;
        let config = DirectAlignConfig::new().with_max_iterations(0);
        let summary = DirectPoseEstimator::with_config(camera, config).estimate(
            &image,
            &image,
            &[],
            &[],
            &SE3::identity(),
        )?;
        assert_eq!(summary.status, AlignmentStatus::MaxIterationsReached);
        assert_eq!(summary.iterations, 0);
        Ok(())
    }
}
