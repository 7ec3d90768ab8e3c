//! Sparse direct image alignment.
//!
//! Estimates the rigid motion `T21` between a reference and a current grayscale
//! image from reference pixels with known depth, by minimizing the photometric error
//! of small patches around them with Gauss-Newton on SE(3).
//!
//! # Example
//!
//! ```no_run
//! use direct_align::camera::PinholeIntrinsics;
//! use direct_align::direct::{DirectAlignConfig, DirectPoseEstimator};
//! use direct_align::image::Image;
//! use direct_align::manifold::LieGroup;
//! use direct_align::manifold::se3::SE3;
//! use nalgebra::Vector2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reference: Image<u8> = Image::new(640, 480, vec![0; 640 * 480])?;
//! let current = reference.clone();
//! let keypoints = vec![Vector2::new(320.0, 240.0)];
//! let depths = vec![10.0];
//!
//! let camera = PinholeIntrinsics::new(500.0, 500.0, 320.0, 240.0)?;
//! let estimator = DirectPoseEstimator::with_config(camera, DirectAlignConfig::default());
//! let summary = estimator.estimate(&reference, &current, &keypoints, &depths, &SE3::identity())?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod accumulator;
pub mod optimizer;

pub use accumulator::{JacobianAccumulator, RangeContribution};
pub use optimizer::{AlignmentStatus, AlignmentSummary, DirectAlignConfig, DirectPoseEstimator};
