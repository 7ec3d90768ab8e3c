//! Sparse direct photometric pose estimation with LiDAR-camera projection utilities.
//!
//! A LiDAR scan is projected into a reference camera frame to obtain pixels with
//! known depth; a Gauss-Newton optimizer over SE(3) then aligns the reference image
//! to a second image by minimizing patch-wise photometric error.

pub mod calib;
pub mod camera;
pub mod direct;
pub mod error;
pub mod image;
pub mod io;
pub mod linalg;
pub mod logger;
pub mod manifold;
pub mod projection;

pub use calib::KittiCalibration;
pub use direct::{AlignmentStatus, AlignmentSummary, DirectAlignConfig, DirectPoseEstimator};
pub use error::{AlignError, AlignResult};
pub use logger::{init_logger, init_logger_with_level};
