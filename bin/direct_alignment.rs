//! Direct Alignment Binary
//!
//! Seeds reference pixels from a velodyne scan projected into frame 0, then estimates
//! the camera motion to frame 1 by sparse photometric Gauss-Newton.
//!
//! # Usage
//! ```bash
//! cargo run --release --bin direct_alignment -- \
//!     image_0/000000.png image_0/000001.png velodyne/000000.bin
//!
//! # Compare against the sequence 00 ground truth motion:
//! cargo run --release --bin direct_alignment -- \
//!     image_0/000000.png image_0/000001.png velodyne/000000.bin --compare-ground-truth
//! ```

use clap::Parser;
use direct_align::calib::{SEQUENCE_00_T_WC0, SEQUENCE_00_T_WC1, homogeneous};
use direct_align::io::{load_gray_image, load_velodyne_bin};
use direct_align::linalg::LinearSolverType;
use direct_align::manifold::LieGroup;
use direct_align::manifold::se3::SE3;
use direct_align::projection::{DepthBand, project_points_in_view};
use direct_align::{DirectAlignConfig, DirectPoseEstimator, KittiCalibration, init_logger};
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, warn};

/// Sparse direct pose estimation between two camera frames
#[derive(Parser)]
#[command(name = "direct_alignment")]
#[command(about = "Sparse direct pose estimation between two camera frames")]
struct Args {
    /// Reference image (frame 0)
    #[arg(value_name = "REFERENCE")]
    reference: PathBuf,

    /// Current image (frame 1)
    #[arg(value_name = "CURRENT")]
    current: PathBuf,

    /// Velodyne scan taken with the reference image
    #[arg(value_name = "SCAN")]
    scan: PathBuf,

    /// KITTI calib.txt with P0 and Tr entries (defaults to sequence 00)
    #[arg(long)]
    calib: Option<PathBuf>,

    /// Maximum number of Gauss-Newton iterations
    #[arg(short, long, default_value = "10")]
    max_iterations: usize,

    /// Linearize on a single thread
    #[arg(long)]
    sequential: bool,

    /// Solve the normal equations with QR instead of Cholesky
    #[arg(long)]
    qr: bool,

    /// Report the error against the sequence 00 frame 0 -> 1 ground truth
    #[arg(long)]
    compare_ground_truth: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logger();

    let calib = match &args.calib {
        Some(path) => KittiCalibration::from_calib_file(path)?,
        None => KittiCalibration::sequence_00()?,
    };

    let reference = load_gray_image(&args.reference)?;
    let current = load_gray_image(&args.current)?;
    let cloud = load_velodyne_bin(&args.scan)?;

    let in_view = project_points_in_view(
        &cloud,
        &reference,
        &calib.t_cam_lidar,
        &calib.intrinsics.projection_matrix(),
        DepthBand::default(),
    );
    info!("lidar points: {}, in view: {}", cloud.len(), in_view.len());
    if in_view.is_empty() {
        return Err("no LiDAR points project into the reference image".into());
    }

    let keypoints = in_view.keypoints();
    let depths = in_view.depths();

    let solver = if args.qr {
        LinearSolverType::Qr
    } else {
        LinearSolverType::Cholesky
    };
    let config = DirectAlignConfig::new()
        .with_max_iterations(args.max_iterations)
        .with_parallel(!args.sequential)
        .with_linear_solver_type(solver);

    let estimator = DirectPoseEstimator::with_config(calib.intrinsics, config);
    let summary = estimator.estimate(&reference, &current, &keypoints, &depths, &SE3::identity())?;

    info!("{summary}");
    info!("T21 =\n{}", summary.pose.matrix());

    if args.compare_ground_truth {
        // T21 maps frame-0 points into frame 1: (T_WC0⁻¹ T_WC1)⁻¹
        let t_c0c1 = homogeneous(&SEQUENCE_00_T_WC0)
            .try_inverse()
            .ok_or("ground-truth pose is singular")?
            * homogeneous(&SEQUENCE_00_T_WC1);
        let mut ground_truth = SE3::from_matrix(&t_c0c1, 1e-4)?.inverse();
        ground_truth.normalize();

        let error = summary.pose.between(&ground_truth);
        let translation_error = error.translation().norm();
        info!("ground truth T21 =\n{}", ground_truth.matrix());
        info!("translation error: {translation_error:.4} m");
        if translation_error > 0.1 {
            warn!("estimate is more than 10 cm from ground truth");
        }
    }

    Ok(())
}
