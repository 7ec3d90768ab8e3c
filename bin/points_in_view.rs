//! LiDAR Points-In-View Binary
//!
//! Projects a KITTI velodyne scan into a grayscale camera frame and reports how many
//! points land inside the image within the usable depth band.
//!
//! # Usage
//! ```bash
//! cargo run --release --bin points_in_view -- image_0/000000.png velodyne/000000.bin
//!
//! # With a sequence calibration file instead of the built-in sequence 00 constants:
//! cargo run --release --bin points_in_view -- image_0/000000.png velodyne/000000.bin --calib calib.txt
//! ```

use clap::Parser;
use direct_align::init_logger;
use direct_align::io::{load_gray_image, load_velodyne_bin};
use direct_align::projection::{DepthBand, project_points_in_view};
use direct_align::KittiCalibration;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Project a LiDAR scan into a camera image
#[derive(Parser)]
#[command(name = "points_in_view")]
#[command(about = "Project a LiDAR scan into a camera image")]
struct Args {
    /// Grayscale (or color, converted) camera image
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Velodyne scan (.bin, 16-byte records)
    #[arg(value_name = "SCAN")]
    scan: PathBuf,

    /// KITTI calib.txt with P0 and Tr entries (defaults to sequence 00)
    #[arg(long)]
    calib: Option<PathBuf>,

    /// Minimum projected depth in meters
    #[arg(long, default_value = "5.0")]
    min_depth: f64,

    /// Maximum projected depth in meters
    #[arg(long, default_value = "70.0")]
    max_depth: f64,

    /// Print the first N accepted points
    #[arg(short = 'n', long, default_value = "0")]
    show: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logger();

    let calib = match &args.calib {
        Some(path) => KittiCalibration::from_calib_file(path)?,
        None => KittiCalibration::sequence_00()?,
    };

    let image = load_gray_image(&args.image)?;
    let cloud = load_velodyne_bin(&args.scan)?;

    let start = Instant::now();
    let in_view = project_points_in_view(
        &cloud,
        &image,
        &calib.t_cam_lidar,
        &calib.intrinsics.projection_matrix(),
        DepthBand::new(args.min_depth, args.max_depth),
    );
    let elapsed = start.elapsed();

    info!("lidar points: {}", cloud.len());
    info!("in view points: {}", in_view.len());
    info!("projection time: {:?}", elapsed);

    for point in in_view.overlay().iter().take(args.show) {
        info!(
            "  xyz ({:8.3}, {:8.3}, {:8.3})  uv ({:7.2}, {:7.2})  intensity {:6.1}",
            point.x, point.y, point.z, point.u, point.v, point.r
        );
    }

    Ok(())
}
