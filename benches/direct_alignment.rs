//! Benchmarks for sparse direct alignment
//!
//! Compares sequential and rayon-parallel Jacobian accumulation for growing keypoint
//! counts on a KITTI-sized frame, and times a full Gauss-Newton run.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use direct_align::camera::PinholeIntrinsics;
use direct_align::direct::{DirectAlignConfig, DirectPoseEstimator, JacobianAccumulator};
use direct_align::image::Image;
use direct_align::manifold::se3::SE3;
use nalgebra::{Vector2, Vector3};
use std::hint::black_box;
use std::time::Duration;

const WIDTH: usize = 1241;
const HEIGHT: usize = 376;

fn texture(x: f64, y: f64) -> u8 {
    (128.0 + 60.0 * (0.11 * x).sin() * (0.13 * y).cos() + 40.0 * (0.03 * (x - 2.0 * y)).sin())
        .clamp(0.0, 255.0) as u8
}

fn create_frame_pair(shift: f64) -> (Image<u8>, Image<u8>) {
    let reference = Image::from_fn(WIDTH, HEIGHT, |x, y| texture(x as f64, y as f64))
        .expect("valid frame size");
    let current = Image::from_fn(WIDTH, HEIGHT, |x, y| texture(x as f64 - shift, y as f64))
        .expect("valid frame size");
    (reference, current)
}

fn create_keypoints(count: usize) -> (Vec<Vector2<f64>>, Vec<f64>) {
    let keypoints: Vec<_> = (0..count)
        .map(|i| {
            let u = 20.0 + (i as f64 * 37.7) % (WIDTH as f64 - 40.0);
            let v = 20.0 + (i as f64 * 13.3) % (HEIGHT as f64 - 40.0);
            Vector2::new(u, v)
        })
        .collect();
    let depths = (0..count).map(|i| 8.0 + (i % 50) as f64).collect();
    (keypoints, depths)
}

fn kitti_camera() -> PinholeIntrinsics {
    PinholeIntrinsics {
        fx: 718.856,
        fy: 718.856,
        cx: 607.1928,
        cy: 185.2157,
    }
}

fn benchmark_accumulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("jacobian_accumulation");
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(20);

    let (reference, current) = create_frame_pair(1.5);
    let pose = SE3::from_translation(Vector3::new(0.02, 0.0, 0.1));

    for count in [1_000usize, 5_000, 20_000] {
        let (keypoints, depths) = create_keypoints(count);

        for (label, parallel) in [("sequential", false), ("parallel", true)] {
            group.bench_with_input(BenchmarkId::new(label, count), &count, |b, _| {
                let mut accumulator = JacobianAccumulator::new(
                    &reference,
                    &current,
                    &keypoints,
                    &depths,
                    kitti_camera(),
                )
                .expect("matching keypoints and depths");
                b.iter(|| {
                    accumulator.reset();
                    accumulator.accumulate_chunked(black_box(&pose), 512, parallel);
                    black_box(accumulator.cost())
                });
            });
        }
    }

    group.finish();
}

fn benchmark_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("direct_pose_estimation");
    group.sample_size(10);

    let (reference, current) = create_frame_pair(1.5);
    let (keypoints, depths) = create_keypoints(10_000);
    let estimator = DirectPoseEstimator::with_config(kitti_camera(), DirectAlignConfig::default());

    group.bench_function("10k_keypoints", |b| {
        b.iter(|| {
            estimator
                .estimate(
                    black_box(&reference),
                    black_box(&current),
                    &keypoints,
                    &depths,
                    &SE3::from_translation(Vector3::zeros()),
                )
                .map(|summary| summary.final_cost)
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_accumulation, benchmark_estimation);
criterion_main!(benches);
