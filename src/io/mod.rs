//! Loaders for KITTI-style inputs: velodyne scans, grayscale frames and `calib.txt`.

use crate::image::Image;
use crate::projection::LidarPoint;
use memmap2::Mmap;
use nalgebra::Matrix3x4;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while reading input files
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("File size {len} is not a multiple of the {record_size}-byte record size")]
    TruncatedRecord { len: usize, record_size: usize },

    #[error("Image decoding failed: {0}")]
    Image(String),

    #[error("Missing calibration entry: {0}")]
    MissingCalibration(String),
}

/// Binary layout of one point record: little-endian `f32` fields, no header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointRecordLayout {
    /// `x, y, z, reflectance` (16 bytes), the KITTI velodyne format
    #[default]
    XyzIntensity,
    /// `x, y, z` (12 bytes); reflectance reads as 0
    Xyz,
}

impl PointRecordLayout {
    pub fn record_size(self) -> usize {
        match self {
            PointRecordLayout::XyzIntensity => 16,
            PointRecordLayout::Xyz => 12,
        }
    }
}

#[inline]
fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Decode a flat buffer of point records.
pub fn parse_point_records(
    bytes: &[u8],
    layout: PointRecordLayout,
) -> Result<Vec<LidarPoint>, IoError> {
    let record_size = layout.record_size();
    if bytes.len() % record_size != 0 {
        return Err(IoError::TruncatedRecord {
            len: bytes.len(),
            record_size,
        });
    }

    Ok(bytes
        .par_chunks_exact(record_size)
        .map(|record| {
            let intensity = match layout {
                PointRecordLayout::XyzIntensity => read_f32(record, 12),
                PointRecordLayout::Xyz => 0.0,
            };
            LidarPoint::new(
                read_f32(record, 0),
                read_f32(record, 4),
                read_f32(record, 8),
                intensity,
            )
        })
        .collect())
}

/// Load a point cloud from a flat binary file.
pub fn load_point_cloud<P: AsRef<Path>>(
    path: P,
    layout: PointRecordLayout,
) -> Result<Vec<LidarPoint>, IoError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    let mmap = unsafe { Mmap::map(&file)? };
    let points = parse_point_records(&mmap, layout)?;
    info!("Loaded {} points from {}", points.len(), path.display());
    Ok(points)
}

/// Load a KITTI velodyne scan (`.bin`, 16-byte records).
pub fn load_velodyne_bin<P: AsRef<Path>>(path: P) -> Result<Vec<LidarPoint>, IoError> {
    load_point_cloud(path, PointRecordLayout::XyzIntensity)
}

/// Load any image the `image` crate can decode and convert it to 8-bit grey.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> Result<Image<u8>, IoError> {
    let path = path.as_ref();
    let decoded = ::image::open(path).map_err(|e| IoError::Image(format!("{}: {e}", path.display())))?;
    let gray = Image::try_from(decoded.to_luma8())
        .map_err(|e| IoError::Image(format!("{}: {e}", path.display())))?;
    info!(
        "Loaded {}x{} image from {}",
        gray.width(),
        gray.height(),
        path.display()
    );
    Ok(gray)
}

/// Parse `key: v0 v1 ...` lines of a KITTI calibration file.
pub fn parse_calibration(content: &str) -> Result<HashMap<String, Vec<f64>>, IoError> {
    let mut entries = HashMap::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, values)) = line.split_once(':') else {
            return Err(IoError::Parse {
                line: line_num + 1,
                message: format!("expected 'key: values', got '{line}'"),
            });
        };
        let values = values
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| IoError::Parse {
                    line: line_num + 1,
                    message: format!("invalid number '{token}'"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.insert(key.trim().to_string(), values);
    }
    Ok(entries)
}

/// Read a row-major 3x4 matrix stored under `key`.
pub fn calibration_matrix(
    entries: &HashMap<String, Vec<f64>>,
    key: &str,
) -> Result<Matrix3x4<f64>, IoError> {
    let values = entries
        .get(key)
        .ok_or_else(|| IoError::MissingCalibration(key.to_string()))?;
    if values.len() != 12 {
        return Err(IoError::MissingCalibration(format!(
            "{key} has {} values, expected 12",
            values.len()
        )));
    }
    Ok(Matrix3x4::from_row_slice(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn encode(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_parse_sixteen_byte_records() -> TestResult {
        let bytes = encode(&[1.0, 2.0, 3.0, 0.5, -4.0, 5.5, 6.0, 0.25]);
        let points = parse_point_records(&bytes, PointRecordLayout::XyzIntensity)?;
        assert_eq!(
            points,
            vec![
                LidarPoint::new(1.0, 2.0, 3.0, 0.5),
                LidarPoint::new(-4.0, 5.5, 6.0, 0.25)
            ]
        );
        Ok(())
    }

    #[test]
    fn test_parse_twelve_byte_records() -> TestResult {
        let bytes = encode(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let points = parse_point_records(&bytes, PointRecordLayout::Xyz)?;
        assert_eq!(points.len(), 2);
        assert_eq!(points[1], LidarPoint::new(4.0, 5.0, 6.0, 0.0));
        Ok(())
    }

    #[test]
    fn test_partial_record_rejected() {
        let mut bytes = encode(&[1.0, 2.0, 3.0, 4.0]);
        bytes.push(0);
        let result = parse_point_records(&bytes, PointRecordLayout::XyzIntensity);
        assert!(matches!(
            result,
            Err(IoError::TruncatedRecord {
                len: 17,
                record_size: 16
            })
        ));
    }

    #[test]
    fn test_load_velodyne_file() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&encode(&[10.0, -1.0, 0.5, 0.9]))?;
        file.flush()?;
        let points = load_velodyne_bin(file.path())?;
        assert_eq!(points, vec![LidarPoint::new(10.0, -1.0, 0.5, 0.9)]);
        Ok(())
    }

    #[test]
    fn test_load_empty_file() -> TestResult {
        let file = tempfile::NamedTempFile::new()?;
        assert!(load_velodyne_bin(file.path())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = load_velodyne_bin("/nonexistent/000000.bin");
        assert!(matches!(result, Err(IoError::Io(_))));
    }

    #[test]
    fn test_parse_calibration() -> TestResult {
        let content = "P0: 718.856 0 607.1928 0 0 718.856 185.2157 0 0 0 1 0\n\
                       Tr: 1 0 0 0.1 0 1 0 0.2 0 0 1 0.3\n";
        let entries = parse_calibration(content)?;
        let p0 = calibration_matrix(&entries, "P0")?;
        assert_eq!(p0[(0, 0)], 718.856);
        assert_eq!(p0[(1, 2)], 185.2157);
        let tr = calibration_matrix(&entries, "Tr")?;
        assert_eq!(tr[(2, 3)], 0.3);
        assert!(matches!(
            calibration_matrix(&entries, "P2"),
            Err(IoError::MissingCalibration(_))
        ));
        Ok(())
    }

    #[test]
    fn test_parse_calibration_bad_number() {
        let result = parse_calibration("P0: 1 2 x\n");
        assert!(matches!(result, Err(IoError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_load_gray_image_roundtrip() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("frame.png");
        let gray = ::image::GrayImage::from_fn(4, 3, |x, y| ::image::Luma([(x * 20 + y) as u8]));
        gray.save(&path)?;

        let loaded = load_gray_image(&path)?;
        assert_eq!((loaded.width(), loaded.height()), (4, 3));
        assert_eq!(loaded.get(3, 2), Some(62));
        Ok(())
    }
}
