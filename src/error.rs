//! Error types for the direct-align library
//!
//! This module provides the main error and result types used throughout the library.
//! All errors use the `thiserror` crate for automatic trait implementations.

use crate::{
    camera::CameraModelError, image::ImageError, io::IoError, linalg::LinAlgError,
    manifold::ManifoldError,
};
use thiserror::Error;

/// Main result type used throughout the direct-align library
pub type AlignResult<T> = Result<T, AlignError>;

/// Main error type for the direct-align library
#[derive(Debug, Clone, Error)]
pub enum AlignError {
    /// Linear algebra related errors
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),

    /// IO related errors (point cloud, image and calibration loading)
    #[error("IO error: {0}")]
    Io(String),

    /// Manifold operations errors
    #[error("Manifold error: {0}")]
    Manifold(String),

    /// Camera model errors
    #[error("Camera error: {0}")]
    Camera(String),

    /// Image buffer errors
    #[error("Image error: {0}")]
    Image(String),

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<std::io::Error> for AlignError {
    fn from(err: std::io::Error) -> Self {
        AlignError::Io(err.to_string())
    }
}

impl From<LinAlgError> for AlignError {
    fn from(err: LinAlgError) -> Self {
        AlignError::LinearAlgebra(err.to_string())
    }
}

impl From<ManifoldError> for AlignError {
    fn from(err: ManifoldError) -> Self {
        AlignError::Manifold(err.to_string())
    }
}

impl From<CameraModelError> for AlignError {
    fn from(err: CameraModelError) -> Self {
        AlignError::Camera(err.to_string())
    }
}

impl From<ImageError> for AlignError {
    fn from(err: ImageError) -> Self {
        AlignError::Image(err.to_string())
    }
}

impl From<IoError> for AlignError {
    fn from(err: IoError) -> Self {
        AlignError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_align_error_display() {
        let error = AlignError::LinearAlgebra("Matrix is singular".to_string());
        assert_eq!(
            error.to_string(),
            "Linear algebra error: Matrix is singular"
        );
    }

    #[test]
    fn test_align_error_from_io() {
        let io_error = std::io::Error::new(ErrorKind::NotFound, "File not found");
        let align_error = AlignError::from(io_error);

        match align_error {
            AlignError::Io(msg) => assert!(msg.contains("File not found")),
            _ => panic!("Expected IO error"),
        }
    }

    #[test]
    fn test_align_error_from_camera() {
        let err = AlignError::from(CameraModelError::FocalLengthMustBePositive);
        assert!(matches!(err, AlignError::Camera(_)));
    }

    #[test]
    fn test_align_result_err() {
        let result: AlignResult<i32> = Err(AlignError::InvalidInput("Test error".to_string()));
        assert!(result.is_err());
    }
}
