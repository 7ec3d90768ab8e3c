//! Dense linear algebra for the 6x6 Gauss-Newton normal equations.
//!
//! The photometric problem has a single SE(3) block, so the system `H·δ = b` is
//! solved densely with nalgebra. Cholesky is the default; QR handles Hessians that
//! are only semi-definite in floating point.

use nalgebra::{Matrix6, Vector6};
use thiserror::Error;

/// Linear algebra specific errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinAlgError {
    /// Matrix factorization failed
    #[error("Matrix factorization failed: {0}")]
    FactorizationFailed(String),
    /// Singular matrix detected
    #[error("Singular matrix detected (matrix is not invertible)")]
    SingularMatrix,
    /// Non-finite values in the system
    #[error("Non-finite entries in the linear system")]
    NonFinite,
}

/// Result type for linear algebra operations
pub type LinAlgResult<T> = Result<T, LinAlgError>;

/// Factorization used for the normal equations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearSolverType {
    /// Dense Cholesky (LLᵀ), requires a positive-definite Hessian
    #[default]
    Cholesky,
    /// Dense QR, tolerates rank-deficient directions better
    Qr,
}

impl std::fmt::Display for LinearSolverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinearSolverType::Cholesky => write!(f, "cholesky"),
            LinearSolverType::Qr => write!(f, "qr"),
        }
    }
}

/// Solve `H·δ = b` for the pose increment.
pub fn solve_normal_equations(
    hessian: &Matrix6<f64>,
    bias: &Vector6<f64>,
    solver: LinearSolverType,
) -> LinAlgResult<Vector6<f64>> {
    if hessian.iter().chain(bias.iter()).any(|v| !v.is_finite()) {
        return Err(LinAlgError::NonFinite);
    }

    match solver {
        LinearSolverType::Cholesky => hessian
            .cholesky()
            .map(|chol| chol.solve(bias))
            .ok_or_else(|| {
                LinAlgError::FactorizationFailed(
                    "Hessian is not positive definite".to_string(),
                )
            }),
        LinearSolverType::Qr => hessian.qr().solve(bias).ok_or(LinAlgError::SingularMatrix),
    }
}
