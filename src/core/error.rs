//! Error type shared by knot, basis and spline operations.

use thiserror::Error;

/// Errors raised while building or evaluating a B-spline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplineError {
    /// The knot vector is decreasing somewhere, holds a non-finite value,
    /// or spans an empty domain.
    #[error("Invalid knot vector: {0}")]
    InvalidKnotVector(String),

    /// `knots.len()` does not match `coefficients.len() + degree + 1`.
    #[error("Dimension mismatch for degree {degree}: expected {expected} knots, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        degree: usize,
    },

    /// Query point outside `[lower, upper]` while extrapolation is disabled.
    #[error("Point {x} is outside the spline domain [{lower}, {upper}]")]
    OutOfDomain { x: f64, lower: f64, upper: f64 },

    #[error("Invalid coefficients: {0}")]
    InvalidCoefficients(String),

    /// Bad parameters passed to a knot generator.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, SplineError>;
