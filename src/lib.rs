//! Univariate B-splines built from explicit coefficients, knots and degree,
//! evaluated with the Cox-de Boor recursion.
//!
//! ```
//! use bspline_rs::BSpline;
//!
//! let bs = BSpline::new(
//!     vec![0.0, 1.0, 0.0, 1.0, 0.0],
//!     vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 4.0],
//!     1,
//! )?;
//! assert_eq!(bs.eval(0.5)?, 0.5);
//! # Ok::<(), bspline_rs::SplineError>(())
//! ```

pub mod core;

pub use crate::core::basis::{cox_de_boor, BSplineBasis, EvalOptions, Extrapolation};
pub use crate::core::error::{Result, SplineError};
pub use crate::core::knots::KnotVector;
pub use crate::core::splines::{BSpline, SplineKind};
