//! B-spline basis functions over a knot vector.
//!
//! Two evaluators live here. [`cox_de_boor`] is the textbook recursion for a
//! single basis function `B_{j,p}(x)`. [`BSplineBasis`] locates the knot span
//! containing `x` and runs the same recursion only over the `p + 1` basis
//! functions that can be non-zero there.

use ndarray::Array1;

use crate::core::error::{Result, SplineError};
use crate::core::knots::KnotVector;

/// What to do with query points outside `[first knot, last knot]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extrapolation {
    /// Fail with [`SplineError::OutOfDomain`].
    #[default]
    Error,
    /// Evaluate at the nearest domain boundary.
    Nearest,
    /// Extend the first or last polynomial piece.
    Polynomial,
}

/// Evaluation settings shared by [`BSplineBasis`] and `BSpline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvalOptions {
    pub extrapolation: Extrapolation,
}

impl EvalOptions {
    pub fn with_extrapolation(extrapolation: Extrapolation) -> Self {
        Self { extrapolation }
    }
}

// Weight `num / den` where a zero-width knot interval contributes nothing.
#[inline]
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Evaluates the basis function `B_{j,degree}(x)` with the Cox-de Boor recursion.
///
/// # Arguments
/// * `j` - Index of the basis function (0-indexed).
/// * `degree` - Polynomial degree `p`.
/// * `x` - Evaluation point.
/// * `knots` - Knot vector; `knots.len() - degree - 1` basis functions exist.
///
/// Degree-0 functions are indicators of `[t_j, t_{j+1})`, except that the last
/// non-degenerate interval is closed on the right so the last knot belongs to
/// the domain. Terms whose knot difference is zero are dropped. Returns 0 for
/// out-of-range `j` and for `x` outside the knot vector.
pub fn cox_de_boor(j: usize, degree: usize, x: f64, knots: &KnotVector) -> f64 {
    // Number of basis functions definable at this degree
    let num_functions = knots
        .len()
        .checked_sub(degree)
        .and_then(|n| n.checked_sub(1))
        .unwrap_or(0);
    if j >= num_functions {
        return 0.0;
    }

    if degree == 0 {
        let (t_j, t_j_plus_1) = (knots[j], knots[j + 1]);
        if x >= t_j && x < t_j_plus_1 {
            return 1.0;
        }
        if x == knots.last() && j == knots.last_span() {
            return 1.0;
        }
        return 0.0;
    }

    // B_{j,p}(x) = (x - t_j) / (t_{j+p} - t_j) * B_{j,p-1}(x)
    //            + (t_{j+p+1} - x) / (t_{j+p+1} - t_{j+1}) * B_{j+1,p-1}(x)
    let t_j = knots[j];
    let t_j_plus_1 = knots[j + 1];
    let t_j_plus_p = knots[j + degree];
    let t_j_plus_p_plus_1 = knots[j + degree + 1];

    let term1_coeff = ratio(x - t_j, t_j_plus_p - t_j);
    let term2_coeff = ratio(t_j_plus_p_plus_1 - x, t_j_plus_p_plus_1 - t_j_plus_1);

    let val1 = if term1_coeff == 0.0 {
        0.0
    } else {
        term1_coeff * cox_de_boor(j, degree - 1, x, knots)
    };
    let val2 = if term2_coeff == 0.0 {
        0.0
    } else {
        term2_coeff * cox_de_boor(j + 1, degree - 1, x, knots)
    };

    val1 + val2
}

/// The set of B-spline basis functions of one degree over one knot vector.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineBasis {
    knots: KnotVector,
    degree: usize,
    options: EvalOptions,
}

impl BSplineBasis {
    /// Builds a basis; the knot vector must define at least one basis function,
    /// i.e. hold at least `degree + 2` knots.
    pub fn new(knots: KnotVector, degree: usize) -> Result<Self> {
        let min_knots = degree.checked_add(2).unwrap_or(usize::MAX);
        if knots.len() < min_knots {
            return Err(SplineError::DimensionMismatch {
                expected: min_knots,
                actual: knots.len(),
                degree,
            });
        }
        Ok(Self {
            knots,
            degree,
            options: EvalOptions::default(),
        })
    }

    /// Replaces the evaluation options.
    ///
    /// # Arguments
    /// * `options` - Extrapolation policy used by `eval`, `eval_nonzero` and
    ///   every spline built on this basis.
    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn knots(&self) -> &KnotVector {
        &self.knots
    }

    /// Polynomial degree `p`.
    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn options(&self) -> EvalOptions {
        self.options
    }

    /// Number of basis functions.
    ///
    /// # Returns
    /// `knots.len() - degree - 1`, at least 1 for any constructed basis.
    pub fn num_basis_functions(&self) -> usize {
        self.knots.len() - self.degree - 1
    }

    /// `(first knot, last knot)`.
    pub fn domain(&self) -> (f64, f64) {
        self.knots.domain()
    }

    /// `true` if the knot vector is clamped for this degree.
    pub fn is_clamped(&self) -> bool {
        self.knots.is_clamped(self.degree)
    }

    /// `true` if no knot repeats more than `degree + 1` times.
    pub fn is_regular(&self) -> bool {
        self.knots.is_regular(self.degree)
    }

    /// Knot averages `(t_{j+1} + ... + t_{j+p}) / p`, one per basis function.
    /// For degree 0 the midpoints of `[t_j, t_{j+1}]` are used.
    pub fn greville_abscissae(&self) -> Array1<f64> {
        let p = self.degree;
        let t = self.knots.as_array();
        Array1::from_shape_fn(self.num_basis_functions(), |j| {
            if p == 0 {
                0.5 * (t[j] + t[j + 1])
            } else {
                (1..=p).map(|i| t[j + i]).sum::<f64>() / p as f64
            }
        })
    }

    /// Values of all basis functions at `x`.
    pub fn eval(&self, x: f64) -> Result<Array1<f64>> {
        let (start, values) = self.eval_nonzero(x)?;
        let mut out = Array1::zeros(self.num_basis_functions());
        for (i, v) in values.into_iter().enumerate() {
            out[start + i] = v;
        }
        Ok(out)
    }

    /// Index of the first basis function that may be non-zero at `x`, followed
    /// by the values of it and its successors.
    ///
    /// Normally `degree + 1` values are returned. Fewer come back where the
    /// local support runs past either end of an unclamped knot vector.
    pub fn eval_nonzero(&self, x: f64) -> Result<(usize, Vec<f64>)> {
        let (span, x) = self.locate(x)?;
        let values = self.local_basis(span, x);

        let p = self.degree;
        let offset = p.saturating_sub(span);
        let start = span + offset - p;
        let end = (span + 1).min(self.num_basis_functions());
        Ok((start, values[offset..offset + (end - start)].to_vec()))
    }

    /// Maps `x` to a knot span and the point to evaluate at, applying the
    /// extrapolation policy.
    pub(crate) fn locate(&self, x: f64) -> Result<(usize, f64)> {
        let (lower, upper) = self.domain();
        let out_of_domain = || SplineError::OutOfDomain { x, lower, upper };
        if x.is_nan() {
            return Err(out_of_domain());
        }
        if x >= lower && x <= upper {
            return Ok((self.knots.find_span(x), x));
        }
        match self.options.extrapolation {
            Extrapolation::Error => Err(out_of_domain()),
            Extrapolation::Nearest => {
                let clamped = x.clamp(lower, upper);
                Ok((self.knots.find_span(clamped), clamped))
            }
            // find_span maps outside points to the boundary spans
            Extrapolation::Polynomial => Ok((self.knots.find_span(x), x)),
        }
    }

    /// Cox-de Boor recursion restricted to knot span `span`.
    ///
    /// Entry `r` of the result is `B_{span-p+r, p}(x)`. Entries whose index is
    /// negative or past the last basis function are zero.
    pub(crate) fn local_basis(&self, span: usize, x: f64) -> Vec<f64> {
        let p = self.degree;
        let t = self.knots.as_array();
        let len = t.len();

        let mut vals = vec![0.0; p + 1];
        vals[p] = 1.0;

        for d in 1..=p {
            // Ascending r: vals[r + 1] still holds degree d-1 when vals[r] is updated
            for r in (p - d)..=p {
                let k = span as isize + r as isize - p as isize;
                if k < 0 || k as usize + d + 1 >= len {
                    vals[r] = 0.0;
                    continue;
                }
                let k = k as usize;
                let lower = vals[r];
                let upper = if r < p { vals[r + 1] } else { 0.0 };
                let term1 = ratio(x - t[k], t[k + d] - t[k]) * lower;
                let term2 = ratio(t[k + d + 1] - x, t[k + d + 1] - t[k + 1]) * upper;
                vals[r] = term1 + term2;
            }
        }
        vals
    }
}
