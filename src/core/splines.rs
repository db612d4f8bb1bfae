use ndarray::{Array1, ArrayBase, Data, Ix1, Zip};

use crate::core::basis::{BSplineBasis, EvalOptions};
use crate::core::error::{Result, SplineError};
use crate::core::knots::{validate_knots, KnotVector};

/// Common spline degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplineKind {
    Linear,
    Quadratic,
    Cubic,
    Quartic,
}

impl SplineKind {
    pub fn degree(self) -> usize {
        match self {
            SplineKind::Linear => 1,
            SplineKind::Quadratic => 2,
            SplineKind::Cubic => 3,
            SplineKind::Quartic => 4,
        }
    }
}

/// A univariate B-spline `s(x) = sum_j c_j B_{j,p}(x)`.
///
/// Immutable once built; evaluation never mutates it, so one instance can be
/// shared across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct BSpline {
    basis: BSplineBasis,
    coefficients: Array1<f64>,
}

impl BSpline {
    /// Builds a spline from its coefficients, knot vector and degree.
    ///
    /// # Errors
    /// * [`SplineError::InvalidKnotVector`] if the knots decrease somewhere, are
    ///   not finite, or span an empty domain.
    /// * [`SplineError::DimensionMismatch`] unless
    ///   `knots.len() == coefficients.len() + degree + 1`.
    /// * [`SplineError::InvalidCoefficients`] if a coefficient is not finite.
    pub fn new<C, K>(coefficients: C, knots: K, degree: usize) -> Result<Self>
    where
        C: Into<Array1<f64>>,
        K: Into<Array1<f64>>,
    {
        let coefficients = coefficients.into();
        let knots = KnotVector::new(knots)?;
        validate_knots(&knots, degree, coefficients.len())?;
        let basis = BSplineBasis::new(knots, degree)?;
        Self::from_basis(basis, coefficients)
    }

    /// Builds a spline whose degree is named by `kind`.
    ///
    /// # Arguments
    /// * `coefficients` - One coefficient per basis function.
    /// * `knots` - Knot vector of length `coefficients.len() + kind.degree() + 1`.
    /// * `kind` - Linear, quadratic, cubic or quartic.
    pub fn with_kind<C, K>(coefficients: C, knots: K, kind: SplineKind) -> Result<Self>
    where
        C: Into<Array1<f64>>,
        K: Into<Array1<f64>>,
    {
        Self::new(coefficients, knots, kind.degree())
    }

    /// Attaches one coefficient per basis function to an existing basis.
    pub fn from_basis(basis: BSplineBasis, coefficients: Array1<f64>) -> Result<Self> {
        validate_knots(basis.knots(), basis.degree(), coefficients.len())?;
        if let Some((j, c)) = coefficients.iter().enumerate().find(|(_, c)| !c.is_finite()) {
            return Err(SplineError::InvalidCoefficients(format!(
                "coefficient c_{} = {} is not finite",
                j, c
            )));
        }

        let (lower, upper) = basis.domain();
        log::debug!(
            "B-spline of degree {} with {} coefficients on [{}, {}] (clamped: {})",
            basis.degree(),
            coefficients.len(),
            lower,
            upper,
            basis.is_clamped()
        );
        Ok(Self {
            basis,
            coefficients,
        })
    }

    /// Returns a copy evaluating under `options`.
    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.basis = self.basis.with_options(options);
        self
    }

    /// Polynomial degree `p`.
    pub fn degree(&self) -> usize {
        self.basis.degree()
    }

    pub fn knots(&self) -> &KnotVector {
        self.basis.knots()
    }

    /// Control coefficients `c_0, ..., c_{n-1}`.
    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    /// # Returns
    /// `n`, the number of coefficients and of basis functions.
    pub fn num_coefficients(&self) -> usize {
        self.coefficients.len()
    }

    /// The underlying basis, sharing this spline's knots, degree and options.
    pub fn basis(&self) -> &BSplineBasis {
        &self.basis
    }

    /// Current evaluation options.
    pub fn options(&self) -> EvalOptions {
        self.basis.options()
    }

    /// `(first knot, last knot)`.
    pub fn domain(&self) -> (f64, f64) {
        self.basis.domain()
    }

    /// `true` if the boundary knots are repeated `degree + 1` times, so the
    /// spline interpolates its first and last coefficients.
    pub fn is_clamped(&self) -> bool {
        self.basis.is_clamped()
    }

    /// Evaluates the spline at `x`.
    ///
    /// At the last knot the value is the limit from the left. Outside the
    /// domain the configured [`Extrapolation`](crate::core::basis::Extrapolation)
    /// policy applies.
    pub fn eval(&self, x: f64) -> Result<f64> {
        let (span, x) = self.basis.locate(x)?;
        Ok(self.eval_at_span(span, x))
    }

    /// Evaluates the spline at every point of `xs`, failing on the first
    /// rejected point.
    pub fn eval_many<S>(&self, xs: &ArrayBase<S, Ix1>) -> Result<Array1<f64>>
    where
        S: Data<Elem = f64>,
    {
        log::trace!("evaluating B-spline at {} points", xs.len());
        xs.iter()
            .map(|&x| self.eval(x))
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from)
    }

    /// Same result as [`eval_many`](Self::eval_many), computed on the rayon
    /// thread pool.
    pub fn eval_par<S>(&self, xs: &ArrayBase<S, Ix1>) -> Result<Array1<f64>>
    where
        S: Data<Elem = f64>,
    {
        log::trace!("evaluating B-spline at {} points in parallel", xs.len());
        let results = Zip::from(xs).par_map_collect(|&x| self.eval(x));
        results
            .iter()
            .cloned()
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from)
    }

    fn eval_at_span(&self, span: usize, x: f64) -> f64 {
        let p = self.degree();
        let n = self.coefficients.len();
        self.basis
            .local_basis(span, x)
            .iter()
            .enumerate()
            .filter_map(|(r, b)| {
                let j = (span + r).checked_sub(p)?;
                (j < n).then(|| b * self.coefficients[j])
            })
            .sum()
    }
}
