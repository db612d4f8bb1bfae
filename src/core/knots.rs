use ndarray::{Array1, ArrayBase, Data, Ix1};

use crate::core::error::{Result, SplineError};

/// A validated, non-decreasing knot vector with a domain of positive width.
#[derive(Debug, Clone, PartialEq)]
pub struct KnotVector {
    knots: Array1<f64>,
    first_span: usize,
    last_span: usize,
}

impl KnotVector {
    /// Validates and wraps a knot sequence.
    ///
    /// The sequence must hold at least two knots, contain only finite values,
    /// be non-decreasing, and have `first < last`.
    pub fn new<K: Into<Array1<f64>>>(knots: K) -> Result<Self> {
        let knots = knots.into();
        if knots.len() < 2 {
            return Err(SplineError::InvalidKnotVector(format!(
                "at least two knots are required, got {}",
                knots.len()
            )));
        }
        if let Some((i, k)) = knots.iter().enumerate().find(|(_, k)| !k.is_finite()) {
            return Err(SplineError::InvalidKnotVector(format!(
                "knot t_{} = {} is not finite",
                i, k
            )));
        }
        for i in 0..(knots.len() - 1) {
            if knots[i] > knots[i + 1] {
                return Err(SplineError::InvalidKnotVector(format!(
                    "not non-decreasing: t_{}={} > t_{}={}",
                    i,
                    knots[i],
                    i + 1,
                    knots[i + 1]
                )));
            }
        }
        let (first, last) = (knots[0], knots[knots.len() - 1]);
        if first == last {
            return Err(SplineError::InvalidKnotVector(format!(
                "domain has zero width (all knots equal {})",
                first
            )));
        }
        let first_span = (0..knots.len() - 1)
            .find(|&i| knots[i] < knots[i + 1])
            .unwrap_or(0);
        let last_span = (0..knots.len() - 1)
            .rev()
            .find(|&i| knots[i] < knots[i + 1])
            .unwrap_or(0);
        Ok(Self {
            knots,
            first_span,
            last_span,
        })
    }

    /// Clamped knot vector with uniformly spaced interior knots.
    ///
    /// `x_min` and `x_max` are each repeated `degree + 1` times.
    pub fn uniform(x_min: f64, x_max: f64, num_internal_knots: usize, degree: usize) -> Result<Self> {
        if !x_min.is_finite() || !x_max.is_finite() {
            return Err(SplineError::InvalidArgument(format!(
                "range bounds must be finite, got [{}, {}]",
                x_min, x_max
            )));
        }
        if x_min >= x_max {
            return Err(SplineError::InvalidArgument(format!(
                "x_min ({}) must be less than x_max ({})",
                x_min, x_max
            )));
        }

        let (order, mut knots_vec) = clamped_buffer(num_internal_knots, degree)?;
        knots_vec.extend(std::iter::repeat(x_min).take(order));
        let step = (x_max - x_min) / (num_internal_knots + 1) as f64;
        for i in 1..=num_internal_knots {
            knots_vec.push(x_min + i as f64 * step);
        }
        knots_vec.extend(std::iter::repeat(x_max).take(order));

        log::debug!(
            "uniform knot vector: {} knots on [{}, {}], degree {}",
            knots_vec.len(),
            x_min,
            x_max,
            degree
        );
        Self::new(knots_vec)
    }

    /// Clamped knot vector with interior knots at quantiles of `data`.
    ///
    /// Interior knots are picked among the distinct data values strictly between
    /// the data minimum and maximum, so they never coincide with each other or
    /// with the boundary knots.
    pub fn from_quantiles<S>(
        data: &ArrayBase<S, Ix1>,
        num_internal_knots: usize,
        degree: usize,
    ) -> Result<Self>
    where
        S: Data<Elem = f64>,
    {
        if data.is_empty() {
            return Err(SplineError::InvalidArgument(
                "data points array cannot be empty".to_string(),
            ));
        }
        if data.iter().any(|x| !x.is_finite()) {
            return Err(SplineError::InvalidArgument(
                "data points must be finite".to_string(),
            ));
        }

        let mut unique_sorted = data.to_vec();
        unique_sorted.sort_by(f64::total_cmp);
        unique_sorted.dedup();

        let x_min = unique_sorted[0];
        let x_max = unique_sorted[unique_sorted.len() - 1];
        if x_min == x_max {
            return Err(SplineError::InvalidArgument(format!(
                "all data points are identical ({}), the domain would be empty",
                x_min
            )));
        }

        let candidates = &unique_sorted[1..unique_sorted.len() - 1];
        if candidates.len() < num_internal_knots {
            return Err(SplineError::InvalidArgument(format!(
                "not enough distinct data points strictly between {} and {} to select {} internal knots, found {}",
                x_min,
                x_max,
                num_internal_knots,
                candidates.len()
            )));
        }

        let (order, mut knots_vec) = clamped_buffer(num_internal_knots, degree)?;
        knots_vec.extend(std::iter::repeat(x_min).take(order));
        if num_internal_knots > 0 {
            let last = (candidates.len() - 1) as f64;
            for i in 1..=num_internal_knots {
                let percentile = i as f64 / (num_internal_knots + 1) as f64;
                let index = ((percentile * last).round() as usize).min(candidates.len() - 1);
                knots_vec.push(candidates[index]);
            }
        }
        knots_vec.extend(std::iter::repeat(x_max).take(order));

        log::debug!(
            "quantile knot vector: {} knots from {} distinct data points, degree {}",
            knots_vec.len(),
            unique_sorted.len(),
            degree
        );
        Self::new(knots_vec)
    }

    /// Number of knots.
    pub fn len(&self) -> usize {
        self.knots.len()
    }

    /// Always `false`; a valid knot vector has at least two knots.
    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    /// The knots as an `ndarray` vector.
    pub fn as_array(&self) -> &Array1<f64> {
        &self.knots
    }

    /// The knots as a contiguous slice.
    ///
    /// # Returns
    /// `t_0, ..., t_{m-1}` in storage order. An owned `Array1` is always in
    /// standard layout, so the slice covers every knot.
    pub fn as_slice(&self) -> &[f64] {
        self.knots.as_slice().unwrap_or(&[])
    }

    /// Smallest knot, the left end of the domain.
    pub fn first(&self) -> f64 {
        self.knots[0]
    }

    /// Largest knot, the right end of the domain.
    pub fn last(&self) -> f64 {
        self.knots[self.knots.len() - 1]
    }

    /// `(first, last)`.
    pub fn domain(&self) -> (f64, f64) {
        (self.first(), self.last())
    }

    /// Number of knots exactly equal to `value`.
    pub fn multiplicity(&self, value: f64) -> usize {
        self.knots.iter().filter(|&&k| k == value).count()
    }

    /// `true` if both boundary knots are repeated exactly `degree + 1` times.
    ///
    /// # Arguments
    /// * `degree` - Polynomial degree the knot vector is checked against.
    pub fn is_clamped(&self, degree: usize) -> bool {
        let Some(order) = degree.checked_add(1) else {
            return false;
        };
        match order.checked_mul(2) {
            Some(needed) if self.len() >= needed => {}
            _ => return false,
        }
        self.multiplicity(self.first()) == order && self.multiplicity(self.last()) == order
    }

    /// `true` if no knot value is repeated more than `degree + 1` times.
    pub fn is_regular(&self, degree: usize) -> bool {
        let mut run = 1;
        for i in 1..self.len() {
            if self.knots[i] == self.knots[i - 1] {
                run += 1;
                if run - 1 > degree {
                    return false;
                }
            } else {
                run = 1;
            }
        }
        true
    }

    /// Index `i` of the knot span containing `x`, such that `t_i <= x < t_{i+1}`
    /// and `t_i < t_{i+1}`.
    ///
    /// Points at or beyond the last knot map to the last non-degenerate span,
    /// points at or before the first knot to the first one. `x` must not be NaN.
    pub fn find_span(&self, x: f64) -> usize {
        let t = &self.knots;
        let last = t.len() - 1;
        if x >= t[last] {
            return self.last_span;
        }
        if x <= t[0] {
            return self.first_span;
        }

        // Invariant: t[low] <= x < t[high]
        let mut low = 0;
        let mut high = last;
        while high - low > 1 {
            let mid = (low + high) / 2;
            if x < t[mid] {
                high = mid;
            } else {
                low = mid;
            }
        }
        low
    }

    /// Index of the first non-degenerate span, `t_i < t_{i+1}`.
    pub fn first_span(&self) -> usize {
        self.first_span
    }

    /// Index of the last non-degenerate span. The right end of the domain
    /// belongs to it.
    pub fn last_span(&self) -> usize {
        self.last_span
    }
}

/// Boundary multiplicity `degree + 1` and an empty buffer reserved for a
/// clamped vector with `num_internal_knots` interior knots.
fn clamped_buffer(num_internal_knots: usize, degree: usize) -> Result<(usize, Vec<f64>)> {
    let total = degree
        .checked_add(1)
        .and_then(|order| order.checked_mul(2))
        .and_then(|ends| ends.checked_add(num_internal_knots))
        .ok_or_else(|| {
            SplineError::InvalidArgument(format!(
                "degree {} with {} internal knots overflows the knot count",
                degree, num_internal_knots
            ))
        })?;
    let mut knots_vec = Vec::new();
    knots_vec.try_reserve_exact(total).map_err(|_| {
        SplineError::InvalidArgument(format!("cannot allocate a knot vector of {} knots", total))
    })?;
    Ok((degree + 1, knots_vec))
}

impl std::ops::Index<usize> for KnotVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.knots[index]
    }
}

/// Checks that `knots` carries exactly `num_coefficients + degree + 1` entries.
pub fn validate_knots(knots: &KnotVector, degree: usize, num_coefficients: usize) -> Result<()> {
    let expected = num_coefficients
        .checked_add(degree)
        .and_then(|n| n.checked_add(1))
        .unwrap_or(usize::MAX);
    // Saturated on overflow, which no knot vector can match.
    if expected == usize::MAX || knots.len() != expected {
        return Err(SplineError::DimensionMismatch {
            expected,
            actual: knots.len(),
            degree,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    const TOL: f64 = 1e-9;

    // Helper for float array comparison
    fn assert_knots_eq(a: &KnotVector, b: &[f64]) {
        assert_eq!(a.len(), b.len(), "Knot vector lengths differ.");
        for (i, (val_a, val_b)) in a.as_slice().iter().zip(b.iter()).enumerate() {
            assert!((val_a - val_b).abs() < TOL, "Mismatch at index {}: {} vs {}", i, val_a, val_b);
        }
    }

    #[test]
    fn test_new_accepts_clamped_and_unclamped() {
        assert!(KnotVector::new(vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 4.0]).is_ok());
        assert!(KnotVector::new(vec![0.0, 1.0, 2.0, 3.0]).is_ok());
        // Interior knot repeated beyond degree + 1 is still a valid sequence
        assert!(KnotVector::new(vec![0.0, 1.0, 1.0, 1.0, 1.0, 2.0]).is_ok());
    }

    #[test]
    fn test_new_rejects_decreasing() {
        let err = KnotVector::new(vec![0.0, 0.0, 2.0, 1.0, 3.0]).unwrap_err();
        match err {
            SplineError::InvalidKnotVector(msg) => assert!(msg.contains("t_2=2 > t_3=1")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_new_rejects_non_finite_short_and_flat() {
        assert!(matches!(
            KnotVector::new(vec![0.0, f64::NAN, 1.0]),
            Err(SplineError::InvalidKnotVector(_))
        ));
        assert!(matches!(
            KnotVector::new(vec![0.0, f64::INFINITY]),
            Err(SplineError::InvalidKnotVector(_))
        ));
        assert!(matches!(
            KnotVector::new(vec![1.0]),
            Err(SplineError::InvalidKnotVector(_))
        ));
        assert!(matches!(
            KnotVector::new(vec![2.0, 2.0, 2.0]),
            Err(SplineError::InvalidKnotVector(_))
        ));
    }

    #[test]
    fn test_multiplicity_clamped_regular() {
        let knots = KnotVector::new(vec![0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 2.0]).unwrap();
        assert_eq!(knots.multiplicity(0.0), 3);
        assert_eq!(knots.multiplicity(1.0), 2);
        assert_eq!(knots.multiplicity(0.5), 0);
        assert!(knots.is_clamped(2));
        assert!(!knots.is_clamped(1));
        assert!(!knots.is_clamped(3));
        assert!(knots.is_regular(2));
        assert!(!knots.is_regular(1));

        let open = KnotVector::new(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert!(!open.is_clamped(1));
        assert!(open.is_regular(0));
    }

    #[test]
    fn test_find_span() {
        // Degree 1 example: spans [0,1), [1,2), [2,3), [3,4]
        let knots = KnotVector::new(vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 4.0]).unwrap();
        assert_eq!(knots.find_span(0.0), 1);
        assert_eq!(knots.find_span(0.5), 1);
        assert_eq!(knots.find_span(1.0), 2);
        assert_eq!(knots.find_span(2.999), 3);
        assert_eq!(knots.find_span(3.0), 4);
        assert_eq!(knots.find_span(4.0), 4);
        // Outside the domain maps to the boundary spans
        assert_eq!(knots.find_span(-1.0), 1);
        assert_eq!(knots.find_span(10.0), 4);

        // Repeated interior knot: span always non-degenerate
        let knots = KnotVector::new(vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]).unwrap();
        assert_eq!(knots.find_span(1.0), 3);
        assert_eq!(knots.find_span(0.99), 1);
        assert_eq!(knots.find_span(2.0), 3);
    }

    #[test]
    fn test_spans_and_slice_access() {
        let knots = KnotVector::new(vec![0.0, 0.0, 0.0, 1.0, 2.0, 2.0, 2.0]).unwrap();
        assert_eq!(knots.first_span(), 2);
        assert_eq!(knots.last_span(), 3);
        assert_eq!(knots.find_span(knots.last()), knots.last_span());
        assert_eq!(knots.find_span(-5.0), knots.first_span());
        assert_eq!(knots.as_slice(), &[0.0, 0.0, 0.0, 1.0, 2.0, 2.0, 2.0]);
        assert_eq!(knots.as_slice().len(), knots.len());
        assert!(!knots.is_empty());

        // Spans are derived from the knots, so equality still follows the knots
        let same = KnotVector::new(knots.as_slice().to_vec()).unwrap();
        assert_eq!(same, knots);
    }

    #[test]
    fn test_huge_degree_queries_do_not_overflow() {
        let knots = KnotVector::new(vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        assert!(!knots.is_clamped(usize::MAX));
        assert!(!knots.is_clamped(usize::MAX / 2));
        assert!(knots.is_regular(usize::MAX));
    }

    #[test]
    fn test_validate_knots_huge_degree() {
        let knots = KnotVector::new(vec![0.0, 1.0]).unwrap();
        assert!(matches!(
            validate_knots(&knots, usize::MAX, 1),
            Err(SplineError::DimensionMismatch { actual: 2, .. })
        ));
        assert!(matches!(
            validate_knots(&knots, 0, usize::MAX),
            Err(SplineError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_knots_length() {
        let knots = KnotVector::new(vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 4.0]).unwrap();
        assert!(validate_knots(&knots, 1, 5).is_ok());
        assert_eq!(
            validate_knots(&knots, 1, 4),
            Err(SplineError::DimensionMismatch {
                expected: 6,
                actual: 7,
                degree: 1
            })
        );
        assert!(validate_knots(&knots, 2, 5).is_err());
    }

    #[test]
    fn test_quantile_knots_no_internal() {
        let data = arr1(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let knots = KnotVector::from_quantiles(&data, 0, 2).unwrap();
        assert_knots_eq(&knots, &[1.0, 1.0, 1.0, 5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_quantile_knots_one_internal() {
        // Candidates strictly inside (1, 10): 2, 3, 4. Median index (0.5 * 2).round() = 1.
        let data = arr1(&[1.0, 2.0, 3.0, 4.0, 10.0]);
        let knots = KnotVector::from_quantiles(&data, 1, 1).unwrap();
        assert_knots_eq(&knots, &[1.0, 1.0, 3.0, 10.0, 10.0]);

        // Candidates 2, 3, 4, 5. Index (0.5 * 3).round() = 2.
        let data_even = arr1(&[1.0, 2.0, 3.0, 4.0, 5.0, 10.0]);
        let knots_even = KnotVector::from_quantiles(&data_even, 1, 1).unwrap();
        assert_knots_eq(&knots_even, &[1.0, 1.0, 4.0, 10.0, 10.0]);
    }

    #[test]
    fn test_quantile_knots_two_internal() {
        // Candidates 2..=9 (8 values): indices round(7/3)=2 and round(14/3)=5.
        let data = Array1::<f64>::range(1.0, 10.1, 1.0);
        let knots = KnotVector::from_quantiles(&data, 2, 2).unwrap();
        assert_knots_eq(&knots, &[1.0, 1.0, 1.0, 4.0, 7.0, 10.0, 10.0, 10.0]);
        assert!(knots.is_clamped(2));
    }

    #[test]
    fn test_quantile_knots_duplicates_and_sorting() {
        let data = arr1(&[5.0, 1.0, 2.0, 2.0, 3.0, 4.0, 4.0, 4.0, 10.0]);
        let knots = KnotVector::from_quantiles(&data, 1, 1).unwrap();
        assert_knots_eq(&knots, &[1.0, 1.0, 4.0, 10.0, 10.0]);
    }

    #[test]
    fn test_quantile_knots_errors() {
        let empty = Array1::<f64>::zeros(0);
        assert!(matches!(
            KnotVector::from_quantiles(&empty, 1, 2),
            Err(SplineError::InvalidArgument(_))
        ));

        // No candidates between min and max
        let data = arr1(&[1.0, 1.0, 1.0, 10.0, 10.0]);
        assert!(KnotVector::from_quantiles(&data, 1, 1).is_err());

        // One candidate, two requested
        let data2 = arr1(&[1.0, 2.0, 10.0]);
        assert!(KnotVector::from_quantiles(&data2, 2, 1).is_err());

        // All points identical, even without internal knots
        let data3 = arr1(&[5.0, 5.0, 5.0]);
        assert!(KnotVector::from_quantiles(&data3, 1, 1).is_err());
        assert!(KnotVector::from_quantiles(&data3, 0, 2).is_err());

        let data4 = arr1(&[0.0, f64::NAN, 1.0]);
        assert!(KnotVector::from_quantiles(&data4, 0, 1).is_err());

        let data5 = arr1(&[1.0, 2.0, 3.0, 10.0]);
        assert!(matches!(
            KnotVector::from_quantiles(&data5, 1, usize::MAX),
            Err(SplineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_uniform_knots() {
        let knots = KnotVector::uniform(1.0, 5.0, 0, 2).unwrap();
        assert_knots_eq(&knots, &[1.0, 1.0, 1.0, 5.0, 5.0, 5.0]);

        // The knot vector of the degree-1 demonstration spline
        let knots = KnotVector::uniform(0.0, 4.0, 3, 1).unwrap();
        assert_knots_eq(&knots, &[0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 4.0]);
        assert!(knots.is_clamped(1));
        assert!(knots.is_regular(1));

        let knots = KnotVector::uniform(-1.0, 1.0, 1, 0).unwrap();
        assert_knots_eq(&knots, &[-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_uniform_knots_errors() {
        assert!(KnotVector::uniform(5.0, 5.0, 0, 2).is_err());
        assert!(KnotVector::uniform(5.0, 5.0, 1, 2).is_err());
        assert!(KnotVector::uniform(5.0, 1.0, 1, 2).is_err());
        assert!(KnotVector::uniform(f64::NEG_INFINITY, 1.0, 1, 2).is_err());

        // Knot counts that overflow or cannot be allocated
        for (num_internal, degree) in [
            (0, usize::MAX),
            (1, usize::MAX / 2),
            (usize::MAX, 0),
            (usize::MAX / 4, 1),
        ] {
            assert!(
                matches!(
                    KnotVector::uniform(0.0, 1.0, num_internal, degree),
                    Err(SplineError::InvalidArgument(_))
                ),
                "({}, {}) should be rejected",
                num_internal,
                degree
            );
        }
    }
}
