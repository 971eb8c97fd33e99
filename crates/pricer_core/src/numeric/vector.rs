//! Vectorised Monte Carlo value: one double per simulation path, or a single
//! deterministic double.
//!
//! [`VectorNumeric`] is immutable and differentiation-unaware. Realisations are
//! stored behind an `Arc<[f64]>`, so cloning a value (which the AD tape does
//! for every recorded node) never copies path data.
//!
//! # Broadcasting
//!
//! Binary and ternary operations broadcast a deterministic operand against a
//! per-path operand. Two per-path operands must have the same number of paths;
//! mixing lengths is a programming error and panics.
//!
//! # Examples
//!
//! ```rust
//! use pricer_core::numeric::{RandomVariable, VectorNumeric};
//!
//! let x = VectorNumeric::from_paths(vec![1.0, 2.0, 3.0]).unwrap();
//! let y = VectorNumeric::scalar(2.0);
//!
//! let z = x.mult(&y).add_scalar(1.0);
//! assert_eq!(z.to_vec(), vec![3.0, 5.0, 7.0]);
//! assert_eq!(z.average_value(), 5.0);
//! ```

use std::sync::Arc;

use super::error::NumericError;
use super::traits::RandomVariable;

/// Storage for the realisations of a [`VectorNumeric`].
#[derive(Clone, Debug, PartialEq)]
enum Realisations {
    /// Deterministic value, identical on every path.
    Scalar(f64),
    /// One value per simulation path (never empty).
    Paths(Arc<[f64]>),
}

/// Immutable vectorised numeric value.
///
/// Either deterministic (a single `f64` shared by all paths) or stochastic
/// (one `f64` per path). Equal inputs always produce bit-identical outputs.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorNumeric {
    realisations: Realisations,
}

impl VectorNumeric {
    /// Creates a deterministic value.
    #[inline]
    pub fn scalar(value: f64) -> Self {
        Self {
            realisations: Realisations::Scalar(value),
        }
    }

    /// Creates a per-path value from its realisations.
    ///
    /// # Errors
    ///
    /// Returns [`NumericError::EmptyRealisations`] if `values` is empty.
    pub fn from_paths(values: Vec<f64>) -> Result<Self, NumericError> {
        if values.is_empty() {
            return Err(NumericError::EmptyRealisations);
        }
        Ok(Self {
            realisations: Realisations::Paths(values.into()),
        })
    }

    /// Creates a per-path value with the same realisation on every path.
    ///
    /// A path count of zero yields a deterministic value.
    pub fn filled(value: f64, n_paths: usize) -> Self {
        if n_paths == 0 {
            return Self::scalar(value);
        }
        Self {
            realisations: Realisations::Paths(vec![value; n_paths].into()),
        }
    }

    /// Returns a value of the same shape with every realisation set to `value`.
    pub fn filled_like(&self, value: f64) -> Self {
        match &self.realisations {
            Realisations::Scalar(_) => Self::scalar(value),
            Realisations::Paths(paths) => Self::filled(value, paths.len()),
        }
    }

    /// Returns ones shaped like `self`.
    #[inline]
    pub fn ones_like(&self) -> Self {
        self.filled_like(1.0)
    }

    /// Returns zeros shaped like `self`.
    #[inline]
    pub fn zeros_like(&self) -> Self {
        self.filled_like(0.0)
    }

    /// Whether the value is the same on every path.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        matches!(self.realisations, Realisations::Scalar(_))
    }

    /// Number of realisations (1 for deterministic values).
    #[inline]
    pub fn size(&self) -> usize {
        match &self.realisations {
            Realisations::Scalar(_) => 1,
            Realisations::Paths(paths) => paths.len(),
        }
    }

    /// Realisation on `path`. Deterministic values broadcast to every path.
    ///
    /// # Panics
    ///
    /// Panics if `path` is out of range for a per-path value.
    #[inline]
    pub fn get(&self, path: usize) -> f64 {
        match &self.realisations {
            Realisations::Scalar(value) => *value,
            Realisations::Paths(paths) => paths[path],
        }
    }

    /// The deterministic value, if there is one.
    #[inline]
    pub fn as_scalar(&self) -> Option<f64> {
        match &self.realisations {
            Realisations::Scalar(value) => Some(*value),
            Realisations::Paths(_) => None,
        }
    }

    /// Realisations as a slice (a single element for deterministic values).
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        match &self.realisations {
            Realisations::Scalar(value) => std::slice::from_ref(value),
            Realisations::Paths(paths) => paths,
        }
    }

    /// Copies the realisations into a vector.
    pub fn to_vec(&self) -> Vec<f64> {
        self.as_slice().to_vec()
    }

    /// Sum of the realisations.
    pub fn sum(&self) -> f64 {
        self.as_slice().iter().sum()
    }

    /// Applies `f` to every realisation.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        match &self.realisations {
            Realisations::Scalar(value) => Self::scalar(f(*value)),
            Realisations::Paths(paths) => Self::from_iter_paths(paths.iter().map(|&x| f(x))),
        }
    }

    /// Combines two values realisation by realisation, broadcasting
    /// deterministic operands.
    ///
    /// # Panics
    ///
    /// Panics if both operands are per-path with different path counts.
    pub fn zip_map<F>(&self, other: &Self, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64,
    {
        match (&self.realisations, &other.realisations) {
            (Realisations::Scalar(x), Realisations::Scalar(y)) => Self::scalar(f(*x, *y)),
            (Realisations::Scalar(x), Realisations::Paths(ys)) => {
                Self::from_iter_paths(ys.iter().map(|&y| f(*x, y)))
            }
            (Realisations::Paths(xs), Realisations::Scalar(y)) => {
                Self::from_iter_paths(xs.iter().map(|&x| f(x, *y)))
            }
            (Realisations::Paths(xs), Realisations::Paths(ys)) => {
                assert_same_paths(xs.len(), ys.len());
                Self::from_iter_paths(xs.iter().zip(ys.iter()).map(|(&x, &y)| f(x, y)))
            }
        }
    }

    /// Combines three values realisation by realisation, broadcasting
    /// deterministic operands.
    ///
    /// # Panics
    ///
    /// Panics if two per-path operands have different path counts.
    pub fn zip3_map<F>(&self, second: &Self, third: &Self, f: F) -> Self
    where
        F: Fn(f64, f64, f64) -> f64,
    {
        match common_paths(&[self, second, third]) {
            None => Self::scalar(f(self.get(0), second.get(0), third.get(0))),
            Some(n_paths) => Self::from_iter_paths(
                (0..n_paths).map(|i| f(self.get(i), second.get(i), third.get(i))),
            ),
        }
    }

    /// Arithmetic mean over paths.
    pub fn mean(&self) -> f64 {
        match &self.realisations {
            Realisations::Scalar(value) => *value,
            Realisations::Paths(paths) => paths.iter().sum::<f64>() / paths.len() as f64,
        }
    }

    /// Sum of squared deviations from the mean.
    fn sum_squared_deviations(&self) -> f64 {
        let mean = self.mean();
        self.as_slice()
            .iter()
            .map(|&x| (x - mean) * (x - mean))
            .sum()
    }

    fn from_iter_paths<I>(iter: I) -> Self
    where
        I: Iterator<Item = f64>,
    {
        Self {
            realisations: Realisations::Paths(iter.collect()),
        }
    }
}

impl From<f64> for VectorNumeric {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

impl TryFrom<Vec<f64>> for VectorNumeric {
    type Error = NumericError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_paths(values)
    }
}

#[inline]
fn assert_same_paths(left: usize, right: usize) {
    assert!(
        left == right,
        "path count mismatch: {} paths combined with {} paths",
        left,
        right
    );
}

/// Common path count of the per-path operands, `None` if all are deterministic.
fn common_paths(values: &[&VectorNumeric]) -> Option<usize> {
    let mut n_paths: Option<usize> = None;
    for value in values.iter().filter(|v| !v.is_deterministic()) {
        match n_paths {
            None => n_paths = Some(value.size()),
            Some(n) => assert_same_paths(n, value.size()),
        }
    }
    n_paths
}

impl RandomVariable for VectorNumeric {
    #[inline]
    fn constant_like(&self, value: f64) -> Self {
        Self::scalar(value)
    }

    #[inline]
    fn is_deterministic(&self) -> bool {
        VectorNumeric::is_deterministic(self)
    }

    #[inline]
    fn size(&self) -> usize {
        VectorNumeric::size(self)
    }

    #[inline]
    fn realisation(&self, path: usize) -> f64 {
        self.get(path)
    }

    fn add(&self, other: &Self) -> Self {
        self.zip_map(other, |x, y| x + y)
    }

    fn sub(&self, other: &Self) -> Self {
        self.zip_map(other, |x, y| x - y)
    }

    fn mult(&self, other: &Self) -> Self {
        self.zip_map(other, |x, y| x * y)
    }

    fn div(&self, other: &Self) -> Self {
        self.zip_map(other, |x, y| x / y)
    }

    fn pow(&self, exponent: &Self) -> Self {
        self.zip_map(exponent, f64::powf)
    }

    fn cap(&self, cap: &Self) -> Self {
        self.zip_map(cap, |x, y| if x > y { y } else { x })
    }

    fn floor(&self, floor: &Self) -> Self {
        self.zip_map(floor, |x, y| if x > y { x } else { y })
    }

    fn squared(&self) -> Self {
        self.map(|x| x * x)
    }

    fn sqrt(&self) -> Self {
        self.map(f64::sqrt)
    }

    fn exp(&self) -> Self {
        self.map(f64::exp)
    }

    fn log(&self) -> Self {
        self.map(f64::ln)
    }

    fn sin(&self) -> Self {
        self.map(f64::sin)
    }

    fn cos(&self) -> Self {
        self.map(f64::cos)
    }

    fn invert(&self) -> Self {
        self.map(|x| 1.0 / x)
    }

    fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    fn add_product(&self, factor1: &Self, factor2: &Self) -> Self {
        self.zip3_map(factor1, factor2, |x, y, z| x + y * z)
    }

    fn add_ratio(&self, numerator: &Self, denominator: &Self) -> Self {
        self.zip3_map(numerator, denominator, |x, y, z| x + y / z)
    }

    fn sub_ratio(&self, numerator: &Self, denominator: &Self) -> Self {
        self.zip3_map(numerator, denominator, |x, y, z| x - y / z)
    }

    fn accrue(&self, rate: &Self, period_length: &Self) -> Self {
        self.zip3_map(rate, period_length, |x, y, z| x * (1.0 + y * z))
    }

    fn discount(&self, rate: &Self, period_length: &Self) -> Self {
        self.zip3_map(rate, period_length, |x, y, z| x / (1.0 + y * z))
    }

    fn barrier(&self, if_non_negative: &Self, if_negative: &Self) -> Self {
        self.zip3_map(if_non_negative, if_negative, |trigger, above, below| {
            if trigger >= 0.0 {
                above
            } else {
                below
            }
        })
    }

    fn average(&self) -> Self {
        Self::scalar(self.mean())
    }

    fn variance(&self) -> Self {
        Self::scalar(self.sum_squared_deviations() / self.size() as f64)
    }

    fn standard_deviation(&self) -> Self {
        self.variance().sqrt()
    }

    fn standard_error(&self) -> Self {
        let n = self.size() as f64;
        self.variance().map(|variance| (variance / n).sqrt())
    }

    fn sample_variance(&self) -> Self {
        let n = self.size();
        if n < 2 {
            return Self::scalar(0.0);
        }
        Self::scalar(self.sum_squared_deviations() / (n - 1) as f64)
    }

    fn min(&self) -> Self {
        Self::scalar(self.as_slice().iter().copied().fold(f64::INFINITY, f64::min))
    }

    fn max(&self) -> Self {
        Self::scalar(
            self.as_slice()
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max),
        )
    }

    fn apply<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        self.map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn paths(values: &[f64]) -> VectorNumeric {
        VectorNumeric::from_paths(values.to_vec()).unwrap()
    }

    #[test]
    fn test_empty_paths_rejected() {
        assert_eq!(
            VectorNumeric::from_paths(Vec::new()),
            Err(NumericError::EmptyRealisations)
        );
    }

    #[test]
    fn test_scalar_broadcasts_to_every_path() {
        let s = VectorNumeric::scalar(4.0);
        assert!(s.is_deterministic());
        assert_eq!(s.size(), 1);
        assert_eq!(s.get(0), 4.0);
        assert_eq!(s.get(17), 4.0);
        assert_eq!(s.as_scalar(), Some(4.0));
    }

    #[test]
    fn test_filled_zero_paths_is_scalar() {
        assert!(VectorNumeric::filled(1.0, 0).is_deterministic());
        assert_eq!(VectorNumeric::filled(2.0, 3).to_vec(), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_ones_like_keeps_shape() {
        assert_eq!(paths(&[5.0, 6.0]).ones_like().to_vec(), vec![1.0, 1.0]);
        assert!(VectorNumeric::scalar(5.0).zeros_like().is_deterministic());
    }

    #[test]
    fn test_scalar_vector_broadcasting() {
        let x = paths(&[1.0, 2.0, 3.0]);
        let y = VectorNumeric::scalar(10.0);
        assert_eq!(x.add(&y).to_vec(), vec![11.0, 12.0, 13.0]);
        assert_eq!(y.sub(&x).to_vec(), vec![9.0, 8.0, 7.0]);
        assert!(y.mult(&y).is_deterministic());
    }

    #[test]
    #[should_panic(expected = "path count mismatch")]
    fn test_mismatched_path_counts_panic() {
        let _ = paths(&[1.0, 2.0]).add(&paths(&[1.0, 2.0, 3.0]));
    }

    #[test]
    #[should_panic(expected = "path count mismatch")]
    fn test_mismatched_path_counts_panic_ternary() {
        let _ = paths(&[1.0, 2.0]).accrue(&VectorNumeric::scalar(0.1), &paths(&[1.0]));
    }

    #[test]
    fn test_cap_and_floor() {
        let x = paths(&[1.0, 5.0, 3.0]);
        let k = VectorNumeric::scalar(3.0);
        assert_eq!(x.cap(&k).to_vec(), vec![1.0, 3.0, 3.0]);
        assert_eq!(x.floor(&k).to_vec(), vec![3.0, 5.0, 3.0]);
    }

    #[test]
    fn test_ternary_financial_operators() {
        let x = VectorNumeric::scalar(100.0);
        let r = VectorNumeric::scalar(0.05);
        let t = VectorNumeric::scalar(0.5);
        assert_relative_eq!(x.accrue(&r, &t).get(0), 102.5, epsilon = 1e-12);
        assert_relative_eq!(x.discount(&r, &t).get(0), 100.0 / 1.025, epsilon = 1e-12);
        assert_relative_eq!(x.add_product(&r, &t).get(0), 100.025, epsilon = 1e-12);
        assert_relative_eq!(x.add_ratio(&r, &t).get(0), 100.1, epsilon = 1e-12);
        assert_relative_eq!(x.sub_ratio(&r, &t).get(0), 99.9, epsilon = 1e-12);
    }

    #[test]
    fn test_barrier_selects_on_trigger_sign() {
        let trigger = paths(&[-1.0, 0.0, 2.0]);
        let above = VectorNumeric::scalar(10.0);
        let below = paths(&[-5.0, -6.0, -7.0]);
        assert_eq!(trigger.barrier(&above, &below).to_vec(), vec![-5.0, 10.0, 10.0]);
    }

    #[test]
    fn test_reductions() {
        let x = paths(&[1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(x.average_value(), 2.5);
        assert_relative_eq!(x.variance_value(), 1.25);
        assert_relative_eq!(x.standard_deviation_value(), 1.25_f64.sqrt());
        assert_relative_eq!(x.standard_error_value(), (1.25_f64 / 4.0).sqrt());
        assert_relative_eq!(x.sample_variance_value(), 5.0 / 3.0);
        assert_eq!(x.min_value(), 1.0);
        assert_eq!(x.max_value(), 4.0);
        assert!(x.average().is_deterministic());
    }

    #[test]
    fn test_reductions_of_deterministic_value() {
        let s = VectorNumeric::scalar(3.0);
        assert_eq!(s.average_value(), 3.0);
        assert_eq!(s.variance_value(), 0.0);
        assert_eq!(s.sample_variance_value(), 0.0);
        assert_eq!(s.min_value(), 3.0);
    }

    #[test]
    fn test_numeric_edge_cases_follow_ieee() {
        let x = paths(&[0.0, -1.0]);
        let inv = x.invert();
        assert!(inv.get(0).is_infinite());
        assert!(x.log().get(1).is_nan());
        assert!(x.sqrt().get(1).is_nan());
    }

    #[test]
    fn test_apply_is_elementwise() {
        let x = paths(&[1.0, 4.0]);
        assert_eq!(x.apply(|v| v * 10.0).to_vec(), vec![10.0, 40.0]);
    }

    #[test]
    fn test_clone_shares_realisations() {
        let x = paths(&[1.0, 2.0]);
        let y = x.clone();
        assert_eq!(x.as_slice().as_ptr(), y.as_slice().as_ptr());
    }
}
