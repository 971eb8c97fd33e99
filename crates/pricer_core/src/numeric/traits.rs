//! The operator surface shared by plain and differentiable values.

/// Operator surface of a vectorised Monte Carlo value.
///
/// Model and payoff code written against `RandomVariable` runs unchanged on
/// plain [`VectorNumeric`](super::VectorNumeric) values and on differentiable
/// values recorded on an AD tape.
///
/// # Operand conventions
///
/// - Binary operators take the other operand by reference: `x.cap(&y)` is
///   `min(x, y)`, `x.floor(&y)` is `max(x, y)`.
/// - Ternary operators treat `self` as the first argument:
///   `x.accrue(&rate, &period)` is `x * (1 + rate * period)` and
///   `trigger.barrier(&a, &b)` selects `a` where `trigger >= 0`, else `b`.
/// - Reductions (`average`, `variance`, ...) return deterministic values; the
///   `*_value` projections return them as plain numbers.
///
/// # Examples
///
/// ```rust
/// use pricer_core::numeric::{RandomVariable, VectorNumeric};
///
/// fn call_payoff<R: RandomVariable>(spot: &R, strike: f64) -> R {
///     spot.sub_scalar(strike).floor_scalar(0.0)
/// }
///
/// let spot = VectorNumeric::from_paths(vec![90.0, 100.0, 110.0]).unwrap();
/// assert_eq!(call_payoff(&spot, 100.0).to_vec(), vec![0.0, 0.0, 10.0]);
/// ```
pub trait RandomVariable: Clone + Sized {
    /// Creates a deterministic value compatible with `self`.
    fn constant_like(&self, value: f64) -> Self;

    /// Whether the value is the same on every path.
    fn is_deterministic(&self) -> bool;

    /// Number of realisations (1 for deterministic values).
    fn size(&self) -> usize;

    /// Realisation on `path`; deterministic values broadcast.
    fn realisation(&self, path: usize) -> f64;

    /// `self + other`
    fn add(&self, other: &Self) -> Self;

    /// `self - other`
    fn sub(&self, other: &Self) -> Self;

    /// `self * other`
    fn mult(&self, other: &Self) -> Self;

    /// `self / other`
    fn div(&self, other: &Self) -> Self;

    /// `self ^ exponent`
    fn pow(&self, exponent: &Self) -> Self;

    /// `min(self, cap)`
    fn cap(&self, cap: &Self) -> Self;

    /// `max(self, floor)`
    fn floor(&self, floor: &Self) -> Self;

    /// `self * self`
    fn squared(&self) -> Self;

    /// Square root.
    fn sqrt(&self) -> Self;

    /// Exponential.
    fn exp(&self) -> Self;

    /// Natural logarithm.
    fn log(&self) -> Self;

    /// Sine.
    fn sin(&self) -> Self;

    /// Cosine.
    fn cos(&self) -> Self;

    /// `1 / self`
    fn invert(&self) -> Self;

    /// Absolute value.
    fn abs(&self) -> Self;

    /// `self + factor1 * factor2`
    fn add_product(&self, factor1: &Self, factor2: &Self) -> Self;

    /// `self + numerator / denominator`
    fn add_ratio(&self, numerator: &Self, denominator: &Self) -> Self;

    /// `self - numerator / denominator`
    fn sub_ratio(&self, numerator: &Self, denominator: &Self) -> Self;

    /// `self * (1 + rate * period_length)`
    fn accrue(&self, rate: &Self, period_length: &Self) -> Self;

    /// `self / (1 + rate * period_length)`
    fn discount(&self, rate: &Self, period_length: &Self) -> Self;

    /// `if_non_negative` where `self >= 0`, otherwise `if_negative`.
    fn barrier(&self, if_non_negative: &Self, if_negative: &Self) -> Self;

    /// Mean over paths.
    fn average(&self) -> Self;

    /// Population variance over paths.
    fn variance(&self) -> Self;

    /// Population standard deviation over paths.
    fn standard_deviation(&self) -> Self;

    /// Standard error of the mean, `sqrt(variance / N)`.
    fn standard_error(&self) -> Self;

    /// Sample variance over paths (`N - 1` denominator).
    fn sample_variance(&self) -> Self;

    /// Minimum over paths.
    fn min(&self) -> Self;

    /// Maximum over paths.
    fn max(&self) -> Self;

    /// Applies an arbitrary function to every realisation.
    ///
    /// Implementations that cannot see through `f` (an AD tape cannot
    /// differentiate an opaque closure) reject the call.
    fn apply<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64;

    // -------------------------------------------------------------------------
    // Scalar operands
    // -------------------------------------------------------------------------

    /// `self + value`
    fn add_scalar(&self, value: f64) -> Self {
        self.add(&self.constant_like(value))
    }

    /// `self - value`
    fn sub_scalar(&self, value: f64) -> Self {
        self.sub(&self.constant_like(value))
    }

    /// `self * value`
    fn mult_scalar(&self, value: f64) -> Self {
        self.mult(&self.constant_like(value))
    }

    /// `self / value`
    fn div_scalar(&self, value: f64) -> Self {
        self.div(&self.constant_like(value))
    }

    /// `self ^ exponent`
    fn pow_scalar(&self, exponent: f64) -> Self {
        self.pow(&self.constant_like(exponent))
    }

    /// `min(self, cap)`
    fn cap_scalar(&self, cap: f64) -> Self {
        self.cap(&self.constant_like(cap))
    }

    /// `max(self, floor)`
    fn floor_scalar(&self, floor: f64) -> Self {
        self.floor(&self.constant_like(floor))
    }

    /// `self * (1 + rate * period_length)` with a fixed period length.
    fn accrue_scalar(&self, rate: &Self, period_length: f64) -> Self {
        self.accrue(rate, &self.constant_like(period_length))
    }

    /// `self / (1 + rate * period_length)` with a fixed period length.
    fn discount_scalar(&self, rate: &Self, period_length: f64) -> Self {
        self.discount(rate, &self.constant_like(period_length))
    }

    // -------------------------------------------------------------------------
    // Plain-number projections of the reductions
    // -------------------------------------------------------------------------

    /// Mean over paths as a plain number.
    fn average_value(&self) -> f64 {
        self.average().realisation(0)
    }

    /// Population variance as a plain number.
    fn variance_value(&self) -> f64 {
        self.variance().realisation(0)
    }

    /// Population standard deviation as a plain number.
    fn standard_deviation_value(&self) -> f64 {
        self.standard_deviation().realisation(0)
    }

    /// Standard error of the mean as a plain number.
    fn standard_error_value(&self) -> f64 {
        self.standard_error().realisation(0)
    }

    /// Sample variance as a plain number.
    fn sample_variance_value(&self) -> f64 {
        self.sample_variance().realisation(0)
    }

    /// Minimum over paths as a plain number.
    fn min_value(&self) -> f64 {
        self.min().realisation(0)
    }

    /// Maximum over paths as a plain number.
    fn max_value(&self) -> f64 {
        self.max().realisation(0)
    }
}
