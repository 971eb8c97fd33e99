//! Differentiable Monte Carlo values.
//!
//! A [`DifferentiableValue`] is a handle to one node of a [`Tape`] together
//! with the node's forward value. Every operation records a new node on the
//! owning tape; scalar operands become constant leaves on that same tape.
//!
//! It implements [`RandomVariable`], so model and payoff code written against
//! that trait is differentiated without modification.
//!
//! # Examples
//!
//! ```rust
//! use pricer_aad::Tape;
//! use pricer_core::numeric::RandomVariable;
//!
//! let tape = Tape::new();
//! let x = tape.variable(3.0);
//! let y = tape.variable(4.0);
//!
//! let f = &x * &y + x.sin();
//! let grad = f.gradient();
//!
//! assert_eq!(grad.expectation(&y), 3.0);
//! assert!((grad.expectation(&x) - (4.0 + 3.0_f64.cos())).abs() < 1e-15);
//! ```

mod ops;

use std::fmt;

use pricer_core::numeric::{RandomVariable, VectorNumeric};

use crate::error::{fatal, AadError, AadResult};
use crate::gradient::Gradient;
use crate::operator::OperatorKind;
use crate::reverse::SweepOptions;
use crate::tape::{NodeId, Tape};

/// Value recorded on a [`Tape`].
///
/// # Panics
///
/// Combining values from two different tapes, or using a value after its
/// tape was [`reset`](Tape::reset), panics: either would silently produce a
/// wrong gradient.
#[derive(Clone)]
pub struct DifferentiableValue {
    tape: Tape,
    id: NodeId,
    value: VectorNumeric,
    constant: bool,
}

impl DifferentiableValue {
    pub(crate) fn from_parts(tape: Tape, id: NodeId, value: VectorNumeric, constant: bool) -> Self {
        Self {
            tape,
            id,
            value,
            constant,
        }
    }

    /// Forward value.
    #[inline]
    pub fn value(&self) -> &VectorNumeric {
        &self.value
    }

    /// Forward value as a plain number, if deterministic.
    #[inline]
    pub fn value_as_scalar(&self) -> Option<f64> {
        self.value.as_scalar()
    }

    /// Node on the owning tape.
    #[inline]
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    /// Owning tape.
    #[inline]
    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Whether this value is a constant leaf.
    #[inline]
    pub fn is_constant(&self) -> bool {
        self.constant
    }

    /// Gradient of this value with respect to every variable it depends on.
    ///
    /// # Panics
    ///
    /// Panics if the tape was reset since this value was recorded.
    pub fn gradient(&self) -> Gradient {
        self.try_gradient().unwrap_or_else(|err| fatal(err))
    }

    /// Gradient of this value with respect to every variable it depends on.
    pub fn try_gradient(&self) -> AadResult<Gradient> {
        self.tape.gradient(self.id, &SweepOptions::default())
    }

    /// Gradient restricted to `variables`.
    ///
    /// Only the parts of the graph that connect this value to one of
    /// `variables` are swept.
    ///
    /// # Panics
    ///
    /// Panics if a variable lives on another tape or is not a leaf.
    pub fn gradient_wrt(&self, variables: &[&DifferentiableValue]) -> Gradient {
        let targets = variables
            .iter()
            .map(|variable| {
                self.check_same_tape(variable)?;
                Ok(variable.id)
            })
            .collect::<AadResult<Vec<_>>>()
            .unwrap_or_else(|err| fatal(err));
        self.try_gradient_with(&SweepOptions::default().restricted_to(targets))
            .unwrap_or_else(|err| fatal(err))
    }

    /// Gradient under explicit sweep options.
    pub fn try_gradient_with(&self, options: &SweepOptions) -> AadResult<Gradient> {
        self.tape.gradient(self.id, options)
    }

    fn check_same_tape(&self, other: &DifferentiableValue) -> AadResult<()> {
        if self.tape.same_tape(&other.tape) {
            Ok(())
        } else {
            Err(AadError::ForeignTape {
                expected: self.tape.id(),
                found: other.tape.id(),
            })
        }
    }

    fn record(&self, kind: OperatorKind, operands: &[&DifferentiableValue]) -> Self {
        self.try_record(kind, operands)
            .unwrap_or_else(|err| fatal(err))
    }

    fn try_record(&self, kind: OperatorKind, operands: &[&DifferentiableValue]) -> AadResult<Self> {
        let mut arguments = Vec::with_capacity(operands.len() + 1);
        arguments.push(self.id);
        for operand in operands {
            self.check_same_tape(operand)?;
            arguments.push(operand.id);
        }
        let (id, value) = self.tape.push_operation(kind, &arguments)?;
        Ok(Self::from_parts(self.tape.clone(), id, value, false))
    }
}

impl RandomVariable for DifferentiableValue {
    fn constant_like(&self, value: f64) -> Self {
        self.tape.constant(VectorNumeric::scalar(value))
    }

    fn is_deterministic(&self) -> bool {
        self.value.is_deterministic()
    }

    fn size(&self) -> usize {
        self.value.size()
    }

    fn realisation(&self, path: usize) -> f64 {
        self.value.get(path)
    }

    fn add(&self, other: &Self) -> Self {
        self.record(OperatorKind::Add, &[other])
    }

    fn sub(&self, other: &Self) -> Self {
        self.record(OperatorKind::Sub, &[other])
    }

    fn mult(&self, other: &Self) -> Self {
        self.record(OperatorKind::Mult, &[other])
    }

    fn div(&self, other: &Self) -> Self {
        self.record(OperatorKind::Div, &[other])
    }

    fn pow(&self, exponent: &Self) -> Self {
        self.record(OperatorKind::Pow, &[exponent])
    }

    fn cap(&self, cap: &Self) -> Self {
        self.record(OperatorKind::Cap, &[cap])
    }

    fn floor(&self, floor: &Self) -> Self {
        self.record(OperatorKind::Floor, &[floor])
    }

    fn squared(&self) -> Self {
        self.record(OperatorKind::Squared, &[])
    }

    fn sqrt(&self) -> Self {
        self.record(OperatorKind::Sqrt, &[])
    }

    fn exp(&self) -> Self {
        self.record(OperatorKind::Exp, &[])
    }

    fn log(&self) -> Self {
        self.record(OperatorKind::Log, &[])
    }

    fn sin(&self) -> Self {
        self.record(OperatorKind::Sin, &[])
    }

    fn cos(&self) -> Self {
        self.record(OperatorKind::Cos, &[])
    }

    fn invert(&self) -> Self {
        self.record(OperatorKind::Invert, &[])
    }

    fn abs(&self) -> Self {
        self.record(OperatorKind::Abs, &[])
    }

    fn add_product(&self, factor1: &Self, factor2: &Self) -> Self {
        self.record(OperatorKind::AddProduct, &[factor1, factor2])
    }

    fn add_ratio(&self, numerator: &Self, denominator: &Self) -> Self {
        self.record(OperatorKind::AddRatio, &[numerator, denominator])
    }

    fn sub_ratio(&self, numerator: &Self, denominator: &Self) -> Self {
        self.record(OperatorKind::SubRatio, &[numerator, denominator])
    }

    fn accrue(&self, rate: &Self, period_length: &Self) -> Self {
        self.record(OperatorKind::Accrue, &[rate, period_length])
    }

    fn discount(&self, rate: &Self, period_length: &Self) -> Self {
        self.record(OperatorKind::Discount, &[rate, period_length])
    }

    fn barrier(&self, if_non_negative: &Self, if_negative: &Self) -> Self {
        self.record(OperatorKind::Barrier, &[if_non_negative, if_negative])
    }

    fn average(&self) -> Self {
        self.record(OperatorKind::Average, &[])
    }

    fn variance(&self) -> Self {
        self.record(OperatorKind::Variance, &[])
    }

    fn standard_deviation(&self) -> Self {
        self.record(OperatorKind::StandardDeviation, &[])
    }

    fn standard_error(&self) -> Self {
        self.record(OperatorKind::StandardError, &[])
    }

    fn sample_variance(&self) -> Self {
        self.record(OperatorKind::SampleVariance, &[])
    }

    fn min(&self) -> Self {
        self.record(OperatorKind::Min, &[])
    }

    fn max(&self) -> Self {
        self.record(OperatorKind::Max, &[])
    }

    /// Arbitrary closures have no derivative rule.
    ///
    /// # Panics
    ///
    /// Always panics with [`AadError::Unsupported`].
    fn apply<F>(&self, _f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        fatal(AadError::Unsupported("apply"))
    }
}

impl fmt::Debug for DifferentiableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DifferentiableValue")
            .field("tape", &self.tape.id())
            .field("id", &self.id)
            .field("value", &self.value)
            .field("constant", &self.constant)
            .finish()
    }
}
