//! Finite-difference verification of the operator table.
//!
//! Each analytic partial is compared path by path with a central difference
//! of the forward rule. Elementwise operators bump the whole argument and
//! read the matching path of the result; reductions bump one path of the
//! argument at a time and read the deterministic result.
//!
//! Partials that are conventions rather than exact derivatives (see
//! [`OperatorKind::has_exact_partial`]) are not compared.

use pricer_core::numeric::VectorNumeric;

use crate::error::AadResult;
use crate::operator::OperatorKind;

/// Default bump size.
pub const DEFAULT_STEP: f64 = 1e-6;

/// Default absolute tolerance for [`OperatorCheck::passes`].
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// `(f(x + h) − f(x − h)) / 2h`
#[inline]
pub fn central_difference<F>(f: F, x: f64, step: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    (f(x + step) - f(x - step)) / (2.0 * step)
}

/// Outcome of checking one operator.
#[derive(Clone, Debug, PartialEq)]
pub struct OperatorCheck {
    /// Operator checked.
    pub operator: OperatorKind,
    /// Largest absolute difference between the analytic partial and the
    /// finite difference, per argument position. `None` where the partial
    /// is a convention and was not compared.
    pub max_abs_error: Vec<Option<f64>>,
}

impl OperatorCheck {
    /// Largest compared error over every position; `None` if nothing was
    /// compared. NaN errors propagate.
    pub fn worst(&self) -> Option<f64> {
        self.max_abs_error
            .iter()
            .flatten()
            .copied()
            .reduce(|a, b| if a.is_nan() || a >= b { a } else { b })
    }

    /// Whether every compared position is within `tolerance`.
    pub fn passes(&self, tolerance: f64) -> bool {
        self.max_abs_error
            .iter()
            .flatten()
            .all(|&error| error <= tolerance)
    }

    /// Whether no position could be compared.
    pub fn is_convention_only(&self) -> bool {
        self.max_abs_error.iter().all(Option::is_none)
    }
}

/// Compares every partial of `kind` at `args` with a central difference.
///
/// # Errors
///
/// Returns [`AadError::ArityMismatch`](crate::AadError::ArityMismatch) if
/// `args` does not match the operator's arity.
pub fn check_operator(kind: OperatorKind, args: &[VectorNumeric], step: f64) -> AadResult<OperatorCheck> {
    let refs: Vec<&VectorNumeric> = args.iter().collect();
    let result = kind.forward(&refs)?;
    let paths = args.iter().map(VectorNumeric::size).max().unwrap_or(1);

    let mut max_abs_error = Vec::with_capacity(args.len());
    for position in 0..args.len() {
        if !kind.has_exact_partial(position) {
            max_abs_error.push(None);
            continue;
        }
        let partial = kind.partial(position, &refs, &result)?;
        let mut worst = 0.0_f64;
        for path in 0..paths {
            let fd = central_difference(|t| bumped(kind, args, position, path, t), 0.0, step);
            let error = (partial.get(path) - fd).abs();
            if error.is_nan() || error > worst {
                worst = error;
            }
            if worst.is_nan() {
                break;
            }
        }
        max_abs_error.push(Some(worst));
    }

    Ok(OperatorCheck {
        operator: kind,
        max_abs_error,
    })
}

/// Checks every operator at [`sample_arguments`].
pub fn check_all_operators(step: f64) -> AadResult<Vec<OperatorCheck>> {
    OperatorKind::ALL
        .iter()
        .map(|&kind| check_operator(kind, &sample_arguments(kind), step))
        .collect()
}

/// Arguments away from every kink and singularity of `kind`.
///
/// All arguments are per-path over four paths. Operands of `CAP`/`FLOOR`
/// never tie, `BARRIER` triggers stay clear of zero and arguments of
/// `LOG`/`SQRT`/`INVERT`/`POW` stay positive.
pub fn sample_arguments(kind: OperatorKind) -> Vec<VectorNumeric> {
    let x = paths(&[0.7, 1.3, 2.1, 0.4]);
    let y = paths(&[0.9, 1.6, 0.5, 2.4]);
    let z = paths(&[1.5, 0.8, 2.2, 1.1]);
    let signed = paths(&[-0.5, 0.3, 1.2, -1.1]);

    match kind {
        OperatorKind::Abs => vec![signed],
        OperatorKind::Pow => vec![x, VectorNumeric::scalar(2.5)],
        OperatorKind::Barrier => vec![signed, y, z],
        _ => match kind.arity() {
            1 => vec![x],
            2 => vec![x, y],
            _ => vec![x, y, z],
        },
    }
}

/// Value on `path` of the result with argument `position` shifted by
/// `shift`: the whole argument for elementwise operators, only `path` for
/// reductions.
fn bumped(kind: OperatorKind, args: &[VectorNumeric], position: usize, path: usize, shift: f64) -> f64 {
    let mut shifted = args.to_vec();
    let target = &args[position];
    shifted[position] = if kind.is_reduction() && !target.is_deterministic() {
        let mut values = target.to_vec();
        values[path] += shift;
        from_values(values)
    } else {
        target.map(|v| v + shift)
    };

    let refs: Vec<&VectorNumeric> = shifted.iter().collect();
    let result = kind.evaluate(&refs);
    if kind.is_reduction() {
        result.get(0)
    } else {
        result.get(path)
    }
}

/// An empty input surfaces as NaN and fails the check.
fn from_values(values: Vec<f64>) -> VectorNumeric {
    VectorNumeric::from_paths(values).unwrap_or_else(|_| VectorNumeric::scalar(f64::NAN))
}

fn paths(values: &[f64]) -> VectorNumeric {
    from_values(values.to_vec())
}
