//! Closed table of differentiable operators.
//!
//! Each [`OperatorKind`] pairs a forward rule, expressed purely in terms of
//! [`VectorNumeric`] operations, with a partial-derivative rule returning
//! `∂result/∂argument` for one argument position. Partials depend only on
//! the forward argument values captured when the node was recorded, never on
//! adjoints of other nodes.
//!
//! The set is closed: adding an operator means adding a variant and its two
//! rules, and the compiler checks every match for exhaustiveness.
//!
//! | kind | d/dX | d/dY | d/dZ |
//! |---|---|---|---|
//! | ADD | 1 | 1 | |
//! | SUB | 1 | −1 | |
//! | MULT | Y | X | |
//! | DIV | 1/Y | −X/Y² | |
//! | POW | Y·X^(Y−1) | 0 (Y deterministic) | |
//! | CAP | 0 if X>Y else 1 | complement | |
//! | FLOOR | 1 if X>Y else 0 | complement | |
//! | ADDPRODUCT | 1 | Z | Y |
//! | ADDRATIO | 1 | 1/Z | −Y/Z² |
//! | SUBRATIO | 1 | −1/Z | Y/Z² |
//! | ACCRUE | 1+YZ | XZ | XY |
//! | DISCOUNT | 1/(1+YZ) | −XZ/(1+YZ)² | −XY/(1+YZ)² |
//! | BARRIER | +∞ at X=0 else 0 | 1 where X≥0 | complement |
//!
//! # Examples
//!
//! ```rust
//! use pricer_aad::OperatorKind;
//! use pricer_core::numeric::VectorNumeric;
//!
//! let x = VectorNumeric::scalar(3.0);
//! let y = VectorNumeric::scalar(4.0);
//!
//! let z = OperatorKind::Mult.forward(&[&x, &y]).unwrap();
//! assert_eq!(z.as_scalar(), Some(12.0));
//!
//! let dz_dx = OperatorKind::Mult.partial(0, &[&x, &y], &z).unwrap();
//! assert_eq!(dz_dx.as_scalar(), Some(4.0));
//! ```

mod reduction;
mod rules;

use std::fmt;

use pricer_core::numeric::VectorNumeric;

use crate::error::{AadError, AadResult};

/// Supported operator, arity 1 to 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperatorKind {
    // Arity 1
    /// `X²`
    Squared,
    /// `√X`
    Sqrt,
    /// `ln X`
    Log,
    /// `sin X`
    Sin,
    /// `cos X`
    Cos,
    /// `exp X`
    Exp,
    /// `1/X`
    Invert,
    /// `|X|`
    Abs,
    /// Mean over paths.
    Average,
    /// Population variance over paths.
    Variance,
    /// Population standard deviation over paths.
    StandardDeviation,
    /// Standard error of the mean.
    StandardError,
    /// Sample variance over paths.
    SampleVariance,
    /// Minimum over paths.
    Min,
    /// Maximum over paths.
    Max,

    // Arity 2
    /// `X + Y`
    Add,
    /// `X − Y`
    Sub,
    /// `X · Y`
    Mult,
    /// `X / Y`
    Div,
    /// `X ^ Y`, `Y` treated as deterministic.
    Pow,
    /// `min(X, Y)`
    Cap,
    /// `max(X, Y)`
    Floor,

    // Arity 3
    /// `X + Y·Z`
    AddProduct,
    /// `X + Y/Z`
    AddRatio,
    /// `X − Y/Z`
    SubRatio,
    /// `X·(1 + Y·Z)`
    Accrue,
    /// `X / (1 + Y·Z)`
    Discount,
    /// `Y` where `X ≥ 0`, else `Z`.
    Barrier,
}

impl OperatorKind {
    /// Every operator, in declaration order.
    pub const ALL: [OperatorKind; 28] = [
        OperatorKind::Squared,
        OperatorKind::Sqrt,
        OperatorKind::Log,
        OperatorKind::Sin,
        OperatorKind::Cos,
        OperatorKind::Exp,
        OperatorKind::Invert,
        OperatorKind::Abs,
        OperatorKind::Average,
        OperatorKind::Variance,
        OperatorKind::StandardDeviation,
        OperatorKind::StandardError,
        OperatorKind::SampleVariance,
        OperatorKind::Min,
        OperatorKind::Max,
        OperatorKind::Add,
        OperatorKind::Sub,
        OperatorKind::Mult,
        OperatorKind::Div,
        OperatorKind::Pow,
        OperatorKind::Cap,
        OperatorKind::Floor,
        OperatorKind::AddProduct,
        OperatorKind::AddRatio,
        OperatorKind::SubRatio,
        OperatorKind::Accrue,
        OperatorKind::Discount,
        OperatorKind::Barrier,
    ];

    /// Number of arguments the operator consumes.
    pub const fn arity(self) -> usize {
        use OperatorKind::*;
        match self {
            Squared | Sqrt | Log | Sin | Cos | Exp | Invert | Abs | Average | Variance
            | StandardDeviation | StandardError | SampleVariance | Min | Max => 1,
            Add | Sub | Mult | Div | Pow | Cap | Floor => 2,
            AddProduct | AddRatio | SubRatio | Accrue | Discount | Barrier => 3,
        }
    }

    /// Upper-case operator name.
    pub const fn name(self) -> &'static str {
        use OperatorKind::*;
        match self {
            Squared => "SQUARED",
            Sqrt => "SQRT",
            Log => "LOG",
            Sin => "SIN",
            Cos => "COS",
            Exp => "EXP",
            Invert => "INVERT",
            Abs => "ABS",
            Average => "AVERAGE",
            Variance => "VARIANCE",
            StandardDeviation => "STDEV",
            StandardError => "STDERROR",
            SampleVariance => "SVARIANCE",
            Min => "MIN",
            Max => "MAX",
            Add => "ADD",
            Sub => "SUB",
            Mult => "MULT",
            Div => "DIV",
            Pow => "POW",
            Cap => "CAP",
            Floor => "FLOOR",
            AddProduct => "ADDPRODUCT",
            AddRatio => "ADDRATIO",
            SubRatio => "SUBRATIO",
            Accrue => "ACCRUE",
            Discount => "DISCOUNT",
            Barrier => "BARRIER",
        }
    }

    /// Whether the operator reduces a per-path value to a deterministic one.
    pub const fn is_reduction(self) -> bool {
        use OperatorKind::*;
        matches!(
            self,
            Average | Variance | StandardDeviation | StandardError | SampleVariance | Min | Max
        )
    }

    /// Whether the partial at `position` is the exact derivative of the
    /// forward rule, and so can be checked against a finite difference.
    ///
    /// Two rules are conventions rather than exact derivatives:
    /// - `POW` treats its exponent as deterministic, so `∂/∂Y` is 0.
    /// - The variance family (`VARIANCE`, `STDEV`, `STDERROR`, `SVARIANCE`)
    ///   uses the closed form `2/N · (X − x̄·(2N−1)/N)`, kept as-is so
    ///   existing calibrations reproduce.
    pub const fn has_exact_partial(self, position: usize) -> bool {
        use OperatorKind::*;
        match self {
            Pow => position == 0,
            Variance | StandardDeviation | StandardError | SampleVariance => false,
            _ => true,
        }
    }

    /// Evaluates the forward rule.
    ///
    /// # Errors
    ///
    /// Returns [`AadError::ArityMismatch`] if `args.len()` differs from
    /// [`arity`](Self::arity).
    pub fn forward(self, args: &[&VectorNumeric]) -> AadResult<VectorNumeric> {
        self.check_arity(args.len())?;
        Ok(rules::forward(self, args))
    }

    /// Evaluates `∂result/∂args[position]`.
    ///
    /// `result` is the forward value recorded for the node; rules that can
    /// reuse it (for example `EXP`) do.
    ///
    /// # Errors
    ///
    /// Returns [`AadError::ArityMismatch`] for a wrong argument count and
    /// [`AadError::ArgumentPosition`] for a position outside the arity.
    pub fn partial(
        self,
        position: usize,
        args: &[&VectorNumeric],
        result: &VectorNumeric,
    ) -> AadResult<VectorNumeric> {
        self.check_arity(args.len())?;
        if position >= self.arity() {
            return Err(AadError::ArgumentPosition {
                operator: self,
                position,
            });
        }
        Ok(rules::partial(self, position, args, result))
    }

    /// Forward rule without the arity check; `args.len()` must equal the
    /// arity.
    pub(crate) fn evaluate(self, args: &[&VectorNumeric]) -> VectorNumeric {
        rules::forward(self, args)
    }

    fn check_arity(self, found: usize) -> AadResult<()> {
        if found != self.arity() {
            return Err(AadError::ArityMismatch {
                operator: self,
                expected: self.arity(),
                found,
            });
        }
        Ok(())
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
