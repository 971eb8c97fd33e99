//! # pricer_aad: Adjoint Algorithmic Differentiation for Monte Carlo Values
//!
//! Reverse-mode AD over [`VectorNumeric`](pricer_core::numeric::VectorNumeric)
//! values: every operation on a [`DifferentiableValue`] is recorded on a
//! [`Tape`], and one reverse sweep from an output yields the sensitivity of
//! that output to every free variable.
//!
//! ## Components
//!
//! - [`OperatorKind`]: the closed operator table, each kind with a forward
//!   rule and per-argument partial-derivative rules (`operator`)
//! - [`Tape`]: append-only node store with creation-order ids (`tape`)
//! - [`DifferentiableValue`]: the application-facing value type, implementing
//!   [`RandomVariable`](pricer_core::numeric::RandomVariable) (`value`)
//! - [`Gradient`] and [`SweepOptions`]: reverse sweep input and output
//!   (`reverse`, `gradient`)
//! - [`AadConfig`]: node limits and sweep policies, loadable from TOML
//!   (`config`)
//! - [`verify`]: finite-difference checks of the operator table
//! - [`parallel`]: independent sessions across the rayon pool
//!
//! ## Usage Examples
//!
//! ```rust
//! use pricer_aad::prelude::*;
//!
//! let tape = Tape::new();
//! let spot = tape.variable(VectorNumeric::from_paths(vec![90.0, 105.0, 120.0]).unwrap());
//! let strike = tape.constant(100.0);
//!
//! // Call payoff averaged over paths.
//! let price = spot.sub(&strike).floor_scalar(0.0).average();
//! assert!((price.value_as_scalar().unwrap() - 25.0 / 3.0).abs() < 1e-12);
//!
//! // Delta per path: 1/3 where the option is in the money.
//! let grad = price.gradient();
//! assert_eq!(grad.get(&spot).unwrap().to_vec(), vec![0.0, 1.0 / 3.0, 1.0 / 3.0]);
//! assert!(grad.get(&strike).is_none());
//! ```
//!
//! ## Usage Errors
//!
//! Combining values from different tapes, using a value after its tape was
//! reset and exceeding the configured node limit are usage errors
//! ([`AadError`]). The tape's `try_*` methods report them as `Err`; the
//! operator surface of [`DifferentiableValue`] panics. Numeric edge cases
//! are never errors and propagate as NaN or infinity.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod error;
pub mod gradient;
pub mod operator;
pub mod parallel;
pub mod reverse;
pub mod tape;
pub mod value;
pub mod verify;

pub use config::{AadConfig, AadConfigBuilder, AdjointReduction, ConfigError};
pub use error::{AadError, AadResult};
pub use gradient::Gradient;
pub use operator::OperatorKind;
pub use reverse::SweepOptions;
pub use tape::{NodeId, NodeKind, Tape, TapeId, TapeNode};
pub use value::DifferentiableValue;

/// Common imports for recording and differentiating.
pub mod prelude {
    pub use crate::{AadConfig, DifferentiableValue, Gradient, SweepOptions, Tape};
    pub use pricer_core::numeric::{RandomVariable, VectorNumeric};
}
