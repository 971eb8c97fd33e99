//! # pricer_core: Vectorised Monte Carlo Values
//!
//! ## Foundation Role
//!
//! pricer_core is the bottom layer of the workspace, providing:
//! - [`VectorNumeric`](numeric::VectorNumeric): one double per simulation
//!   path, or a single deterministic double broadcast to every path
//! - [`RandomVariable`](numeric::RandomVariable): the operator surface shared
//!   by plain values and the differentiable values of `pricer_aad`
//! - Error types: [`NumericError`](numeric::NumericError)
//!
//! It has no dependency on other pricer_* crates and knows nothing about
//! differentiation.
//!
//! ## Usage Examples
//!
//! ```rust
//! use pricer_core::numeric::{RandomVariable, VectorNumeric};
//!
//! let spot = VectorNumeric::from_paths(vec![95.0, 100.0, 110.0]).unwrap();
//! let payoff = spot.sub_scalar(100.0).floor_scalar(0.0);
//!
//! assert_eq!(payoff.to_vec(), vec![0.0, 0.0, 10.0]);
//! assert!((payoff.average_value() - 10.0 / 3.0).abs() < 1e-12);
//! assert!(payoff.average().is_deterministic());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod numeric;
