//! Vectorised numeric values for Monte Carlo simulation.
//!
//! ## Module Structure
//!
//! - `vector`: [`VectorNumeric`], one double per path or a deterministic double
//! - `traits`: [`RandomVariable`], the operator surface shared with
//!   differentiable values
//! - `ops`: `std::ops` overloads
//! - `error`: [`NumericError`]
//!
//! Values are pure: every operation returns a new value and nothing carries
//! identity beyond its content.

mod error;
mod ops;
mod traits;
mod vector;

pub use error::NumericError;
pub use traits::RandomVariable;
pub use vector::VectorNumeric;
