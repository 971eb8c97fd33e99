//! Error types for vectorised numeric values.

use thiserror::Error;

/// Errors raised while constructing a [`VectorNumeric`](super::VectorNumeric).
///
/// Arithmetic never produces these: numeric edge cases (division by zero,
/// logarithm of a non-positive value) follow IEEE-754 and surface as NaN or
/// infinity in the realisations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumericError {
    /// A per-path value needs at least one realisation.
    #[error("a per-path value needs at least one realisation")]
    EmptyRealisations,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_error_display() {
        let err = NumericError::EmptyRealisations;
        assert!(err.to_string().contains("at least one realisation"));
    }
}
