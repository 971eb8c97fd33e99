//! Independent differentiation sessions across the rayon thread pool.
//!
//! Each session gets a fresh [`Tape`]; sessions share nothing, so no lock
//! is ever contended. Typical use splits a Monte Carlo run into batches of
//! paths, differentiates every batch on its own tape, and averages the
//! per-batch sensitivities.
//!
//! ```text
//!   session 0        session 1              session n-1
//!  ┌─────────┐      ┌─────────┐            ┌─────────┐
//!  │ Tape 0  │      │ Tape 1  │    ...     │ Tape n-1│
//!  │ record  │      │ record  │            │ record  │
//!  │ sweep   │      │ sweep   │            │ sweep   │
//!  └────┬────┘      └────┬────┘            └────┬────┘
//!       └────────────────┴──────────┬───────────┘
//!                                   ▼
//!                        results in session order
//! ```
//!
//! # Example
//!
//! ```rust
//! use pricer_aad::{parallel, AadConfig};
//! use pricer_core::numeric::RandomVariable;
//!
//! let deltas = parallel::run_sessions(&AadConfig::default(), 4, |session, tape| {
//!     let x = tape.variable(1.0 + session as f64);
//!     let f = x.squared();
//!     f.gradient().expectation(&x)
//! });
//!
//! assert_eq!(deltas, vec![2.0, 4.0, 6.0, 8.0]);
//! ```

use rayon::prelude::*;
use tracing::debug;

use crate::config::AadConfig;
use crate::tape::Tape;

/// Runs `n_sessions` sessions in parallel, each on a fresh tape built from
/// `config`, and returns their results in session order.
///
/// `f` receives the session index and the session's tape.
pub fn run_sessions<T, F>(config: &AadConfig, n_sessions: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize, &Tape) -> T + Sync,
{
    debug!(
        sessions = n_sessions,
        threads = rayon::current_num_threads(),
        "running independent sessions"
    );
    (0..n_sessions)
        .into_par_iter()
        .map(|session| {
            let tape = Tape::with_config(config.clone());
            f(session, &tape)
        })
        .collect()
}

/// Like [`run_sessions`], stopping at the first error.
pub fn try_run_sessions<T, E, F>(config: &AadConfig, n_sessions: usize, f: F) -> Result<Vec<T>, E>
where
    T: Send,
    E: Send,
    F: Fn(usize, &Tape) -> Result<T, E> + Sync,
{
    debug!(
        sessions = n_sessions,
        threads = rayon::current_num_threads(),
        "running independent fallible sessions"
    );
    (0..n_sessions)
        .into_par_iter()
        .map(|session| {
            let tape = Tape::with_config(config.clone());
            f(session, &tape)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AadError;

    #[test]
    fn test_sessions_use_distinct_tapes() {
        let ids = run_sessions(&AadConfig::default(), 8, |_, tape| tape.id());
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 8);
    }

    #[test]
    fn test_zero_sessions() {
        let out: Vec<usize> = run_sessions(&AadConfig::default(), 0, |i, _| i);
        assert!(out.is_empty());
    }

    #[test]
    fn test_try_run_sessions_reports_error() {
        let config = AadConfig::builder()
            .max_nodes(1)
            .initial_capacity(1)
            .build()
            .unwrap();
        let result = try_run_sessions(&config, 3, |_, tape| {
            tape.try_variable(2.0)?;
            tape.try_variable(3.0).map(|_| ())
        });
        assert_eq!(result, Err(AadError::CapacityExceeded { limit: 1 }));
    }
}
