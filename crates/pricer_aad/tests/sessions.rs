//! Isolation between sessions and sharing of one tape across threads.

use approx::assert_relative_eq;
use pricer_aad::parallel::{run_sessions, try_run_sessions};
use pricer_aad::prelude::*;
use pricer_aad::AadError;

#[test]
fn test_parallel_sessions_match_sequential() {
    let config = AadConfig::default();
    let evaluate = |session: usize, tape: &Tape| {
        let x = tape.variable(VectorNumeric::filled(1.0 + session as f64, 16));
        let f = x.squared().mult_scalar(0.5).average();
        f.gradient().expectation(&x)
    };

    let parallel = run_sessions(&config, 32, evaluate);
    let sequential: Vec<f64> = (0..32)
        .map(|session| evaluate(session, &Tape::with_config(config.clone())))
        .collect();

    assert_eq!(parallel.len(), 32);
    for (session, (p, s)) in parallel.iter().zip(&sequential).enumerate() {
        // d/dx mean(x²/2) = x/N per path, averaged over N paths.
        assert_relative_eq!(*p, (1.0 + session as f64) / 16.0, epsilon = 1e-12);
        assert_eq!(p, s);
    }
}

#[test]
fn test_session_errors_surface() {
    let config = AadConfig::builder()
        .max_nodes(3)
        .initial_capacity(3)
        .build()
        .unwrap();
    let result: Result<Vec<()>, AadError> = try_run_sessions(&config, 4, |_, tape| {
        for _ in 0..4 {
            tape.try_variable(1.0)?;
        }
        Ok(())
    });
    assert_eq!(result, Err(AadError::CapacityExceeded { limit: 3 }));
}

#[test]
fn test_threads_sharing_a_tape_see_consistent_gradients() {
    let tape = Tape::new();
    let x = tape.variable(2.0);

    let roots: Vec<DifferentiableValue> = std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=4)
            .map(|power| {
                let x = x.clone();
                scope.spawn(move || {
                    let mut acc = x.clone();
                    for _ in 1..power {
                        acc = acc.mult(&x);
                    }
                    acc
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(tape.validate_order().is_ok());
    for (i, root) in roots.iter().enumerate() {
        let power = (i + 1) as f64;
        // d/dx x^n = n·x^(n-1)
        assert_relative_eq!(
            root.gradient().expectation(&x),
            power * 2.0_f64.powf(power - 1.0),
            epsilon = 1e-12
        );
    }
}

#[test]
#[should_panic(expected = "cannot combine values from tape")]
fn test_values_from_other_sessions_are_rejected() {
    let leaked = run_sessions(&AadConfig::default(), 2, |_, tape| tape.variable(1.0));
    let _ = leaked[0].add(&leaked[1]);
}
