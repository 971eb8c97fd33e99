//! Greeks command implementation
//!
//! Prices a European call by Monte Carlo under GBM and computes delta, vega
//! and rho from a single reverse sweep, next to the Black-Scholes values.

use clap::Args;
use pricer_aad::parallel::try_run_sessions;
use pricer_aad::{AadConfig, DifferentiableValue, Tape};
use pricer_core::numeric::{RandomVariable, VectorNumeric};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::Serialize;
use tracing::{debug, info};

use super::OutputFormat;
use crate::analytic::{CallGreeks, CallInputs};
use crate::{CliError, Result};

/// Arguments of `aad greeks`.
#[derive(Args, Debug, Clone)]
pub struct GreeksArgs {
    /// Spot price
    #[arg(long, default_value_t = 100.0)]
    pub spot: f64,

    /// Strike
    #[arg(long, default_value_t = 100.0)]
    pub strike: f64,

    /// Continuously compounded risk-free rate
    #[arg(long, default_value_t = 0.05)]
    pub rate: f64,

    /// Volatility
    #[arg(long, default_value_t = 0.2)]
    pub vol: f64,

    /// Time to expiry in years
    #[arg(long, default_value_t = 1.0)]
    pub maturity: f64,

    /// Total number of Monte Carlo paths
    #[arg(short = 'n', long, default_value_t = 100_000)]
    pub paths: usize,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Independent sessions run in parallel, each on its own tape
    #[arg(long, default_value_t = 1)]
    pub sessions: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl GreeksArgs {
    fn inputs(&self) -> CallInputs {
        CallInputs {
            spot: self.spot,
            strike: self.strike,
            rate: self.rate,
            vol: self.vol,
            maturity: self.maturity,
        }
    }
}

/// Monte Carlo estimate alongside its closed-form reference.
#[derive(Debug, Serialize)]
pub struct GreeksReport {
    /// Inputs priced.
    pub inputs: CallInputs,
    /// Total paths simulated.
    pub paths: usize,
    /// Sessions the paths were split across.
    pub sessions: usize,
    /// Estimate from the AD engine.
    pub monte_carlo: CallGreeks,
    /// Black-Scholes values.
    pub analytic: CallGreeks,
    /// Standard error of the Monte Carlo price.
    pub price_standard_error: f64,
}

/// Discounted call payoff on terminal GBM prices, averaged over paths.
///
/// Generic so the same code prices on plain values and records on a tape.
pub fn discounted_call<R: RandomVariable>(
    spot: &R,
    vol: &R,
    rate: &R,
    maturity: &R,
    normals: &R,
    strike: f64,
) -> (R, R) {
    let drift = rate.sub(&vol.squared().mult_scalar(0.5)).mult(maturity);
    let diffusion = vol.mult(&maturity.sqrt()).mult(normals);
    let terminal = spot.mult(&drift.add(&diffusion).exp());
    let discount = rate.mult(maturity).mult_scalar(-1.0).exp();
    let discounted = terminal.sub_scalar(strike).floor_scalar(0.0).mult(&discount);
    (discounted.average(), discounted.standard_error())
}

struct SessionEstimate {
    greeks: CallGreeks,
    standard_error: f64,
}

fn run_session(
    tape: &Tape,
    inputs: &CallInputs,
    paths: usize,
    seed: u64,
) -> Result<SessionEstimate> {
    let mut rng = StdRng::seed_from_u64(seed);
    let draws: Vec<f64> = (0..paths).map(|_| StandardNormal.sample(&mut rng)).collect();
    let normals = VectorNumeric::from_paths(draws)?;

    let spot = tape.try_variable(inputs.spot)?;
    let vol = tape.try_variable(inputs.vol)?;
    let rate = tape.try_variable(inputs.rate)?;
    let maturity = tape.try_constant(inputs.maturity)?;
    let normals = tape.try_constant(normals)?;

    let (price, standard_error) =
        discounted_call(&spot, &vol, &rate, &maturity, &normals, inputs.strike);
    let grad = price.try_gradient()?;
    debug!(nodes = tape.node_count(), entries = grad.len(), "session differentiated");

    let sensitivity = |input: &DifferentiableValue| grad.total(input);
    Ok(SessionEstimate {
        greeks: CallGreeks {
            price: price.average_value(),
            delta: sensitivity(&spot),
            vega: sensitivity(&vol),
            rho: sensitivity(&rate),
        },
        standard_error: standard_error.average_value(),
    })
}

/// Run the greeks command
pub fn run(args: &GreeksArgs, config: &AadConfig) -> Result<()> {
    let inputs = args.inputs();
    inputs.validate().map_err(CliError::InvalidArgument)?;
    if args.sessions == 0 || args.paths < 2 * args.sessions {
        return Err(CliError::InvalidArgument(format!(
            "need at least two paths per session, got {} paths over {} sessions",
            args.paths, args.sessions
        )));
    }

    info!("Starting Monte Carlo greeks...");
    info!("  Paths: {} over {} session(s)", args.paths, args.sessions);

    let per_session = args.paths / args.sessions;
    let estimates = try_run_sessions(config, args.sessions, |session, tape| {
        run_session(tape, &inputs, per_session, args.seed.wrapping_add(session as u64))
    })?;

    let report = GreeksReport {
        inputs,
        paths: per_session * args.sessions,
        sessions: args.sessions,
        monte_carlo: average(&estimates),
        analytic: inputs.black_scholes(),
        price_standard_error: pooled_standard_error(&estimates),
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_table(&report),
    }

    info!("Greeks complete");
    Ok(())
}

fn average(estimates: &[SessionEstimate]) -> CallGreeks {
    let n = estimates.len() as f64;
    estimates.iter().fold(CallGreeks::default(), |acc, e| CallGreeks {
        price: acc.price + e.greeks.price / n,
        delta: acc.delta + e.greeks.delta / n,
        vega: acc.vega + e.greeks.vega / n,
        rho: acc.rho + e.greeks.rho / n,
    })
}

/// Standard error of the mean of equally sized session means.
fn pooled_standard_error(estimates: &[SessionEstimate]) -> f64 {
    let n = estimates.len() as f64;
    estimates
        .iter()
        .map(|e| e.standard_error * e.standard_error)
        .sum::<f64>()
        .sqrt()
        / n
}

fn print_table(report: &GreeksReport) {
    let rows = [
        ("Price", report.monte_carlo.price, report.analytic.price),
        ("Delta", report.monte_carlo.delta, report.analytic.delta),
        ("Vega", report.monte_carlo.vega, report.analytic.vega),
        ("Rho", report.monte_carlo.rho, report.analytic.rho),
    ];
    println!("\n┌────────┬──────────────┬──────────────┬──────────────┐");
    println!("│ Greek  │ Monte Carlo  │ Analytic     │ Difference   │");
    println!("├────────┼──────────────┼──────────────┼──────────────┤");
    for (name, mc, analytic) in rows {
        println!(
            "│ {:<6} │ {:>12.6} │ {:>12.6} │ {:>12.6} │",
            name,
            mc,
            analytic,
            mc - analytic
        );
    }
    println!("└────────┴──────────────┴──────────────┴──────────────┘");
    println!(
        "{} paths, {} session(s), price standard error {:.6}",
        report.paths, report.sessions, report.price_standard_error
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn inputs() -> CallInputs {
        CallInputs {
            spot: 100.0,
            strike: 100.0,
            rate: 0.05,
            vol: 0.2,
            maturity: 1.0,
        }
    }

    #[test]
    fn test_generic_payoff_agrees_on_plain_and_recorded_values() {
        let normals = VectorNumeric::from_paths(vec![-1.0, 0.0, 0.5, 1.5]).unwrap();
        let s = VectorNumeric::scalar;
        let (plain, _) = discounted_call(&s(100.0), &s(0.2), &s(0.05), &s(1.0), &normals, 100.0);

        let tape = Tape::new();
        let (recorded, _) = discounted_call(
            &tape.variable(100.0),
            &tape.variable(0.2),
            &tape.variable(0.05),
            &tape.constant(1.0),
            &tape.constant(normals),
            100.0,
        );
        assert_relative_eq!(plain.average_value(), recorded.average_value(), epsilon = 1e-12);
    }

    #[test]
    fn test_monte_carlo_greeks_near_black_scholes() {
        let tape = Tape::new();
        let estimate = run_session(&tape, &inputs(), 200_000, 7).unwrap();
        let analytic = inputs().black_scholes();

        assert_relative_eq!(estimate.greeks.price, analytic.price, epsilon = 0.15);
        assert_relative_eq!(estimate.greeks.delta, analytic.delta, epsilon = 0.01);
        assert_relative_eq!(estimate.greeks.vega, analytic.vega, epsilon = 1.0);
        assert_relative_eq!(estimate.greeks.rho, analytic.rho, epsilon = 1.0);
        assert!(estimate.standard_error > 0.0);
    }

    #[test]
    fn test_delta_matches_bumped_price() {
        let normals = VectorNumeric::from_paths((0..64).map(|i| (i as f64 - 31.5) / 16.0).collect())
            .unwrap();
        let price_at = |spot: f64| {
            let s = VectorNumeric::scalar;
            discounted_call(&s(spot), &s(0.2), &s(0.05), &s(1.0), &normals, 100.0)
                .0
                .average_value()
        };

        let tape = Tape::new();
        let spot = tape.variable(100.0);
        let (price, _) = discounted_call(
            &spot,
            &tape.variable(0.2),
            &tape.variable(0.05),
            &tape.constant(1.0),
            &tape.constant(normals.clone()),
            100.0,
        );
        let h = 1e-4;
        let fd = (price_at(100.0 + h) - price_at(100.0 - h)) / (2.0 * h);
        assert_relative_eq!(price.gradient().total(&spot), fd, epsilon = 1e-6);
    }

    #[test]
    fn test_rejects_too_few_paths() {
        let args = GreeksArgs {
            spot: 100.0,
            strike: 100.0,
            rate: 0.05,
            vol: 0.2,
            maturity: 1.0,
            paths: 3,
            seed: 1,
            sessions: 2,
            format: OutputFormat::Json,
        };
        let err = run(&args, &AadConfig::default()).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
