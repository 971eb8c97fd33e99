//! Check command implementation
//!
//! Finite-difference self-check of every operator in the AD table.

use pricer_aad::verify::{check_all_operators, OperatorCheck};
use serde::Serialize;
use tracing::{info, warn};

use super::OutputFormat;
use crate::{CliError, Result};

#[derive(Debug, Serialize)]
struct CheckRow {
    operator: String,
    arity: usize,
    max_abs_error: Vec<Option<f64>>,
    status: &'static str,
}

fn status(check: &OperatorCheck, tolerance: f64) -> &'static str {
    if check.is_convention_only() {
        "closed form"
    } else if check.passes(tolerance) {
        "ok"
    } else {
        "FAILED"
    }
}

/// Run the check command
pub fn run(step: f64, tolerance: f64, format: OutputFormat) -> Result<()> {
    if !(step > 0.0) || !(tolerance > 0.0) {
        return Err(CliError::InvalidArgument(format!(
            "step and tolerance must be positive, got {} and {}",
            step, tolerance
        )));
    }
    info!("Checking operator partials (step {:e}, tolerance {:e})...", step, tolerance);

    let checks = check_all_operators(step)?;
    let rows: Vec<CheckRow> = checks
        .iter()
        .map(|check| CheckRow {
            operator: check.operator.to_string(),
            arity: check.operator.arity(),
            max_abs_error: check.max_abs_error.clone(),
            status: status(check, tolerance),
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => print_table(&rows),
    }

    let failed: Vec<String> = rows
        .iter()
        .filter(|row| row.status == "FAILED")
        .map(|row| row.operator.clone())
        .collect();
    if failed.is_empty() {
        info!("All {} operators passed", rows.len());
        Ok(())
    } else {
        warn!("{} operator(s) outside tolerance", failed.len());
        Err(CliError::CheckFailed(failed))
    }
}

fn format_error(error: &Option<f64>) -> String {
    match error {
        Some(error) => format!("{:.2e}", error),
        None => "-".to_string(),
    }
}

fn print_table(rows: &[CheckRow]) {
    println!("\n┌────────────┬───────┬──────────┬──────────┬──────────┬─────────────┐");
    println!("│ Operator   │ Arity │ ∂X       │ ∂Y       │ ∂Z       │ Status      │");
    println!("├────────────┼───────┼──────────┼──────────┼──────────┼─────────────┤");
    for row in rows {
        let mut errors: Vec<String> = row.max_abs_error.iter().map(format_error).collect();
        errors.resize(3, String::new());
        println!(
            "│ {:<10} │ {:>5} │ {:>8} │ {:>8} │ {:>8} │ {:<11} │",
            row.operator, row.arity, errors[0], errors[1], errors[2], row.status
        );
    }
    println!("└────────────┴───────┴──────────┴──────────┴──────────┴─────────────┘");
}
