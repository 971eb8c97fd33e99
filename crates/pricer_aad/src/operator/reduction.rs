//! Partial derivatives of the path reductions.
//!
//! For a per-path value `X` over `N` paths with mean `x̄`:
//!
//! - AVERAGE: `1/N` on every path
//! - VARIANCE: `2/N · (X − x̄·(2N−1)/N)`
//! - STDEV: VARIANCE derivative `· 0.5 / sqrt(variance)`
//! - STDERROR: VARIANCE derivative `· 0.5 / sqrt(variance · N)`
//! - SVARIANCE: `2/(N−1) · (X − x̄·(2N−1)/N)`, zero when N < 2 like its value
//! - MIN/MAX: 1 on every path attaining the extremum, 0 elsewhere
//!
//! MIN/MAX ties give every tied path a full unit, so the indicator can sum
//! to more than one.

use pricer_core::numeric::{RandomVariable, VectorNumeric};

pub(super) fn average(x: &VectorNumeric) -> VectorNumeric {
    let n = x.size() as f64;
    x.filled_like(1.0 / n)
}

pub(super) fn variance(x: &VectorNumeric) -> VectorNumeric {
    let n = x.size() as f64;
    centred(x, 2.0 / n)
}

pub(super) fn standard_deviation(x: &VectorNumeric) -> VectorNumeric {
    let scale = 0.5 / x.variance_value().sqrt();
    variance(x).map(|d| d * scale)
}

pub(super) fn standard_error(x: &VectorNumeric) -> VectorNumeric {
    let n = x.size() as f64;
    let scale = 0.5 / (x.variance_value() * n).sqrt();
    variance(x).map(|d| d * scale)
}

pub(super) fn sample_variance(x: &VectorNumeric) -> VectorNumeric {
    if x.size() < 2 {
        return x.zeros_like();
    }
    let n = x.size() as f64;
    centred(x, 2.0 / (n - 1.0))
}

pub(super) fn extremum_indicator(x: &VectorNumeric, extremum: &VectorNumeric) -> VectorNumeric {
    let target = extremum.get(0);
    x.map(|v| if v == target { 1.0 } else { 0.0 })
}

/// `factor · (X − x̄·(2N−1)/N)`
fn centred(x: &VectorNumeric, factor: f64) -> VectorNumeric {
    let n = x.size() as f64;
    let shift = x.mean() * (2.0 * n - 1.0) / n;
    x.map(|v| factor * (v - shift))
}
