//! Black-Scholes reference values for the European call.

use serde::Serialize;

const SQRT_2: f64 = std::f64::consts::SQRT_2;
const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Complementary error function, Abramowitz and Stegun 7.1.26
/// (absolute error below 1.5e-7).
fn erfc_approx(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let abs_x = x.abs();
    let t = 1.0 / (1.0 + P * abs_x);
    let poly = A1 + t * (A2 + t * (A3 + t * (A4 + t * A5)));
    let erfc_abs = t * poly * (-abs_x * abs_x).exp();
    if x < 0.0 {
        2.0 - erfc_abs
    } else {
        erfc_abs
    }
}

/// Φ(x) = erfc(−x/√2) / 2
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc_approx(-x / SQRT_2)
}

/// φ(x) = exp(−x²/2) / √(2π)
pub fn norm_pdf(x: f64) -> f64 {
    FRAC_1_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Market and contract inputs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CallInputs {
    /// Spot price.
    pub spot: f64,
    /// Strike.
    pub strike: f64,
    /// Continuously compounded risk-free rate.
    pub rate: f64,
    /// Volatility.
    pub vol: f64,
    /// Time to expiry in years.
    pub maturity: f64,
}

/// Price and first-order sensitivities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CallGreeks {
    /// Present value.
    pub price: f64,
    /// ∂price/∂spot
    pub delta: f64,
    /// ∂price/∂vol
    pub vega: f64,
    /// ∂price/∂rate
    pub rho: f64,
}

impl CallInputs {
    /// Positivity checks on spot, strike, vol and maturity.
    pub fn validate(&self) -> Result<(), String> {
        let checks = [
            ("spot", self.spot),
            ("strike", self.strike),
            ("vol", self.vol),
            ("maturity", self.maturity),
        ];
        match checks.iter().find(|(_, value)| !(*value > 0.0)) {
            Some((name, value)) => Err(format!("{} must be positive, got {}", name, value)),
            None => Ok(()),
        }
    }

    fn d1_d2(&self) -> (f64, f64) {
        let vol_sqrt_t = self.vol * self.maturity.sqrt();
        let d1 = ((self.spot / self.strike).ln()
            + (self.rate + 0.5 * self.vol * self.vol) * self.maturity)
            / vol_sqrt_t;
        (d1, d1 - vol_sqrt_t)
    }

    /// Closed-form call price and greeks.
    pub fn black_scholes(&self) -> CallGreeks {
        let (d1, d2) = self.d1_d2();
        let discounted_strike = self.strike * (-self.rate * self.maturity).exp();
        CallGreeks {
            price: self.spot * norm_cdf(d1) - discounted_strike * norm_cdf(d2),
            delta: norm_cdf(d1),
            vega: self.spot * self.maturity.sqrt() * norm_pdf(d1),
            rho: self.maturity * discounted_strike * norm_cdf(d2),
        }
    }
}
