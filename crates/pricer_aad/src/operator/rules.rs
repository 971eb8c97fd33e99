//! Forward and partial-derivative rules.
//!
//! Callers validate arity and argument position first; here `args` always
//! holds exactly `kind.arity()` values and `position < kind.arity()`.

use pricer_core::numeric::{RandomVariable, VectorNumeric};

use super::reduction;
use super::OperatorKind;

pub(super) fn forward(kind: OperatorKind, args: &[&VectorNumeric]) -> VectorNumeric {
    use OperatorKind::*;

    let x = args[0];
    match kind {
        Squared => x.squared(),
        Sqrt => x.sqrt(),
        Log => x.log(),
        Sin => x.sin(),
        Cos => x.cos(),
        Exp => x.exp(),
        Invert => x.invert(),
        Abs => x.abs(),
        Average => x.average(),
        Variance => x.variance(),
        StandardDeviation => x.standard_deviation(),
        StandardError => x.standard_error(),
        SampleVariance => x.sample_variance(),
        Min => x.min(),
        Max => x.max(),
        Add => x.add(args[1]),
        Sub => x.sub(args[1]),
        Mult => x.mult(args[1]),
        Div => x.div(args[1]),
        Pow => x.pow(args[1]),
        Cap => x.cap(args[1]),
        Floor => x.floor(args[1]),
        AddProduct => x.add_product(args[1], args[2]),
        AddRatio => x.add_ratio(args[1], args[2]),
        SubRatio => x.sub_ratio(args[1], args[2]),
        Accrue => x.accrue(args[1], args[2]),
        Discount => x.discount(args[1], args[2]),
        Barrier => x.barrier(args[1], args[2]),
    }
}

pub(super) fn partial(
    kind: OperatorKind,
    position: usize,
    args: &[&VectorNumeric],
    result: &VectorNumeric,
) -> VectorNumeric {
    use OperatorKind::*;

    let x = args[0];
    match kind {
        Squared => x.map(|x| 2.0 * x),
        Sqrt => x.map(|x| 0.5 / x.sqrt()),
        Log => x.map(|x| 1.0 / x),
        Sin => x.map(f64::cos),
        Cos => x.map(|x| -x.sin()),
        Exp => result.clone(),
        Invert => x.map(|x| -1.0 / (x * x)),
        Abs => x.map(|x| if x == 0.0 { 0.0 } else { x.signum() }),

        Average => reduction::average(x),
        Variance => reduction::variance(x),
        StandardDeviation => reduction::standard_deviation(x),
        StandardError => reduction::standard_error(x),
        SampleVariance => reduction::sample_variance(x),
        Min | Max => reduction::extremum_indicator(x, result),

        Add => one(),
        Sub => match position {
            0 => one(),
            _ => VectorNumeric::scalar(-1.0),
        },
        Mult => match position {
            0 => args[1].clone(),
            _ => x.clone(),
        },
        Div => {
            let y = args[1];
            match position {
                0 => y.invert(),
                _ => x.zip_map(y, |x, y| -x / (y * y)),
            }
        }
        Pow => {
            let y = args[1];
            match position {
                0 => x.zip_map(y, |x, y| y * x.powf(y - 1.0)),
                _ => VectorNumeric::scalar(0.0),
            }
        }
        Cap => {
            let y = args[1];
            match position {
                0 => x.zip_map(y, |x, y| indicator(x <= y)),
                _ => x.zip_map(y, |x, y| indicator(x > y)),
            }
        }
        Floor => {
            let y = args[1];
            match position {
                0 => x.zip_map(y, |x, y| indicator(x > y)),
                _ => x.zip_map(y, |x, y| indicator(x <= y)),
            }
        }

        AddProduct => match position {
            0 => one(),
            1 => args[2].clone(),
            _ => args[1].clone(),
        },
        AddRatio => {
            let (y, z) = (args[1], args[2]);
            match position {
                0 => one(),
                1 => z.invert(),
                _ => y.zip_map(z, |y, z| -y / (z * z)),
            }
        }
        SubRatio => {
            let (y, z) = (args[1], args[2]);
            match position {
                0 => one(),
                1 => z.map(|z| -1.0 / z),
                _ => y.zip_map(z, |y, z| y / (z * z)),
            }
        }
        Accrue => {
            let (y, z) = (args[1], args[2]);
            match position {
                0 => y.zip_map(z, |y, z| 1.0 + y * z),
                1 => x.mult(z),
                _ => x.mult(y),
            }
        }
        Discount => {
            let (y, z) = (args[1], args[2]);
            match position {
                0 => y.zip_map(z, |y, z| 1.0 / (1.0 + y * z)),
                1 => x.zip3_map(y, z, |x, y, z| {
                    let growth = 1.0 + y * z;
                    -x * z / (growth * growth)
                }),
                _ => x.zip3_map(y, z, |x, y, z| {
                    let growth = 1.0 + y * z;
                    -x * y / (growth * growth)
                }),
            }
        }
        // One-sided limit: the selected branch jumps where the trigger crosses zero.
        Barrier => match position {
            0 => x.map(|trigger| {
                if trigger == 0.0 {
                    f64::INFINITY
                } else {
                    0.0
                }
            }),
            1 => x.map(|trigger| indicator(trigger >= 0.0)),
            _ => x.map(|trigger| indicator(trigger < 0.0)),
        },
    }
}

#[inline]
fn one() -> VectorNumeric {
    VectorNumeric::scalar(1.0)
}

#[inline]
fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_add_ratio_partials_match_finite_difference() {
        let (x, y, z) = (1.5, 0.8, 2.5);
        let h = 1e-6;
        let f = |y: f64, z: f64| x + y / z;

        let args_owned = [
            VectorNumeric::scalar(x),
            VectorNumeric::scalar(y),
            VectorNumeric::scalar(z),
        ];
        let args: Vec<&VectorNumeric> = args_owned.iter().collect();
        let r = forward(OperatorKind::AddRatio, &args);

        let fd_y = (f(y + h, z) - f(y - h, z)) / (2.0 * h);
        let fd_z = (f(y, z + h) - f(y, z - h)) / (2.0 * h);

        assert_relative_eq!(
            partial(OperatorKind::AddRatio, 1, &args, &r).get(0),
            fd_y,
            epsilon = 1e-8
        );
        assert_relative_eq!(
            partial(OperatorKind::AddRatio, 2, &args, &r).get(0),
            fd_z,
            epsilon = 1e-8
        );
    }

    #[test]
    fn test_abs_partial_propagates_nan() {
        let x = VectorNumeric::scalar(f64::NAN);
        let r = forward(OperatorKind::Abs, &[&x]);
        assert!(partial(OperatorKind::Abs, 0, &[&x], &r).get(0).is_nan());
    }

    #[test]
    fn test_cap_partials_are_complementary() {
        let x = VectorNumeric::from_paths(vec![1.0, 3.0, 5.0]).unwrap();
        let y = VectorNumeric::scalar(3.0);
        let args = [&x, &y];
        let r = forward(OperatorKind::Cap, &args);
        let dx = partial(OperatorKind::Cap, 0, &args, &r);
        let dy = partial(OperatorKind::Cap, 1, &args, &r);
        for path in 0..3 {
            assert_eq!(dx.get(path) + dy.get(path), 1.0);
        }
        assert_eq!(dx.to_vec(), vec![1.0, 1.0, 0.0]);
    }
}
