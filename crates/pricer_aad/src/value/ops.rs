//! `std::ops` overloads for [`DifferentiableValue`].
//!
//! `f64` operands are recorded as constant leaves on the tape of the
//! differentiable operand.

use std::ops::{Add, Div, Mul, Neg, Sub};

use pricer_core::numeric::RandomVariable;

use super::DifferentiableValue;

macro_rules! impl_binary_operator {
    ($trait:ident, $method:ident, $op:ident) => {
        impl $trait<&DifferentiableValue> for &DifferentiableValue {
            type Output = DifferentiableValue;

            fn $method(self, rhs: &DifferentiableValue) -> DifferentiableValue {
                RandomVariable::$op(self, rhs)
            }
        }

        impl $trait<DifferentiableValue> for DifferentiableValue {
            type Output = DifferentiableValue;

            fn $method(self, rhs: DifferentiableValue) -> DifferentiableValue {
                RandomVariable::$op(&self, &rhs)
            }
        }

        impl $trait<&DifferentiableValue> for DifferentiableValue {
            type Output = DifferentiableValue;

            fn $method(self, rhs: &DifferentiableValue) -> DifferentiableValue {
                RandomVariable::$op(&self, rhs)
            }
        }

        impl $trait<DifferentiableValue> for &DifferentiableValue {
            type Output = DifferentiableValue;

            fn $method(self, rhs: DifferentiableValue) -> DifferentiableValue {
                RandomVariable::$op(self, &rhs)
            }
        }

        impl $trait<f64> for &DifferentiableValue {
            type Output = DifferentiableValue;

            fn $method(self, rhs: f64) -> DifferentiableValue {
                RandomVariable::$op(self, &self.constant_like(rhs))
            }
        }

        impl $trait<f64> for DifferentiableValue {
            type Output = DifferentiableValue;

            fn $method(self, rhs: f64) -> DifferentiableValue {
                RandomVariable::$op(&self, &self.constant_like(rhs))
            }
        }

        impl $trait<&DifferentiableValue> for f64 {
            type Output = DifferentiableValue;

            fn $method(self, rhs: &DifferentiableValue) -> DifferentiableValue {
                RandomVariable::$op(&rhs.constant_like(self), rhs)
            }
        }
    };
}

impl_binary_operator!(Add, add, add);
impl_binary_operator!(Sub, sub, sub);
impl_binary_operator!(Mul, mul, mult);
impl_binary_operator!(Div, div, div);

impl Neg for &DifferentiableValue {
    type Output = DifferentiableValue;

    fn neg(self) -> DifferentiableValue {
        self.mult_scalar(-1.0)
    }
}

impl Neg for DifferentiableValue {
    type Output = DifferentiableValue;

    fn neg(self) -> DifferentiableValue {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use crate::Tape;
    use approx::assert_relative_eq;

    #[test]
    fn test_operator_overloads() {
        let tape = Tape::new();
        let x = tape.variable(3.0);
        let y = tape.variable(2.0);

        let f = (&x * &y - 1.0) / &y + (10.0 - &x) * 2.0;
        assert_relative_eq!(f.value_as_scalar().unwrap(), 5.0 / 2.0 + 14.0);

        let grad = f.gradient();
        assert_relative_eq!(grad.expectation(&x), 1.0 - 2.0);
        // d/dy (xy - 1)/y = 1/y²
        assert_relative_eq!(grad.expectation(&y), 0.25);
    }

    #[test]
    fn test_negation() {
        let tape = Tape::new();
        let x = tape.variable(3.0);
        let f = -&x;
        assert_eq!(f.value_as_scalar(), Some(-3.0));
        assert_eq!(f.gradient().expectation(&x), -1.0);
    }
}
