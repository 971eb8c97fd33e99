//! `std::ops` overloads for [`VectorNumeric`].

use std::ops::{Add, Div, Mul, Neg, Sub};

use super::traits::RandomVariable;
use super::vector::VectorNumeric;

macro_rules! impl_binary_operator {
    ($trait:ident, $method:ident, $op:ident) => {
        impl $trait<&VectorNumeric> for &VectorNumeric {
            type Output = VectorNumeric;

            fn $method(self, rhs: &VectorNumeric) -> VectorNumeric {
                RandomVariable::$op(self, rhs)
            }
        }

        impl $trait<VectorNumeric> for VectorNumeric {
            type Output = VectorNumeric;

            fn $method(self, rhs: VectorNumeric) -> VectorNumeric {
                RandomVariable::$op(&self, &rhs)
            }
        }

        impl $trait<f64> for &VectorNumeric {
            type Output = VectorNumeric;

            fn $method(self, rhs: f64) -> VectorNumeric {
                RandomVariable::$op(self, &VectorNumeric::scalar(rhs))
            }
        }

        impl $trait<f64> for VectorNumeric {
            type Output = VectorNumeric;

            fn $method(self, rhs: f64) -> VectorNumeric {
                RandomVariable::$op(&self, &VectorNumeric::scalar(rhs))
            }
        }
    };
}

impl_binary_operator!(Add, add, add);
impl_binary_operator!(Sub, sub, sub);
impl_binary_operator!(Mul, mul, mult);
impl_binary_operator!(Div, div, div);

impl Neg for &VectorNumeric {
    type Output = VectorNumeric;

    fn neg(self) -> VectorNumeric {
        self.map(|x| -x)
    }
}

impl Neg for VectorNumeric {
    type Output = VectorNumeric;

    fn neg(self) -> VectorNumeric {
        self.map(|x| -x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_overloads() {
        let x = VectorNumeric::from_paths(vec![1.0, 2.0]).unwrap();
        let y = VectorNumeric::scalar(4.0);

        assert_eq!((&x + &y).to_vec(), vec![5.0, 6.0]);
        assert_eq!((&x - 1.0).to_vec(), vec![0.0, 1.0]);
        assert_eq!((&x * &y).to_vec(), vec![4.0, 8.0]);
        assert_eq!((x.clone() / 2.0).to_vec(), vec![0.5, 1.0]);
        assert_eq!((-x).to_vec(), vec![-1.0, -2.0]);
    }
}
