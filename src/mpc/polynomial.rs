//! Polynomial operations for MPC.
//!
//! Shared by `quorum` (share generation) and `reconstruct` (interpolation).

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::core::{FieldError, PrimeField};

/// Evaluates a polynomial at a given point x using Horner's method.
///
/// f(x) = c[0] + c[1]*x + ... + c[t-1]*x^(t-1)  (mod p)
pub(crate) fn evaluate_polynomial(field: &PrimeField, coeffs: &[BigUint], x: &BigUint) -> BigUint {
    let mut result = BigUint::zero();
    for coeff in coeffs.iter().rev() {
        result = field.add(&field.mul(&result, x), coeff);
    }
    result
}

/// Lagrange interpolation of the points `(x_j, y_j)`, evaluated at `x`.
///
/// lambda_j = prod_{m != j} (x - x_m) / (x_j - x_m)
/// f(x)     = sum_j y_j * lambda_j
///
/// Callers guarantee distinct x coordinates.
pub(crate) fn interpolate_at(
    field: &PrimeField,
    points: &[(BigUint, BigUint)],
    x: &BigUint,
) -> Result<BigUint, FieldError> {
    let mut value = BigUint::zero();
    for (j, (xj, yj)) in points.iter().enumerate() {
        let mut numerator = BigUint::one();
        let mut denominator = BigUint::one();
        for (m, (xm, _)) in points.iter().enumerate() {
            if m == j {
                continue;
            }
            numerator = field.mul(&numerator, &field.sub(x, xm));
            denominator = field.mul(&denominator, &field.sub(xj, xm));
        }
        let lambda = field.mul(&numerator, &field.inv(&denominator)?);
        value = field.add(&value, &field.mul(yj, &lambda));
    }
    Ok(value)
}

/// Polynomial intercept `f(0)`; this is where the secret sits.
pub(crate) fn interpolate_at_zero(
    field: &PrimeField,
    points: &[(BigUint, BigUint)],
) -> Result<BigUint, FieldError> {
    interpolate_at(field, points, &BigUint::zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_polynomial_eval() {
        let field = PrimeField::default_prime();
        // f(x) = 1 + 2x + 3x^2
        let coeffs = vec![big(1), big(2), big(3)];
        assert_eq!(evaluate_polynomial(&field, &coeffs, &big(0)), big(1));
        assert_eq!(evaluate_polynomial(&field, &coeffs, &big(1)), big(6));
        assert_eq!(evaluate_polynomial(&field, &coeffs, &big(2)), big(17));
        assert_eq!(evaluate_polynomial(&field, &[], &big(5)), big(0));
    }

    #[test]
    fn test_interpolate_line() {
        let field = PrimeField::default_prime();
        // f(x) = 7 + 4x: (1, 11), (3, 19)
        let points = vec![(big(1), big(11)), (big(3), big(19))];
        assert_eq!(interpolate_at_zero(&field, &points).unwrap(), big(7));
    }

    #[test]
    fn test_interpolate_off_zero() {
        let field = PrimeField::default_prime();
        // f(x) = 1 + 2x + 3x^2 through x = 1, 2, 3; f(5) = 86.
        let coeffs = vec![big(1), big(2), big(3)];
        let points: Vec<_> = (1..=3)
            .map(|x| (big(x), evaluate_polynomial(&field, &coeffs, &big(x))))
            .collect();
        assert_eq!(interpolate_at(&field, &points, &big(5)).unwrap(), big(86));
        assert_eq!(interpolate_at(&field, &points, &big(2)).unwrap(), big(17));
    }

    #[test]
    fn test_interpolate_duplicate_x_fails() {
        let field = PrimeField::default_prime();
        let points = vec![(big(2), big(11)), (big(2), big(19))];
        assert_eq!(
            interpolate_at_zero(&field, &points),
            Err(FieldError::NotInvertible)
        );
    }
}
