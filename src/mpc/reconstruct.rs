//! Secret reconstruction from shares.
//!
//! This module implements Lagrange interpolation over GF(p) to reconstruct
//! the original secret from a threshold number of shares.
//!
//! # Security
//! - **Threshold**: Fewer than `t` shares are rejected before any arithmetic.
//! - **Validation**: Checks for zero and duplicate indices, value width and range.
//! - **Consistency**: `reconstruct_checked` only accepts a polynomial that
//!   enough of the redundant shares lie on, and reports the ones that do not.
//! - **Determinism**: The result depends on the share set only, not its order.

use core::fmt;

use num_bigint::BigUint;
use zeroize::Zeroizing;

use crate::core::field::to_width;
use crate::core::PrimeField;
use crate::mpc::polynomial::{interpolate_at, interpolate_at_zero};
use crate::mpc::{share::Share, MpcError};

/// Reconstructs the secret field element from a list of shares.
///
/// Uses Lagrange interpolation at x=0 to recover the polynomial intercept.
///
/// # Arguments
/// * `shares` - At least `t` shares with pairwise distinct indices.
/// * `t` - The threshold used at split time.
///
/// # Returns
/// * `Ok(BigUint)` - The reconstructed secret.
/// * `Err(MpcError)` - If inputs are invalid (too few, duplicates, bad values).
pub fn reconstruct_secret(field: &PrimeField, shares: &[Share], t: usize) -> Result<BigUint, MpcError> {
    let points = decode_points(field, shares, t)?;

    // Distinct non-zero indices below p keep every denominator invertible.
    interpolate_at_zero(field, &points).map_err(|_| MpcError::DuplicateShareIndex)
}

/// Upper bound on the `t`-subsets tried by `reconstruct_checked`.
pub const MAX_DECODE_ATTEMPTS: usize = 4096;

/// Outcome of `reconstruct_checked`.
pub struct Recovered {
    /// The secret, `width` bytes big-endian.
    pub secret: Zeroizing<Vec<u8>>,
    /// Indices of shares that do not lie on the recovered polynomial, ascending.
    pub rejected: Vec<u32>,
}

impl fmt::Debug for Recovered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovered")
            .field("secret", &"<redacted>")
            .field("rejected", &self.rejected)
            .finish()
    }
}

/// Reconstructs the secret, using the shares beyond `t` to detect and
/// exclude shares that were altered after the split.
///
/// With `n` shares, `t`-subsets are tried in index order. The polynomial
/// through a subset is accepted once at most `(n - t) / 2` of the other shares
/// disagree with it; at that bound no second polynomial can be accepted.
/// With exactly `t` shares there is nothing to cross-check and the single
/// polynomial is taken as is.
///
/// # Errors
/// * The `reconstruct_secret` input errors.
/// * `InconsistentShares` if no subset reaches the agreement bound within
///   `MAX_DECODE_ATTEMPTS` tries.
/// * `SecretOutOfRange` if the recovered value is wider than `width`, which
///   happens when the shares were not produced from one `width`-byte secret.
pub fn reconstruct_checked(
    field: &PrimeField,
    shares: &[Share],
    t: usize,
    width: usize,
) -> Result<Recovered, MpcError> {
    let mut indexed: Vec<(u32, (BigUint, BigUint))> = shares
        .iter()
        .map(|s| s.index)
        .zip(decode_points(field, shares, t)?)
        .collect();
    indexed.sort_by_key(|(index, _)| *index);
    let (indices, points): (Vec<u32>, Vec<(BigUint, BigUint)>) = indexed.into_iter().unzip();
    let n = points.len();
    let tolerated = (n - t) / 2;

    let mut subset: Vec<usize> = (0..t).collect();
    for _ in 0..MAX_DECODE_ATTEMPTS {
        let basis: Vec<(BigUint, BigUint)> = subset.iter().map(|&i| points[i].clone()).collect();
        let mut rejected = Vec::new();
        for (i, (x, y)) in points.iter().enumerate() {
            if subset.contains(&i) {
                continue;
            }
            let on_curve = interpolate_at(field, &basis, x).map_err(|_| MpcError::DuplicateShareIndex)?;
            if on_curve != *y {
                rejected.push(i);
                if rejected.len() > tolerated {
                    break;
                }
            }
        }

        if rejected.len() <= tolerated {
            let secret = interpolate_at_zero(field, &basis).map_err(|_| MpcError::DuplicateShareIndex)?;
            let secret = to_width(&secret, width)
                .map(Zeroizing::new)
                .map_err(|_| MpcError::SecretOutOfRange)?;
            let rejected = rejected.into_iter().map(|i| indices[i]).collect();
            return Ok(Recovered { secret, rejected });
        }
        if !next_subset(&mut subset, n) {
            break;
        }
    }
    Err(MpcError::InconsistentShares)
}

/// Checks the share set and decodes it into `(index, value)` points.
fn decode_points(field: &PrimeField, shares: &[Share], t: usize) -> Result<Vec<(BigUint, BigUint)>, MpcError> {
    if t < 1 {
        return Err(MpcError::InvalidThreshold);
    }
    if shares.len() < t {
        return Err(MpcError::InsufficientShares);
    }

    // O(N^2) duplicate scan; N is the number of live peers.
    for (i, share) in shares.iter().enumerate() {
        if share.index == 0 {
            return Err(MpcError::InvalidShareIndex);
        }
        if shares[i + 1..].iter().any(|other| other.index == share.index) {
            return Err(MpcError::DuplicateShareIndex);
        }
    }

    let mut points = Vec::with_capacity(shares.len());
    for share in shares {
        points.push((BigUint::from(share.index), share.element(field)?));
    }
    Ok(points)
}

/// Advances `subset` to the next ascending combination of `0..n`.
/// Returns `false` after the last one.
fn next_subset(subset: &mut [usize], n: usize) -> bool {
    let k = subset.len();
    for i in (0..k).rev() {
        if subset[i] < n - k + i {
            subset[i] += 1;
            for j in i + 1..k {
                subset[j] = subset[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PRIME_LEN;
    use crate::entropy::{EntropyError, EntropySource};
    use crate::mpc::quorum::split_secret;

    struct MockEntropy {
        fill_val: u8,
    }

    impl EntropySource for MockEntropy {
        fn name(&self) -> &'static str { "Mock" }
        fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
            for b in dest.iter_mut() {
                *b = self.fill_val;
                self.fill_val = self.fill_val.wrapping_add(1);
            }
            Ok(())
        }
    }

    fn secret_bytes() -> Vec<u8> {
        (0u8..32).map(|i| i.wrapping_mul(37).wrapping_add(11)).collect()
    }

    /// All `k`-element subsets of `0..n`.
    fn subsets(n: usize, k: usize) -> Vec<Vec<usize>> {
        fn walk(start: usize, n: usize, k: usize, cur: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
            if cur.len() == k {
                out.push(cur.clone());
                return;
            }
            for i in start..n {
                cur.push(i);
                walk(i + 1, n, k, cur, out);
                cur.pop();
            }
        }
        let mut out = Vec::new();
        walk(0, n, k, &mut Vec::new(), &mut out);
        out
    }

    #[test]
    fn test_reconstruct_every_threshold_subset() {
        let field = PrimeField::default_prime();
        let mut rng = MockEntropy { fill_val: 0x10 };
        let secret = secret_bytes();
        let (t, n) = (3, 6);

        let shares = split_secret(&field, &secret, t, n, &mut rng).unwrap();

        for subset in subsets(n, t) {
            let picked: Vec<Share> = subset.iter().map(|&i| shares[i].clone()).collect();
            let recovered = reconstruct_checked(&field, &picked, t, 32).unwrap().secret;
            assert_eq!(recovered.as_slice(), secret.as_slice(), "subset {:?}", subset);
        }

        // All shares also work.
        let recovered = reconstruct_checked(&field, &shares, t, 32).unwrap().secret;
        assert_eq!(recovered.as_slice(), secret.as_slice());
    }

    #[test]
    fn test_below_threshold_is_refused() {
        let field = PrimeField::default_prime();
        let mut rng = MockEntropy { fill_val: 0x33 };
        let secret = secret_bytes();
        let t = 4;

        let shares = split_secret(&field, &secret, t, 6, &mut rng).unwrap();
        assert_eq!(
            reconstruct_secret(&field, &shares[..t - 1], t),
            Err(MpcError::InsufficientShares)
        );
    }

    #[test]
    fn test_below_threshold_interpolation_does_not_leak() {
        let field = PrimeField::default_prime();
        let mut rng = MockEntropy { fill_val: 0x51 };
        let secret = secret_bytes();
        let t = 3;

        let shares = split_secret(&field, &secret, t, 5, &mut rng).unwrap();
        let expected = BigUint::from_bytes_be(&secret);

        // Forcing interpolation through t-1 points lands on a different
        // polynomial; its intercept is not the secret.
        for subset in subsets(5, t - 1) {
            let points: Vec<(BigUint, BigUint)> = subset
                .iter()
                .map(|&i| (BigUint::from(shares[i].index), shares[i].element(&field).unwrap()))
                .collect();
            let guess = interpolate_at_zero(&field, &points).unwrap();
            assert_ne!(guess, expected, "subset {:?}", subset);
        }
    }

    #[test]
    fn test_order_independence() {
        let field = PrimeField::default_prime();
        let mut rng = MockEntropy { fill_val: 0x77 };
        let secret = secret_bytes();

        let shares = split_secret(&field, &secret, 3, 5, &mut rng).unwrap();
        let forward = reconstruct_secret(&field, &shares, 3).unwrap();

        let mut reversed = shares.clone();
        reversed.reverse();
        assert_eq!(reconstruct_secret(&field, &reversed, 3).unwrap(), forward);

        let shuffled = vec![
            shares[3].clone(),
            shares[0].clone(),
            shares[4].clone(),
            shares[2].clone(),
            shares[1].clone(),
        ];
        assert_eq!(reconstruct_secret(&field, &shuffled, 3).unwrap(), forward);
    }

    #[test]
    fn test_reconstruct_errors() {
        let field = PrimeField::default_prime();
        let mut good = vec![0u8; PRIME_LEN];
        good[PRIME_LEN - 1] = 1;

        let share1 = Share::new(1, good.clone()).unwrap();
        let share2 = Share::new(2, vec![3]).unwrap(); // Wrong width
        let share3 = Share::new(1, good.clone()).unwrap(); // Duplicate index
        let share4 = Share::new(3, vec![0xFF; PRIME_LEN]).unwrap(); // >= p

        assert_eq!(
            reconstruct_secret(&field, &[share1.clone(), share2], 2),
            Err(MpcError::ShareLengthMismatch)
        );
        assert_eq!(
            reconstruct_secret(&field, &[share1.clone(), share3], 2),
            Err(MpcError::DuplicateShareIndex)
        );
        assert_eq!(
            reconstruct_secret(&field, &[share1.clone(), share4], 2),
            Err(MpcError::ValueOutOfRange)
        );
        assert_eq!(reconstruct_secret(&field, &[], 1), Err(MpcError::InsufficientShares));
        assert_eq!(reconstruct_secret(&field, &[share1], 0), Err(MpcError::InvalidThreshold));
    }

    #[test]
    fn test_secret_width_check() {
        let field = PrimeField::default_prime();
        let mut rng = MockEntropy { fill_val: 0x02 };
        // 33-byte secret below p, recovered into a 32-byte slot.
        let mut wide = vec![0x01u8; PRIME_LEN];
        wide[0] = 0x00;
        wide[1] = 0x7F;
        let shares = split_secret(&field, &wide, 2, 3, &mut rng).unwrap();
        assert_eq!(
            reconstruct_checked(&field, &shares, 2, 8).unwrap_err(),
            MpcError::SecretOutOfRange
        );
        let recovered = reconstruct_checked(&field, &shares, 2, PRIME_LEN).unwrap().secret;
        assert_eq!(recovered.as_slice(), wide.as_slice());
    }

    /// Flips the last bit of a share value; the result stays a field element.
    fn tamper(share: &Share) -> Share {
        let mut value = share.value.clone();
        value[PRIME_LEN - 1] ^= 1;
        Share::new(share.index, value).unwrap()
    }

    #[test]
    fn test_altered_shares_are_excluded() {
        let field = PrimeField::default_prime();
        let mut rng = MockEntropy { fill_val: 0x21 };
        let secret = secret_bytes();
        let (t, n) = (3, 7);
        let shares = split_secret(&field, &secret, t, n, &mut rng).unwrap();

        // Plain interpolation is silently wrong.
        let mut one_bad = shares.clone();
        one_bad[1] = tamper(&shares[1]);
        assert_ne!(
            reconstruct_secret(&field, &one_bad, t).unwrap(),
            BigUint::from_bytes_be(&secret)
        );

        let recovered = reconstruct_checked(&field, &one_bad, t, 32).unwrap();
        assert_eq!(recovered.secret.as_slice(), secret.as_slice());
        assert_eq!(recovered.rejected, vec![2]);

        // (7 - 3) / 2 = 2 altered shares are still tolerated, in any position.
        let mut two_bad = shares.clone();
        two_bad[0] = tamper(&shares[0]);
        two_bad[6] = tamper(&shares[6]);
        two_bad.reverse();
        let recovered = reconstruct_checked(&field, &two_bad, t, 32).unwrap();
        assert_eq!(recovered.secret.as_slice(), secret.as_slice());
        assert_eq!(recovered.rejected, vec![1, 7]);
    }

    #[test]
    fn test_too_many_altered_shares_fail() {
        let field = PrimeField::default_prime();
        let mut rng = MockEntropy { fill_val: 0x44 };
        let secret = secret_bytes();
        let shares = split_secret(&field, &secret, 3, 7, &mut rng).unwrap();

        let mut bad = shares.clone();
        for i in [0, 3, 5] {
            bad[i] = tamper(&shares[i]);
        }
        assert_eq!(
            reconstruct_checked(&field, &bad, 3, 32).unwrap_err(),
            MpcError::InconsistentShares
        );

        // One spare share detects an alteration but cannot locate it.
        let mut detect_only = shares[..4].to_vec();
        detect_only[2] = tamper(&shares[2]);
        assert_eq!(
            reconstruct_checked(&field, &detect_only, 3, 32).unwrap_err(),
            MpcError::InconsistentShares
        );

        // Exactly t shares are taken as they are.
        let recovered = reconstruct_checked(&field, &shares[..3], 3, 32).unwrap();
        assert_eq!(recovered.secret.as_slice(), secret.as_slice());
        assert!(recovered.rejected.is_empty());
    }

    #[test]
    fn test_next_subset_walks_all_combinations() {
        let mut subset = vec![0, 1];
        let mut seen = vec![subset.clone()];
        while next_subset(&mut subset, 4) {
            seen.push(subset.clone());
        }
        assert_eq!(seen, subsets(4, 2));
    }
}
