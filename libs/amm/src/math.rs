//! Constant-product liquidity math with checked integer arithmetic
//!
//! All intermediate products are computed in `u128` so `u64 * u64` never
//! overflows; results are narrowed back to `u64` with an explicit check.
//! Division truncates toward zero, which always rounds in the pool's favor:
//! depositors receive at most their exact share and contribute at least the
//! ratio-implied amount.

use crate::error::{AmmError, AmmResult};
use rust_decimal::Decimal;

/// Floor square root using Newton's method
pub fn isqrt(value: u128) -> u128 {
    if value < 2 {
        return value;
    }

    // Start from a power of two at or above the root so the sequence decreases
    let bits = 128 - value.leading_zeros();
    let mut x = 1u128 << ((bits + 1) / 2);
    loop {
        let next = (x + value / x) >> 1;
        if next >= x {
            return x;
        }
        x = next;
    }
}

/// `a * b / denominator` in `u128`, truncated
pub fn mul_div(a: u64, b: u64, denominator: u64) -> AmmResult<u64> {
    if denominator == 0 {
        return Err(AmmError::InvariantViolation {
            reason: "division by an empty reserve".to_string(),
        });
    }
    let result = (a as u128) * (b as u128) / (denominator as u128);
    u64::try_from(result).map_err(|_| AmmError::overflow("mul_div"))
}

/// LP shares minted by the first deposit: `floor(sqrt(amount_a * amount_b))`.
///
/// The geometric mean makes share value independent of the unit scale of
/// either token, so a skewed first deposit cannot inflate its own shares.
pub fn initial_shares(amount_a: u64, amount_b: u64) -> AmmResult<u64> {
    if amount_a == 0 || amount_b == 0 {
        return Err(AmmError::ZeroAmount);
    }
    let product = (amount_a as u128) * (amount_b as u128);
    u64::try_from(isqrt(product)).map_err(|_| AmmError::overflow("initial_shares"))
}

/// Counterpart amount at the current price: `amount * reserve_out / reserve_in`
pub fn quote(amount: u64, reserve_in: u64, reserve_out: u64) -> AmmResult<u64> {
    if amount == 0 {
        return Err(AmmError::ZeroAmount);
    }
    mul_div(amount, reserve_out, reserve_in)
}

/// Accepted amounts and shares for a deposit into a live pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositPlan {
    pub amount_a: u64,
    pub amount_b: u64,
    pub shares: u64,
}

/// Fit the caller's maximums to the pool ratio and price the deposit in shares.
///
/// One side is always taken in full; the other is the ratio-implied amount,
/// which never exceeds the caller's maximum for that side.
pub fn plan_deposit(
    reserve_a: u64,
    reserve_b: u64,
    lp_supply: u64,
    desired_a: u64,
    desired_b: u64,
) -> AmmResult<DepositPlan> {
    if desired_a == 0 || desired_b == 0 {
        return Err(AmmError::ZeroAmount);
    }
    if reserve_a == 0 || reserve_b == 0 || lp_supply == 0 {
        return Err(AmmError::InvariantViolation {
            reason: format!(
                "live pool with reserves {}/{} and supply {}",
                reserve_a, reserve_b, lp_supply
            ),
        });
    }

    let optimal_b = mul_div(desired_a, reserve_b, reserve_a)?;
    let (amount_a, amount_b) = if optimal_b <= desired_b {
        if optimal_b == 0 {
            return Err(AmmError::SlippageExceeded {
                reason: "token B side rounds to zero",
            });
        }
        (desired_a, optimal_b)
    } else {
        let optimal_a = mul_div(desired_b, reserve_a, reserve_b)?;
        if optimal_a == 0 {
            return Err(AmmError::SlippageExceeded {
                reason: "token A side rounds to zero",
            });
        }
        (optimal_a, desired_b)
    };

    let shares = cross_checked_shares(lp_supply, reserve_a, reserve_b, amount_a, amount_b)?;
    if shares == 0 {
        return Err(AmmError::SlippageExceeded {
            reason: "deposit too small to mint a share",
        });
    }

    Ok(DepositPlan {
        amount_a,
        amount_b,
        shares,
    })
}

/// Shares priced from each side independently. The two must agree within one
/// unit of truncation; the smaller is minted.
fn cross_checked_shares(
    lp_supply: u64,
    reserve_a: u64,
    reserve_b: u64,
    amount_a: u64,
    amount_b: u64,
) -> AmmResult<u64> {
    let shares_a = mul_div(lp_supply, amount_a, reserve_a)?;
    let shares_b = mul_div(lp_supply, amount_b, reserve_b)?;
    if shares_a.abs_diff(shares_b) > 1 {
        return Err(AmmError::InvariantViolation {
            reason: format!(
                "deposit {}/{} prices to {}/{} shares against reserves {}/{}",
                amount_a, amount_b, shares_a, shares_b, reserve_a, reserve_b
            ),
        });
    }
    Ok(shares_a.min(shares_b))
}

/// Token B per token A, `None` for an empty pool
pub fn spot_price(reserve_a: u64, reserve_b: u64) -> Option<Decimal> {
    if reserve_a == 0 {
        return None;
    }
    Decimal::from(reserve_b).checked_div(Decimal::from(reserve_a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_isqrt_exact_and_floor() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(u64::MAX as u128 * u64::MAX as u128), u64::MAX as u128);
        assert_eq!(isqrt(u128::MAX), u64::MAX as u128);
    }

    #[test]
    fn test_bootstrap_shares() {
        assert_eq!(initial_shares(100_000_000, 200_000_000).unwrap(), 141_421_356);
        assert_eq!(initial_shares(u64::MAX, u64::MAX).unwrap(), u64::MAX);
        assert_eq!(initial_shares(0, 5), Err(AmmError::ZeroAmount));
    }

    #[test]
    fn test_doubling_deposit_doubles_supply() {
        let supply = initial_shares(1_000_000_000, 2_000_000_000).unwrap();
        let plan = plan_deposit(
            1_000_000_000,
            2_000_000_000,
            supply,
            1_000_000_000,
            2_000_000_000,
        )
        .unwrap();
        assert_eq!(plan.amount_a, 1_000_000_000);
        assert_eq!(plan.amount_b, 2_000_000_000);
        assert_eq!(plan.shares, supply);
    }

    #[test]
    fn test_excess_side_is_trimmed() {
        // Caller offers too much B: A is taken in full
        let plan = plan_deposit(1_000, 2_000, 1_414, 100, 500).unwrap();
        assert_eq!((plan.amount_a, plan.amount_b), (100, 200));

        // Caller offers too much A: B is taken in full
        let plan = plan_deposit(1_000, 2_000, 1_414, 500, 200).unwrap();
        assert_eq!((plan.amount_a, plan.amount_b), (100, 200));
        assert_eq!(plan.shares, 141);
    }

    #[test]
    fn test_rounding_to_zero_is_slippage() {
        // 1 unit of A is worth less than 1 unit of B
        let err = plan_deposit(1_000_000, 10, 3_162, 1, 1).unwrap_err();
        assert!(matches!(err, AmmError::SlippageExceeded { .. }));
    }

    #[test]
    fn test_share_sides_must_agree() {
        // 1 A is taken against 200_000 B: A prices to 377 shares, B to 529
        let err = plan_deposit(7, 1_000_000, 2_645, 1_000_000, 200_000).unwrap_err();
        assert!(matches!(err, AmmError::InvariantViolation { .. }));
        assert!(!err.is_retryable());

        // Sides price to 15 and 16 shares; one unit of truncation is tolerated
        let plan = plan_deposit(1_000, 3_000, 1_732, 10, 29).unwrap();
        assert_eq!((plan.amount_a, plan.amount_b), (9, 29));
        assert_eq!(plan.shares, 15);
    }

    #[test]
    fn test_deposit_into_empty_reserve_is_invariant_violation() {
        let err = plan_deposit(0, 10, 10, 1, 1).unwrap_err();
        assert!(matches!(err, AmmError::InvariantViolation { .. }));
    }

    #[test]
    fn test_quote_and_price() {
        assert_eq!(quote(100, 1_000, 2_000).unwrap(), 200);
        assert_eq!(quote(0, 1_000, 2_000), Err(AmmError::ZeroAmount));
        assert_eq!(spot_price(1_000, 2_500), Some(dec!(2.5)));
        assert_eq!(spot_price(0, 2_500), None);
    }

    #[test]
    fn test_mul_div_overflow() {
        let err = mul_div(u64::MAX, u64::MAX, 1).unwrap_err();
        assert!(matches!(err, AmmError::ArithmeticOverflow { .. }));
    }
}
