//! Early-bonus weights and token shares.
//!
//! ```text
//!   weight_bps
//!   15_000 ┤●
//!          │  ●
//!          │     ●
//!   10_000 ┤        ●──────
//!          └──┬─────┬──────▶ t
//!           start  end
//! ```
//!
//! `weight_bps(t) = 10_000 + 5_000 * (end - t) / (end - start)` with `t`
//! clamped to the window. Each participant's share of the supply is
//! `supply * amount * weight / Σ(amount_i * weight_i)`, floored, so the
//! shares never sum above the supply.

use crate::error::{Result, VestigeError};

/// 1.0x
pub const BASE_WEIGHT_BPS: u64 = 10_000;
/// Extra weight at the very start of the window (0.5x).
pub const EARLY_BONUS_BPS: u64 = 5_000;

pub fn weight_bps(start_time: i64, end_time: i64, commit_time: i64) -> u64 {
    if end_time <= start_time {
        return BASE_WEIGHT_BPS;
    }
    let t = commit_time.clamp(start_time, end_time);
    let remaining = (end_time - t) as u128;
    let window = (end_time - start_time) as u128;
    BASE_WEIGHT_BPS + (EARLY_BONUS_BPS as u128 * remaining / window) as u64
}

pub fn weighted_amount(amount: u64, weight_bps: u64) -> u128 {
    amount as u128 * weight_bps as u128
}

/// Tokens owed for `weighted` out of `total_weighted`.
pub fn tokens_for(token_supply: u64, weighted: u128, total_weighted: u128) -> Result<u64> {
    if total_weighted == 0 || weighted > total_weighted {
        return Err(VestigeError::ArithmeticOverflow);
    }
    Ok(mul_div_floor(token_supply, weighted, total_weighted))
}

/// `floor(a * b / c)` for `b <= c`, exact without a wider integer type.
fn mul_div_floor(a: u64, b: u128, c: u128) -> u64 {
    if b == c {
        return a;
    }
    // Invariant: q * c + rem == (bits of a consumed so far) * b, rem < c.
    let mut q: u64 = 0;
    let mut rem: u128 = 0;
    for bit in (0..64).rev() {
        q <<= 1;
        if rem >= c - rem {
            rem -= c - rem;
            q += 1;
        } else {
            rem += rem;
        }
        if (a >> bit) & 1 == 1 {
            if rem >= c - b {
                rem -= c - b;
                q += 1;
            } else {
                rem += b;
            }
        }
    }
    q
}
