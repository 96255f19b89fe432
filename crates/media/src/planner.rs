//! Byte budget to segment duration conversion.

use crate::error::{Error, Result};

/// Longest whole number of seconds whose audio, encoded at `bitrate_bps`,
/// fits in `size_budget_bytes`.
///
/// Computed as `floor(budget_bytes * 8 / bitrate_bps)` in 128-bit integers,
/// so for the returned `v`:
/// `v * bitrate / 8 <= budget` and `(v + 1) * bitrate / 8 > budget`.
///
/// Fails with [`Error::InvalidConfiguration`] for a zero bitrate and with
/// [`Error::BudgetTooSmall`] when not even one second fits. A zero result is
/// never clamped upward: one-second parts would still overflow the budget.
pub fn plan_segment_seconds(size_budget_bytes: u64, bitrate_bps: u64) -> Result<u64> {
    if bitrate_bps == 0 {
        return Err(Error::invalid_configuration("bitrate must be positive"));
    }

    let budget_bits = u128::from(size_budget_bytes) * 8;
    let seconds = budget_bits / u128::from(bitrate_bps);

    if seconds == 0 {
        return Err(Error::BudgetTooSmall {
            budget_bytes: size_budget_bytes,
            bitrate_bps,
        });
    }

    // budget_bits / 1 fits in u64 only when budget < 2^61; saturate past that.
    Ok(u64::try_from(seconds).unwrap_or(u64::MAX))
}
