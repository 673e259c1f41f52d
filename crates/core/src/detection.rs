//! Alert decision functions.
//!
//! Both detectors are pure: they look at prices only and leave key
//! derivation and de-duplication to the caller.

use crate::events::PriceObservation;
use rust_decimal::Decimal;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Decides whether a threshold crossing alert fires.
///
/// Edge-triggered: with a previous price the alert fires only when the price
/// moves from below the threshold to at-or-above it. With no previous price
/// (first observation for the symbol) a price already at or above the
/// threshold fires, so a symbol that starts above the line is still reported.
#[must_use]
pub fn detect_crossing(
    current_price: Decimal,
    previous_price: Option<Decimal>,
    threshold: Option<Decimal>,
) -> bool {
    let Some(threshold) = threshold else {
        return false;
    };

    match previous_price {
        None => current_price >= threshold,
        Some(previous) => previous < threshold && threshold <= current_price,
    }
}

/// Decides whether a percentage jump alert fires.
///
/// Only rises count. Disabled when `jump_pct` is zero or negative, or when
/// the baseline is not a positive price. A rise too large to represent as a
/// percentage fires.
#[must_use]
pub fn detect_jump(old_price: Decimal, new_price: Decimal, jump_pct: Decimal) -> bool {
    if jump_pct <= Decimal::ZERO || old_price <= Decimal::ZERO || new_price <= old_price {
        return false;
    }

    new_price
        .checked_sub(old_price)
        .and_then(|rise| rise.checked_div(old_price))
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .map_or(true, |change_pct| change_pct >= jump_pct)
}

/// Previous price for the crossing detector, given the two most recent
/// stored observations (oldest first, current observation last).
#[must_use]
pub fn previous_price(recent: &[PriceObservation]) -> Option<Decimal> {
    match recent {
        [previous, _current] => Some(previous.price),
        _ => None,
    }
}

/// Baseline for the jump detector: the oldest observation of the window.
///
/// The window must hold at least two observations (baseline plus current);
/// with less history the detector cannot fire.
#[must_use]
pub fn jump_baseline(window: &[PriceObservation]) -> Option<Decimal> {
    if window.len() < 2 {
        return None;
    }
    window.first().map(|obs| obs.price)
}
