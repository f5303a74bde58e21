//! Normalization of purchase amounts to whole cents.
//!
//! Amounts are rounded half-up (midpoint away from zero) to two decimal
//! places before they are persisted or displayed, so 19.995 becomes 20.00.

use rust_decimal::{Decimal, RoundingStrategy};

/// The number of decimal places kept for currency amounts.
pub const CURRENCY_DECIMAL_PLACES: u32 = 2;

/// Round `amount` half-up to exactly two decimal places.
///
/// The result always has a scale of two, so `12.5` becomes `12.50`. Applying
/// the function to its own output returns the same value.
pub fn normalize_amount(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(
        CURRENCY_DECIMAL_PLACES,
        RoundingStrategy::MidpointAwayFromZero,
    );
    rounded.rescale(CURRENCY_DECIMAL_PLACES);
    rounded
}
