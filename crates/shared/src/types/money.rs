//! Monetary amount checks.

use rust_decimal::Decimal;

/// Decimal places stored for every amount.
pub const MONEY_SCALE: u32 = 2;

/// Returns true if `amount` is a whole number of cents.
///
/// Trailing zeros do not count: `"1.50"` and `"1.500"` are both accepted,
/// `"1.505"` is not.
#[must_use]
pub fn is_whole_cents(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}
