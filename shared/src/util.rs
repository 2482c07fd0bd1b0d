use rust_decimal::{Decimal, RoundingStrategy};

/// Format a monetary amount with exactly two fractional digits
///
/// Rounds half away from zero: `6.5` → `"6.50"`, `1.005` → `"1.01"`.
pub fn format_money(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}
