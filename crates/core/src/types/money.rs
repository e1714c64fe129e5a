//! Decimal money helpers.
//!
//! Prices are `rust_decimal::Decimal` in the store currency's standard unit
//! and are persisted as `NUMERIC(12,2)`. Totals are computed from line prices
//! captured at order time, never re-read from the catalog.

use rust_decimal::Decimal;

/// Largest quantity one cart or order line may hold.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

/// Largest amount a `NUMERIC(12,2)` column stores: `9_999_999_999.99`.
#[must_use]
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Whether `amount` can be persisted as a price or order total.
#[must_use]
pub fn fits_amount(amount: Decimal) -> bool {
    amount.round_dp(2) <= max_amount()
}

/// Whether `quantity` is a valid line quantity.
#[must_use]
pub const fn valid_line_quantity(quantity: i32) -> bool {
    quantity > 0 && quantity <= MAX_LINE_QUANTITY
}

/// Price of one line: `unit_price * quantity`.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Sum of `unit_price * quantity` over all lines, rounded to cents.
#[must_use]
pub fn order_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines
        .into_iter()
        .map(|(price, quantity)| line_total(price, quantity))
        .sum::<Decimal>()
        .round_dp(2)
}
