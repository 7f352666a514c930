//! Monetary amounts are `i64` minor units (centimes). `2_000_000` is 20 000.00.

pub type Cents = i64;

/// VAT applied to the discounted subtotal.
pub const VAT_PERCENT: i64 = 20;

/// Largest single cash payment accepted on an order.
pub const CASH_PAYMENT_CEILING: Cents = 2_000_000;

/// `amount × percent / 100`, rounded half-up to the nearest minor unit.
pub fn percent_of(amount: Cents, percent: i64) -> Cents {
    let scaled = i128::from(amount) * i128::from(percent);
    let rounded = if scaled >= 0 {
        (scaled + 50) / 100
    } else {
        (scaled - 50) / 100
    };
    rounded as Cents
}

pub fn vat_on(amount_after_discount: Cents) -> Cents {
    percent_of(amount_after_discount, VAT_PERCENT)
}
