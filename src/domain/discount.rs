use super::loyalty::LoyaltyTier;
use super::money::{Cents, percent_of};

pub const PROMO_PREFIX: &str = "PROMO-";
pub const PROMO_PERCENT: i64 = 5;

/// Tier percentage, granted only once the subtotal reaches the tier's floor.
pub fn tier_percent(tier: LoyaltyTier, subtotal: Cents) -> i64 {
    match tier {
        LoyaltyTier::Silver if subtotal >= 50_000 => 5,
        LoyaltyTier::Gold if subtotal >= 80_000 => 10,
        LoyaltyTier::Platinum if subtotal >= 120_000 => 15,
        _ => 0,
    }
}

pub fn promo_percent(promo_code: Option<&str>) -> i64 {
    match promo_code {
        Some(code) if code.starts_with(PROMO_PREFIX) => PROMO_PERCENT,
        _ => 0,
    }
}

/// Discount for a subtotal. The promo bonus stacks on the tier percentage
/// whether or not the tier floor was reached. No cap is applied.
pub fn discount_for(tier: LoyaltyTier, subtotal: Cents, promo_code: Option<&str>) -> Cents {
    let percent = tier_percent(tier, subtotal) + promo_percent(promo_code);
    percent_of(subtotal, percent)
}
