use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::money::Cents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoyaltyTier {
    Basic,
    Silver,
    Gold,
    Platinum,
}

impl LoyaltyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoyaltyTier::Basic => "BASIC",
            LoyaltyTier::Silver => "SILVER",
            LoyaltyTier::Gold => "GOLD",
            LoyaltyTier::Platinum => "PLATINUM",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BASIC" => Some(LoyaltyTier::Basic),
            "SILVER" => Some(LoyaltyTier::Silver),
            "GOLD" => Some(LoyaltyTier::Gold),
            "PLATINUM" => Some(LoyaltyTier::Platinum),
            _ => None,
        }
    }

    /// Reads a stored tier. Unknown values fall back to BASIC, which earns no
    /// tier discount.
    pub fn from_stored(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| {
            tracing::warn!(tier = %value, "unrecognized loyalty tier, treating as BASIC");
            LoyaltyTier::Basic
        })
    }
}

const PLATINUM_ORDERS: i32 = 20;
const PLATINUM_SPENT: Cents = 1_500_000;
const GOLD_ORDERS: i32 = 10;
const GOLD_SPENT: Cents = 500_000;
const SILVER_ORDERS: i32 = 3;
const SILVER_SPENT: Cents = 100_000;

pub fn tier_for(total_orders: i32, total_spent: Cents) -> LoyaltyTier {
    if total_orders >= PLATINUM_ORDERS || total_spent >= PLATINUM_SPENT {
        LoyaltyTier::Platinum
    } else if total_orders >= GOLD_ORDERS || total_spent >= GOLD_SPENT {
        LoyaltyTier::Gold
    } else if total_orders >= SILVER_ORDERS || total_spent >= SILVER_SPENT {
        LoyaltyTier::Silver
    } else {
        LoyaltyTier::Basic
    }
}

/// Cumulative purchase history of a client.
///
/// The only mutation is [`LoyaltyLedger::record_confirmed_order`], which the
/// order engine applies inside the confirmation transaction, so totals and
/// tier always move together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoyaltyLedger {
    pub total_orders: i32,
    pub total_spent: Cents,
    pub first_order_at: Option<DateTime<Utc>>,
    pub last_order_at: Option<DateTime<Utc>>,
    pub tier: LoyaltyTier,
}

impl LoyaltyLedger {
    pub fn record_confirmed_order(self, order_total: Cents, ordered_at: DateTime<Utc>) -> Self {
        let total_orders = self.total_orders + 1;
        let total_spent = self.total_spent + order_total;
        Self {
            total_orders,
            total_spent,
            first_order_at: self.first_order_at.or(Some(ordered_at)),
            last_order_at: Some(ordered_at),
            tier: tier_for(total_orders, total_spent),
        }
    }
}
