use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::RuleViolation;
use super::discount::discount_for;
use super::loyalty::LoyaltyTier;
use super::money::{Cents, vat_on};

/// Order lifecycle.
///
/// ```text
/// PENDING --confirm (paid, stock ok)--> CONFIRMED
/// PENDING --confirm (stock short)-----> REJECTED
/// PENDING | REJECTED | CANCELED --cancel--> CANCELED
/// ```
///
/// Nothing ever returns to PENDING, and CONFIRMED accepts no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Rejected,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    Confirm,
    StockShortfall,
    Cancel,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Canceled => "CANCELED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(OrderStatus::Pending),
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            "REJECTED" => Some(OrderStatus::Rejected),
            "CANCELED" => Some(OrderStatus::Canceled),
            _ => None,
        }
    }

    pub fn accepts_payments(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    pub fn apply(self, event: OrderEvent) -> Result<OrderStatus, RuleViolation> {
        match (self, event) {
            (OrderStatus::Pending, OrderEvent::Confirm) => Ok(OrderStatus::Confirmed),
            (OrderStatus::Pending, OrderEvent::StockShortfall) => Ok(OrderStatus::Rejected),
            (OrderStatus::Confirmed, OrderEvent::Cancel) => Err(RuleViolation::InvalidState(
                "Confirmed orders cannot be canceled".into(),
            )),
            (_, OrderEvent::Cancel) => Ok(OrderStatus::Canceled),
            (status, _) => Err(RuleViolation::InvalidState(format!(
                "Only PENDING orders can be confirmed (current: {})",
                status.as_str()
            ))),
        }
    }
}

/// Gate checked before stock is even looked at.
pub fn ensure_confirmable(status: OrderStatus, remaining: Cents) -> Result<(), RuleViolation> {
    status.apply(OrderEvent::Confirm)?;
    if remaining > 0 {
        return Err(RuleViolation::InvalidState(format!(
            "Order is not fully paid (remaining: {remaining})"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSnapshot {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Cents,
    pub quantity: i32,
}

impl LineSnapshot {
    pub fn subtotal(&self) -> Result<Cents, RuleViolation> {
        self.unit_price
            .checked_mul(Cents::from(self.quantity))
            .ok_or_else(amount_too_large)
    }
}

fn amount_too_large() -> RuleViolation {
    RuleViolation::Validation("Order amount is too large".into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal_ht: Cents,
    pub discount_amount: Cents,
    pub amount_after_discount: Cents,
    pub vat: Cents,
    pub total_ttc: Cents,
}

pub fn price_lines(
    lines: &[LineSnapshot],
    tier: LoyaltyTier,
    promo_code: Option<&str>,
) -> Result<OrderTotals, RuleViolation> {
    let mut subtotal_ht: Cents = 0;
    for line in lines {
        subtotal_ht = subtotal_ht
            .checked_add(line.subtotal()?)
            .ok_or_else(amount_too_large)?;
    }
    totals_for_subtotal(subtotal_ht, tier, promo_code)
}

pub fn totals_for_subtotal(
    subtotal_ht: Cents,
    tier: LoyaltyTier,
    promo_code: Option<&str>,
) -> Result<OrderTotals, RuleViolation> {
    let discount_amount = discount_for(tier, subtotal_ht, promo_code);
    let amount_after_discount = subtotal_ht - discount_amount;
    let vat = vat_on(amount_after_discount);
    let total_ttc = amount_after_discount
        .checked_add(vat)
        .ok_or_else(amount_too_large)?;
    Ok(OrderTotals {
        subtotal_ht,
        discount_amount,
        amount_after_discount,
        vat,
        total_ttc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: Cents, quantity: i32) -> LineSnapshot {
        LineSnapshot {
            product_id: Uuid::new_v4(),
            product_name: "Widget".into(),
            unit_price: price,
            quantity,
        }
    }

    #[test]
    fn silver_client_on_one_thousand() {
        let totals = totals_for_subtotal(100_000, LoyaltyTier::Silver, None).unwrap();
        assert_eq!(totals.discount_amount, 5_000);
        assert_eq!(totals.amount_after_discount, 95_000);
        assert_eq!(totals.vat, 19_000);
        assert_eq!(totals.total_ttc, 114_000);
    }

    #[test]
    fn basic_client_with_promo_code() {
        let totals = totals_for_subtotal(100_000, LoyaltyTier::Basic, Some("PROMO-2024")).unwrap();
        assert_eq!(totals.discount_amount, 5_000);
        assert_eq!(totals.total_ttc, 114_000);
    }

    #[test]
    fn subtotal_is_sum_of_lines() {
        let lines = vec![line(85_000, 2), line(4_500, 10)];
        let totals = price_lines(&lines, LoyaltyTier::Basic, None).unwrap();
        assert_eq!(totals.subtotal_ht, 215_000);
        assert_eq!(lines[0].subtotal(), Ok(170_000));
        assert_eq!(totals.total_ttc, 258_000);
    }

    #[test]
    fn oversized_amounts_are_refused() {
        let huge = line(Cents::MAX / 2, 3);
        assert!(matches!(huge.subtotal(), Err(RuleViolation::Validation(_))));

        let lines = vec![line(Cents::MAX / 2, 1), line(Cents::MAX / 2, 1), line(10, 1)];
        assert!(matches!(
            price_lines(&lines, LoyaltyTier::Basic, None),
            Err(RuleViolation::Validation(_))
        ));

        // Fits before VAT, not after.
        assert!(totals_for_subtotal(Cents::MAX - 1, LoyaltyTier::Basic, None).is_err());

        let big = line(Cents::from(i32::MAX), i32::MAX);
        assert_eq!(big.subtotal(), Ok(Cents::from(i32::MAX) * Cents::from(i32::MAX)));
    }

    #[test]
    fn pending_transitions() {
        assert_eq!(OrderStatus::Pending.apply(OrderEvent::Confirm), Ok(OrderStatus::Confirmed));
        assert_eq!(
            OrderStatus::Pending.apply(OrderEvent::StockShortfall),
            Ok(OrderStatus::Rejected)
        );
        assert_eq!(OrderStatus::Pending.apply(OrderEvent::Cancel), Ok(OrderStatus::Canceled));
    }

    #[test]
    fn terminal_states_reject_confirmation() {
        for status in [OrderStatus::Confirmed, OrderStatus::Rejected, OrderStatus::Canceled] {
            assert!(matches!(
                status.apply(OrderEvent::Confirm),
                Err(RuleViolation::InvalidState(_))
            ));
            assert!(status.apply(OrderEvent::StockShortfall).is_err());
        }
    }

    #[test]
    fn only_confirmed_orders_resist_cancel() {
        assert!(OrderStatus::Confirmed.apply(OrderEvent::Cancel).is_err());
        assert_eq!(OrderStatus::Rejected.apply(OrderEvent::Cancel), Ok(OrderStatus::Canceled));
        assert_eq!(OrderStatus::Canceled.apply(OrderEvent::Cancel), Ok(OrderStatus::Canceled));
    }

    #[test]
    fn confirm_requires_zero_remaining() {
        assert!(ensure_confirmable(OrderStatus::Pending, 1).is_err());
        assert!(ensure_confirmable(OrderStatus::Pending, 0).is_ok());
        assert!(ensure_confirmable(OrderStatus::Confirmed, 0).is_err());
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Rejected,
            OrderStatus::Canceled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("pending"), None);
    }
}
