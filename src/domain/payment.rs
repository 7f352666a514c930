use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::RuleViolation;
use super::money::{CASH_PAYMENT_CEILING, Cents};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Check,
    Transfer,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Check => "CHECK",
            PaymentMethod::Transfer => "TRANSFER",
            PaymentMethod::Card => "CARD",
        }
    }

    /// Case-insensitive, surrounding whitespace ignored.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CASH" => Some(PaymentMethod::Cash),
            "CHECK" => Some(PaymentMethod::Check),
            "TRANSFER" => Some(PaymentMethod::Transfer),
            "CARD" => Some(PaymentMethod::Card),
            _ => None,
        }
    }

    /// Cash is in hand the moment it is recorded; everything else clears later.
    pub fn initial_status(&self) -> PaymentStatus {
        match self {
            PaymentMethod::Cash => PaymentStatus::Settled,
            _ => PaymentStatus::PendingSettlement,
        }
    }
}

/// ```text
/// PENDING_SETTLEMENT --settle--> SETTLED
/// PENDING_SETTLEMENT --reject--> REJECTED
/// ```
/// SETTLED and REJECTED are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    PendingSettlement,
    Settled,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::PendingSettlement => "PENDING_SETTLEMENT",
            PaymentStatus::Settled => "SETTLED",
            PaymentStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING_SETTLEMENT" => Some(PaymentStatus::PendingSettlement),
            "SETTLED" => Some(PaymentStatus::Settled),
            "REJECTED" => Some(PaymentStatus::Rejected),
            _ => None,
        }
    }

    pub fn settle(self) -> Result<PaymentStatus, RuleViolation> {
        match self {
            PaymentStatus::PendingSettlement => Ok(PaymentStatus::Settled),
            PaymentStatus::Settled => Err(RuleViolation::InvalidState(
                "Payment is already settled".into(),
            )),
            PaymentStatus::Rejected => Err(RuleViolation::InvalidState(
                "Cannot settle a rejected payment".into(),
            )),
        }
    }

    pub fn reject(self) -> Result<PaymentStatus, RuleViolation> {
        match self {
            PaymentStatus::PendingSettlement => Ok(PaymentStatus::Rejected),
            PaymentStatus::Settled => Err(RuleViolation::InvalidState(
                "Cannot reject a settled payment".into(),
            )),
            // a second rejection would credit the balance twice
            PaymentStatus::Rejected => Err(RuleViolation::InvalidState(
                "Payment is already rejected".into(),
            )),
        }
    }

    pub fn counts_toward_balance(&self) -> bool {
        !matches!(self, PaymentStatus::Rejected)
    }
}

/// Checks a new payment against the order balance and the instrument rules.
/// `method` is the raw instrument name from the request.
pub fn check_new_payment(
    method: &str,
    amount: Cents,
    remaining: Cents,
) -> Result<PaymentMethod, RuleViolation> {
    let method = PaymentMethod::parse(method).ok_or_else(|| {
        RuleViolation::Validation(format!(
            "Invalid payment type '{method}'. Allowed types: CASH, CHECK, TRANSFER, CARD"
        ))
    })?;

    if amount <= 0 {
        return Err(RuleViolation::Validation("Payment amount must be positive".into()));
    }
    if amount > remaining {
        return Err(RuleViolation::Validation(format!(
            "Payment amount {amount} exceeds remaining balance {remaining}"
        )));
    }
    if method == PaymentMethod::Cash && amount > CASH_PAYMENT_CEILING {
        return Err(RuleViolation::Validation(format!(
            "Cash payment cannot exceed {CASH_PAYMENT_CEILING}"
        )));
    }

    Ok(method)
}

/// Remaining balance implied by a set of payments. Rejected payments do not count.
pub fn remaining_after(total_ttc: Cents, payments: &[(PaymentStatus, Cents)]) -> Cents {
    let accepted: Cents = payments
        .iter()
        .filter(|(status, _)| status.counts_toward_balance())
        .map(|(_, amount)| amount)
        .sum();
    total_ttc - accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cash_ceiling_is_inclusive() {
        assert_eq!(
            check_new_payment("CASH", 2_000_000, 5_000_000),
            Ok(PaymentMethod::Cash)
        );
        assert!(matches!(
            check_new_payment("CASH", 2_000_001, 5_000_000),
            Err(RuleViolation::Validation(_))
        ));
        assert_eq!(
            check_new_payment("TRANSFER", 2_000_001, 5_000_000),
            Ok(PaymentMethod::Transfer)
        );
    }

    #[test]
    fn rejects_overpayment_and_unknown_method() {
        assert!(check_new_payment("card", 10_001, 10_000).is_err());
        assert_eq!(check_new_payment("card", 10_000, 10_000), Ok(PaymentMethod::Card));
        assert!(matches!(
            check_new_payment("BITCOIN", 100, 10_000),
            Err(RuleViolation::Validation(_))
        ));
        assert!(check_new_payment("CHECK", 0, 10_000).is_err());
    }

    #[test]
    fn only_cash_settles_on_receipt() {
        assert_eq!(PaymentMethod::Cash.initial_status(), PaymentStatus::Settled);
        assert_eq!(PaymentMethod::Check.initial_status(), PaymentStatus::PendingSettlement);
        assert_eq!(PaymentMethod::Transfer.initial_status(), PaymentStatus::PendingSettlement);
        assert_eq!(PaymentMethod::Card.initial_status(), PaymentStatus::PendingSettlement);
    }

    #[test]
    fn settlement_edges() {
        assert_eq!(PaymentStatus::PendingSettlement.settle(), Ok(PaymentStatus::Settled));
        assert!(PaymentStatus::Settled.settle().is_err());
        assert!(PaymentStatus::Rejected.settle().is_err());

        assert_eq!(PaymentStatus::PendingSettlement.reject(), Ok(PaymentStatus::Rejected));
        assert!(PaymentStatus::Settled.reject().is_err());
        assert!(PaymentStatus::Rejected.reject().is_err());
    }

    #[test]
    fn rejected_payments_do_not_reduce_balance() {
        let payments = [
            (PaymentStatus::Settled, 100_000),
            (PaymentStatus::Rejected, 50_000),
            (PaymentStatus::PendingSettlement, 20_000),
        ];
        assert_eq!(remaining_after(270_000, &payments), 150_000);
    }
}
