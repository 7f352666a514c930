//! Pure business rules: pricing, discounts, loyalty, and the order/payment
//! state machines. Nothing in here touches the database.

use thiserror::Error;

pub mod discount;
pub mod loyalty;
pub mod money;
pub mod order;
pub mod payment;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Validation(String),
}
