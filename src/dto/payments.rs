use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Payment;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddPaymentRequest {
    pub order_id: Uuid,
    /// Minor units.
    pub amount: i64,
    /// CASH, CHECK, TRANSFER or CARD.
    pub method: String,
    pub reference: Option<String>,
    pub bank: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentList {
    pub items: Vec<Payment>,
}
