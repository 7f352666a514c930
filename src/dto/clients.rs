use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{domain::loyalty::LoyaltyTier, models::Client};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateClientRequest {
    pub username: String,
    pub password: String,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateClientRequest {
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ClientList {
    #[schema(value_type = Vec<Client>)]
    pub items: Vec<Client>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientStats {
    pub company_name: String,
    pub loyalty_tier: LoyaltyTier,
    pub total_orders: i32,
    pub total_spent: i64,
    pub first_order_at: Option<DateTime<Utc>>,
    pub last_order_at: Option<DateTime<Utc>>,
    pub member_since: DateTime<Utc>,
}

impl From<Client> for ClientStats {
    fn from(client: Client) -> Self {
        Self {
            company_name: client.company_name,
            loyalty_tier: client.loyalty_tier,
            total_orders: client.total_orders,
            total_spent: client.total_spent,
            first_order_at: client.first_order_at,
            last_order_at: client.last_order_at,
            member_since: client.created_at,
        }
    }
}
