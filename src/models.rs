use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{
        loyalty::LoyaltyTier,
        order::OrderStatus,
        payment::{PaymentMethod, PaymentStatus},
    },
    entity::{
        clients::Model as ClientModel, order_items::Model as OrderItemModel,
        orders::Model as OrderModel, payments::Model as PaymentModel,
        products::Model as ProductModel, users::Model as UserModel,
    },
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Client => "CLIENT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(Role::Admin),
            "CLIENT" => Some(Role::Client),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub client_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Client {
    pub id: Uuid,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub loyalty_tier: LoyaltyTier,
    pub total_orders: i32,
    pub total_spent: i64,
    pub first_order_at: Option<DateTime<Utc>>,
    pub last_order_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub client_id: Uuid,
    pub promo_code: Option<String>,
    pub subtotal_ht: i64,
    pub discount_amount: i64,
    pub amount_after_discount: i64,
    pub vat: i64,
    pub total_ttc: i64,
    pub remaining: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    /// 1-based position of the line within its order.
    pub line_no: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub subtotal: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub sequence_number: i32,
    pub amount: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub bank: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub paid_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

fn corrupt(field: &str, value: &str) -> AppError {
    AppError::Internal(anyhow::anyhow!("unexpected stored {field} '{value}'"))
}

pub(crate) fn order_status_of(model: &OrderModel) -> AppResult<OrderStatus> {
    OrderStatus::parse(&model.status).ok_or_else(|| corrupt("order status", &model.status))
}

pub(crate) fn payment_status_of(model: &PaymentModel) -> AppResult<PaymentStatus> {
    PaymentStatus::parse(&model.status).ok_or_else(|| corrupt("payment status", &model.status))
}

pub(crate) fn user_from_entity(model: UserModel) -> AppResult<User> {
    let role = Role::parse(&model.role).ok_or_else(|| corrupt("role", &model.role))?;
    Ok(User {
        id: model.id,
        username: model.username,
        role,
        client_id: model.client_id,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

pub(crate) fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn client_from_entity(model: ClientModel) -> Client {
    Client {
        id: model.id,
        company_name: model.company_name,
        contact_name: model.contact_name,
        email: model.email,
        phone: model.phone,
        address: model.address,
        loyalty_tier: LoyaltyTier::from_stored(&model.loyalty_tier),
        total_orders: model.total_orders,
        total_spent: model.total_spent,
        first_order_at: model.first_order_at.map(|dt| dt.with_timezone(&Utc)),
        last_order_at: model.last_order_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status = order_status_of(&model)?;
    Ok(Order {
        id: model.id,
        client_id: model.client_id,
        promo_code: model.promo_code,
        subtotal_ht: model.subtotal_ht,
        discount_amount: model.discount_amount,
        amount_after_discount: model.amount_after_discount,
        vat: model.vat,
        total_ttc: model.total_ttc,
        remaining: model.remaining,
        status,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        line_no: model.line_no,
        product_id: model.product_id,
        product_name: model.product_name,
        unit_price: model.unit_price,
        quantity: model.quantity,
        subtotal: model.subtotal,
    }
}

pub(crate) fn payment_from_entity(model: PaymentModel) -> AppResult<Payment> {
    let status = payment_status_of(&model)?;
    let method = PaymentMethod::parse(&model.method).ok_or_else(|| corrupt("payment method", &model.method))?;
    Ok(Payment {
        id: model.id,
        order_id: model.order_id,
        sequence_number: model.sequence_number,
        amount: model.amount,
        method,
        reference: model.reference,
        bank: model.bank,
        due_date: model.due_date.map(|dt| dt.with_timezone(&Utc)),
        paid_at: model.paid_at.with_timezone(&Utc),
        settled_at: model.settled_at.map(|dt| dt.with_timezone(&Utc)),
        status,
        created_at: model.created_at.with_timezone(&Utc),
    })
}
