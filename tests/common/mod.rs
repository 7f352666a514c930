#![allow(dead_code)]

use smartshop_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        clients::CreateClientRequest,
        orders::{CreateOrderRequest, OrderDetail, OrderItemRequest},
        payments::AddPaymentRequest,
        products::CreateProductRequest,
    },
    middleware::auth::AuthUser,
    models::{Client, Payment, Product, Role},
    services::{client_service, order_service, payment_service, product_service},
    state::AppState,
};
use uuid::Uuid;

/// Returns `None` when no database is configured, so the flow tests skip.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(&database_url).await?;
    Ok(Some(AppState { pool, orm }))
}

pub fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Admin,
        client_id: None,
    }
}

pub fn client_user(client_id: Uuid) -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Client,
        client_id: Some(client_id),
    }
}

pub async fn new_client(state: &AppState, admin: &AuthUser) -> anyhow::Result<Client> {
    let resp = client_service::create_client(
        state,
        admin,
        CreateClientRequest {
            username: format!("client-{}", Uuid::new_v4()),
            password: "secret".into(),
            company_name: "Acme SARL".into(),
            contact_name: Some("Jane Doe".into()),
            email: Some("jane@acme.test".into()),
            phone: None,
            address: None,
        },
    )
    .await?;
    Ok(resp.data.expect("client"))
}

pub async fn new_product(
    state: &AppState,
    admin: &AuthUser,
    price: i64,
    stock: i32,
) -> anyhow::Result<Product> {
    let resp = product_service::create_product(
        state,
        admin,
        CreateProductRequest {
            name: format!("Widget {}", Uuid::new_v4()),
            description: Some("test product".into()),
            price,
            stock,
        },
    )
    .await?;
    Ok(resp.data.expect("product"))
}

pub async fn new_order(
    state: &AppState,
    admin: &AuthUser,
    client_id: Uuid,
    items: &[(Uuid, i32)],
    promo_code: Option<&str>,
) -> anyhow::Result<OrderDetail> {
    let resp = order_service::create_order(
        state,
        admin,
        CreateOrderRequest {
            client_id,
            items: items
                .iter()
                .map(|(product_id, quantity)| OrderItemRequest {
                    product_id: *product_id,
                    quantity: *quantity,
                })
                .collect(),
            promo_code: promo_code.map(str::to_string),
        },
    )
    .await?;
    Ok(resp.data.expect("order"))
}

pub fn payment_request(order_id: Uuid, amount: i64, method: &str) -> AddPaymentRequest {
    AddPaymentRequest {
        order_id,
        amount,
        method: method.into(),
        reference: None,
        bank: None,
        due_date: None,
        paid_at: None,
    }
}

pub async fn pay(
    state: &AppState,
    admin: &AuthUser,
    order_id: Uuid,
    amount: i64,
    method: &str,
) -> anyhow::Result<Payment> {
    let resp =
        payment_service::add_payment(state, admin, payment_request(order_id, amount, method))
            .await?;
    Ok(resp.data.expect("payment"))
}

pub async fn order_detail(
    state: &AppState,
    admin: &AuthUser,
    order_id: Uuid,
) -> anyhow::Result<OrderDetail> {
    let resp = order_service::get_order(state, admin, order_id).await?;
    Ok(resp.data.expect("order detail"))
}

pub async fn product(state: &AppState, id: Uuid) -> anyhow::Result<Product> {
    let resp = product_service::get_product(state, id).await?;
    Ok(resp.data.expect("product"))
}

pub async fn client(state: &AppState, admin: &AuthUser, id: Uuid) -> anyhow::Result<Client> {
    let resp = client_service::get_client(state, admin, id).await?;
    Ok(resp.data.expect("client"))
}
