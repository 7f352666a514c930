mod common;

use common::*;
use smartshop_api::{
    domain::{loyalty::LoyaltyTier, order::OrderStatus},
    dto::{
        orders::{CreateOrderRequest, OrderItemRequest},
        products::UpdateProductRequest,
    },
    error::AppError,
    services::{order_service, payment_service, product_service},
    state::AppState,
};

// Integration flow: create -> pay -> confirm, with the failure paths around it.
#[tokio::test]
async fn order_lifecycle_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    paid_order_confirms_and_feeds_loyalty(&state).await?;
    unpaid_order_cannot_be_confirmed(&state).await?;
    creation_rejects_bad_lines(&state).await?;
    oversized_lines_leave_stock_alone(&state).await?;
    lines_read_back_in_entry_order(&state).await?;
    stock_shortfall_rejects_order(&state).await?;
    price_edit_leaves_existing_order_alone(&state).await?;
    concurrent_confirmations_do_not_oversell(&state).await?;
    clients_only_see_their_own_orders(&state).await?;

    Ok(())
}

async fn paid_order_confirms_and_feeds_loyalty(state: &AppState) -> anyhow::Result<()> {
    let admin = admin();
    let client = new_client(state, &admin).await?;
    assert_eq!(client.loyalty_tier, LoyaltyTier::Basic);
    let widget = new_product(state, &admin, 100_000, 5).await?;

    let detail = new_order(state, &admin, client.id, &[(widget.id, 2)], None).await?;
    let order = detail.order;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.subtotal_ht, 200_000);
    assert_eq!(order.discount_amount, 0);
    assert_eq!(order.vat, 40_000);
    assert_eq!(order.total_ttc, 240_000);
    assert_eq!(order.remaining, 240_000);

    pay(state, &admin, order.id, 240_000, "cash").await?;

    let confirmed = order_service::confirm_order(state, &admin, order.id)
        .await?
        .data
        .expect("confirmed order");
    assert_eq!(confirmed.order.status, OrderStatus::Confirmed);
    assert_eq!(confirmed.order.remaining, 0);
    assert_eq!(confirmed.payments.len(), 1);

    assert_eq!(product(state, widget.id).await?.stock, 3);

    let client_after = common::client(state, &admin, client.id).await?;
    assert_eq!(client_after.total_orders, 1);
    assert_eq!(client_after.total_spent, 240_000);
    assert_eq!(client_after.loyalty_tier, LoyaltyTier::Silver);
    assert!(client_after.first_order_at.is_some());
    assert_eq!(client_after.first_order_at, client_after.last_order_at);

    let again = order_service::confirm_order(state, &admin, order.id).await;
    assert!(matches!(again, Err(AppError::InvalidState(_))));
    let cancel = order_service::cancel_order(state, &admin, order.id).await;
    assert!(matches!(cancel, Err(AppError::InvalidState(_))));
    assert_eq!(product(state, widget.id).await?.stock, 3);

    // SILVER now: 5% above the 500.00 floor, plus 5% for the promo code.
    let next = new_order(state, &admin, client.id, &[(widget.id, 1)], Some("PROMO-2024")).await?;
    assert_eq!(next.order.subtotal_ht, 100_000);
    assert_eq!(next.order.discount_amount, 10_000);
    assert_eq!(next.order.vat, 18_000);
    assert_eq!(next.order.total_ttc, 108_000);

    let lowercase = new_order(state, &admin, client.id, &[(widget.id, 1)], Some("promo-2024")).await?;
    assert_eq!(lowercase.order.discount_amount, 5_000);
    assert_eq!(lowercase.order.total_ttc, 114_000);

    Ok(())
}

async fn unpaid_order_cannot_be_confirmed(state: &AppState) -> anyhow::Result<()> {
    let admin = admin();
    let client = new_client(state, &admin).await?;
    let widget = new_product(state, &admin, 100_000, 5).await?;
    let order = new_order(state, &admin, client.id, &[(widget.id, 1)], None)
        .await?
        .order;
    assert_eq!(order.total_ttc, 120_000);

    pay(state, &admin, order.id, 50_000, "check").await?;

    let result = order_service::confirm_order(state, &admin, order.id).await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));

    let detail = order_detail(state, &admin, order.id).await?;
    assert_eq!(detail.order.status, OrderStatus::Pending);
    assert_eq!(detail.order.remaining, 70_000);
    assert_eq!(product(state, widget.id).await?.stock, 5);
    assert_eq!(common::client(state, &admin, client.id).await?.total_orders, 0);

    Ok(())
}

async fn creation_rejects_bad_lines(state: &AppState) -> anyhow::Result<()> {
    let admin = admin();
    let client = new_client(state, &admin).await?;
    let widget = new_product(state, &admin, 10_000, 3).await?;

    let empty = order_service::create_order(
        state,
        &admin,
        CreateOrderRequest {
            client_id: client.id,
            items: Vec::new(),
            promo_code: None,
        },
    )
    .await;
    assert!(matches!(empty, Err(AppError::ValidationFailed(_))));

    let zero = new_order(state, &admin, client.id, &[(widget.id, 0)], None).await;
    assert!(zero.is_err());

    // Two lines for the same product count together against stock.
    let split = order_service::create_order(
        state,
        &admin,
        CreateOrderRequest {
            client_id: client.id,
            items: vec![
                OrderItemRequest {
                    product_id: widget.id,
                    quantity: 2,
                },
                OrderItemRequest {
                    product_id: widget.id,
                    quantity: 2,
                },
            ],
            promo_code: None,
        },
    )
    .await;
    assert!(matches!(split, Err(AppError::Conflict(_))));

    let unknown_client = new_order(state, &admin, uuid::Uuid::new_v4(), &[(widget.id, 1)], None).await;
    assert!(unknown_client.is_err());

    product_service::delete_product(state, &admin, widget.id).await?;
    let retired = order_service::create_order(
        state,
        &admin,
        CreateOrderRequest {
            client_id: client.id,
            items: vec![OrderItemRequest {
                product_id: widget.id,
                quantity: 1,
            }],
            promo_code: None,
        },
    )
    .await;
    assert!(matches!(retired, Err(AppError::ValidationFailed(_))));

    Ok(())
}

async fn oversized_lines_leave_stock_alone(state: &AppState) -> anyhow::Result<()> {
    let admin = admin();
    let client = new_client(state, &admin).await?;
    let widget = new_product(state, &admin, 100_000, 5).await?;

    // Combined demand of 2 * i32::MAX must not wrap into something that fits in stock.
    let flood = new_order(
        state,
        &admin,
        client.id,
        &[(widget.id, i32::MAX), (widget.id, i32::MAX)],
        None,
    )
    .await;
    let err = flood.expect_err("demand above stock");
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Conflict(_))
    ));
    assert_eq!(product(state, widget.id).await?.stock, 5);

    let pricey = new_product(state, &admin, i64::MAX / 2, 5).await?;
    let overflow = new_order(state, &admin, client.id, &[(pricey.id, 3)], None).await;
    let err = overflow.expect_err("subtotal overflow");
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::ValidationFailed(_))
    ));

    let split = new_order(
        state,
        &admin,
        client.id,
        &[(pricey.id, 1), (pricey.id, 1), (widget.id, 1)],
        None,
    )
    .await;
    let err = split.expect_err("sum overflow");
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::ValidationFailed(_))
    ));
    assert_eq!(product(state, pricey.id).await?.stock, 5);

    let history = order_service::list_client_orders(state, &admin, client.id, Default::default())
        .await?
        .data
        .expect("history");
    assert!(history.items.is_empty());

    Ok(())
}

async fn lines_read_back_in_entry_order(state: &AppState) -> anyhow::Result<()> {
    let admin = admin();
    let client = new_client(state, &admin).await?;
    let mut lines = Vec::new();
    for quantity in 1..=12 {
        let product = new_product(state, &admin, 1_000, 20).await?;
        lines.push((product.id, quantity));
    }
    lines.reverse();

    let created = new_order(state, &admin, client.id, &lines, None).await?;
    let detail = order_detail(state, &admin, created.order.id).await?;

    let read: Vec<_> = detail
        .items
        .iter()
        .map(|item| (item.product_id, item.quantity))
        .collect();
    assert_eq!(read, lines);
    let numbers: Vec<i32> = detail.items.iter().map(|item| item.line_no).collect();
    assert_eq!(numbers, (1..=12).collect::<Vec<_>>());

    Ok(())
}

async fn stock_shortfall_rejects_order(state: &AppState) -> anyhow::Result<()> {
    let admin = admin();
    let client = new_client(state, &admin).await?;
    let widget = new_product(state, &admin, 100_000, 2).await?;

    // Creation does not reserve stock, so both orders are accepted.
    let first = new_order(state, &admin, client.id, &[(widget.id, 2)], None)
        .await?
        .order;
    let second = new_order(state, &admin, client.id, &[(widget.id, 2)], None)
        .await?
        .order;
    pay(state, &admin, first.id, first.total_ttc, "CASH").await?;
    pay(state, &admin, second.id, second.total_ttc, "CASH").await?;

    order_service::confirm_order(state, &admin, first.id).await?;
    let result = order_service::confirm_order(state, &admin, second.id).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let rejected = order_detail(state, &admin, second.id).await?;
    assert_eq!(rejected.order.status, OrderStatus::Rejected);
    assert_eq!(product(state, widget.id).await?.stock, 0);
    assert_eq!(common::client(state, &admin, client.id).await?.total_orders, 1);

    let late = payment_service::add_payment(
        state,
        &admin,
        payment_request(second.id, 1_000, "CASH"),
    )
    .await;
    assert!(matches!(late, Err(AppError::InvalidState(_))));

    let canceled = order_service::cancel_order(state, &admin, second.id)
        .await?
        .data
        .expect("canceled order");
    assert_eq!(canceled.order.status, OrderStatus::Canceled);

    Ok(())
}

async fn price_edit_leaves_existing_order_alone(state: &AppState) -> anyhow::Result<()> {
    let admin = admin();
    let client = new_client(state, &admin).await?;
    let widget = new_product(state, &admin, 100_000, 5).await?;
    let order = new_order(state, &admin, client.id, &[(widget.id, 1)], None).await?;

    product_service::update_product(
        state,
        &admin,
        widget.id,
        UpdateProductRequest {
            name: Some("Renamed widget".into()),
            description: None,
            price: Some(200_000),
            stock: None,
        },
    )
    .await?;

    let detail = order_detail(state, &admin, order.order.id).await?;
    assert_eq!(detail.order.total_ttc, 120_000);
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].unit_price, 100_000);
    assert_eq!(detail.items[0].subtotal, 100_000);
    assert_eq!(detail.items[0].product_name, widget.name);

    Ok(())
}

async fn concurrent_confirmations_do_not_oversell(state: &AppState) -> anyhow::Result<()> {
    let admin = admin();
    let client = new_client(state, &admin).await?;
    let widget = new_product(state, &admin, 100_000, 1).await?;

    let a = new_order(state, &admin, client.id, &[(widget.id, 1)], None)
        .await?
        .order;
    let b = new_order(state, &admin, client.id, &[(widget.id, 1)], None)
        .await?
        .order;
    pay(state, &admin, a.id, a.total_ttc, "cash").await?;
    pay(state, &admin, b.id, b.total_ttc, "cash").await?;

    let (ra, rb) = tokio::join!(
        order_service::confirm_order(state, &admin, a.id),
        order_service::confirm_order(state, &admin, b.id),
    );
    let confirmed = [ra.is_ok(), rb.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(confirmed, 1, "exactly one confirmation may win the last unit");
    assert!(matches!(ra, Err(AppError::Conflict(_))) || matches!(rb, Err(AppError::Conflict(_))));

    assert_eq!(product(state, widget.id).await?.stock, 0);
    let client_after = common::client(state, &admin, client.id).await?;
    assert_eq!(client_after.total_orders, 1);
    assert_eq!(client_after.total_spent, 120_000);

    Ok(())
}

async fn clients_only_see_their_own_orders(state: &AppState) -> anyhow::Result<()> {
    let admin = admin();
    let owner = new_client(state, &admin).await?;
    let other = new_client(state, &admin).await?;
    let widget = new_product(state, &admin, 5_000, 10).await?;
    let order = new_order(state, &admin, owner.id, &[(widget.id, 1)], None)
        .await?
        .order;

    let mine = order_service::get_order(state, &client_user(owner.id), order.id).await;
    assert!(mine.is_ok());
    let theirs = order_service::get_order(state, &client_user(other.id), order.id).await;
    assert!(matches!(theirs, Err(AppError::Forbidden)));

    let create = order_service::create_order(
        state,
        &client_user(owner.id),
        CreateOrderRequest {
            client_id: owner.id,
            items: vec![OrderItemRequest {
                product_id: widget.id,
                quantity: 1,
            }],
            promo_code: None,
        },
    )
    .await;
    assert!(matches!(create, Err(AppError::Forbidden)));

    let history = order_service::list_client_orders(
        state,
        &client_user(owner.id),
        owner.id,
        Default::default(),
    )
    .await?
    .data
    .expect("history");
    assert_eq!(history.items.len(), 1);
    assert_eq!(history.items[0].id, order.id);

    Ok(())
}
