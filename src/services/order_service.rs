use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        loyalty::LoyaltyTier,
        order::{LineSnapshot, OrderEvent, OrderStatus, ensure_confirmable, price_lines},
    },
    dto::orders::{CreateOrderRequest, OrderDetail, OrderList},
    entity::{
        clients::Entity as Clients,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{Column as PaymentCol, Entity as Payments},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_owner_or_admin},
    models::{order_from_entity, order_item_from_entity, order_status_of, payment_from_entity},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination, SortOrder},
    services::client_service,
    state::AppState,
};

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    ensure_admin(user)?;
    if payload.items.is_empty() {
        return Err(AppError::ValidationFailed(
            "Order must contain at least one item".into(),
        ));
    }
    if payload.items.iter().any(|item| item.quantity <= 0) {
        return Err(AppError::ValidationFailed(
            "Item quantity must be greater than 0".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let client = Clients::find_by_id(payload.client_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Client"))?;
    let tier = LoyaltyTier::from_stored(&client.loyalty_tier);

    let mut catalog: HashMap<Uuid, ProductModel> = HashMap::new();
    for item in &payload.items {
        if catalog.contains_key(&item.product_id) {
            continue;
        }
        let product = Products::find_by_id(item.product_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("Product"))?;
        if product.deleted {
            return Err(AppError::ValidationFailed(format!(
                "Product is no longer available: {}",
                product.name
            )));
        }
        catalog.insert(product.id, product);
    }

    // The same product may appear on several lines; check the combined demand.
    // Nothing is reserved here, confirmation re-checks against live stock.
    let demand = demand_by_product(
        payload.items.iter().map(|item| (item.product_id, item.quantity)),
    )?;
    for (product_id, quantity) in demand {
        let product = &catalog[&product_id];
        if i64::from(product.stock) < quantity {
            return Err(AppError::Conflict(format!(
                "Insufficient stock for product: {}",
                product.name
            )));
        }
    }

    let lines: Vec<LineSnapshot> = payload
        .items
        .iter()
        .map(|item| {
            let product = &catalog[&item.product_id];
            LineSnapshot {
                product_id: product.id,
                product_name: product.name.clone(),
                unit_price: product.price,
                quantity: item.quantity,
            }
        })
        .collect();

    let promo_code = payload
        .promo_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string);
    let totals = price_lines(&lines, tier, promo_code.as_deref())?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        client_id: Set(client.id),
        promo_code: Set(promo_code),
        subtotal_ht: Set(totals.subtotal_ht),
        discount_amount: Set(totals.discount_amount),
        amount_after_discount: Set(totals.amount_after_discount),
        vat: Set(totals.vat),
        total_ttc: Set(totals.total_ttc),
        remaining: Set(totals.total_ttc),
        status: Set(OrderStatus::Pending.as_str().into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (line_no, line) in (1..).zip(&lines) {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            line_no: Set(line_no),
            product_id: Set(line.product_id),
            product_name: Set(line.product_name.clone()),
            unit_price: Set(line.unit_price),
            quantity: Set(line.quantity),
            subtotal: Set(line.subtotal()?),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(order_item_from_entity(item));
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        client_id = %order.client_id,
        tier = tier.as_str(),
        total_ttc = order.total_ttc,
        "order created"
    );
    audit::record(
        state,
        user,
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "client_id": order.client_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        OrderDetail {
            order: order_from_entity(order)?,
            items,
            payments: Vec::new(),
        },
        Some(Meta::empty()),
    ))
}

/// Confirms a fully paid order.
///
/// On a stock shortfall the order is committed as REJECTED and the call still
/// fails with [`AppError::Conflict`].
pub async fn confirm_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    let order = lock_order(&txn, id).await?;
    let status = order_status_of(&order)?;
    ensure_confirmable(status, order.remaining)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&txn)
        .await?;
    let demand = demand_by_product(items.iter().map(|item| (item.product_id, item.quantity)))?;

    // Lock in product id order so concurrent confirmations cannot deadlock.
    let mut shortfall = None;
    for (product_id, quantity) in &demand {
        let product = Products::find_by_id(*product_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("Product"))?;
        if i64::from(product.stock) < *quantity {
            shortfall = Some(product.name);
            break;
        }
    }

    let now: DateTimeWithTimeZone = Utc::now().into();

    if let Some(product_name) = shortfall {
        let rejected = status.apply(OrderEvent::StockShortfall)?;
        let order_id = order.id;
        let mut active: OrderActive = order.into();
        active.status = Set(rejected.as_str().into());
        active.updated_at = Set(now);
        active.update(&txn).await?;
        txn.commit().await?;

        tracing::warn!(order_id = %order_id, product = %product_name, "order rejected on stock shortfall");
        audit::record(
            state,
            user,
            "order_reject",
            "orders",
            serde_json::json!({ "order_id": order_id, "product": product_name }),
        )
        .await;

        return Err(AppError::Conflict(format!(
            "Insufficient stock for product: {product_name}"
        )));
    }

    for (product_id, quantity) in &demand {
        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(*quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::value(now))
            .filter(ProdCol::Id.eq(*product_id))
            .filter(ProdCol::Stock.gte(*quantity))
            .exec(&txn)
            .await?;
        if result.rows_affected != 1 {
            return Err(AppError::Internal(anyhow::anyhow!(
                "stock for product {product_id} changed while locked"
            )));
        }
    }

    let confirmed = status.apply(OrderEvent::Confirm)?;
    let client_id = order.client_id;
    let total_ttc = order.total_ttc;
    let ordered_at = order.created_at.with_timezone(&Utc);

    let mut active: OrderActive = order.into();
    active.status = Set(confirmed.as_str().into());
    active.updated_at = Set(now);
    let order = active.update(&txn).await?;

    client_service::record_confirmed_order(&txn, client_id, total_ttc, ordered_at).await?;

    let detail = load_detail(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, client_id = %client_id, total_ttc, "order confirmed");
    audit::record(
        state,
        user,
        "order_confirm",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Order confirmed", detail, Some(Meta::empty())))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    let order = lock_order(&txn, id).await?;
    let canceled = order_status_of(&order)?.apply(OrderEvent::Cancel)?;

    let mut active: OrderActive = order.into();
    active.status = Set(canceled.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    let detail = load_detail(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, "order canceled");
    audit::record(
        state,
        user,
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Order canceled", detail, Some(Meta::empty())))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    ensure_owner_or_admin(user, order.client_id)?;

    let detail = load_detail(&state.orm, order).await?;
    Ok(ApiResponse::success("OK", detail, Some(Meta::empty())))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status = OrderStatus::parse(&status.to_ascii_uppercase())
            .ok_or_else(|| AppError::BadRequest(format!("Unknown order status '{status}'")))?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Order history of one client, newest first.
pub async fn list_client_orders(
    state: &AppState,
    user: &AuthUser,
    client_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_owner_or_admin(user, client_id)?;
    if Clients::find_by_id(client_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound("Client"));
    }

    let (page, limit, offset) = pagination.normalize();
    let finder = Orders::find()
        .filter(OrderCol::ClientId.eq(client_id))
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total)),
    ))
}

pub(crate) async fn lock_order(txn: &DatabaseTransaction, id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

async fn load_detail<C: ConnectionTrait>(conn: &C, order: OrderModel) -> AppResult<OrderDetail> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::LineNo)
        .all(conn)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    let payments = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .order_by_asc(PaymentCol::SequenceNumber)
        .all(conn)
        .await?
        .into_iter()
        .map(payment_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(OrderDetail {
        order: order_from_entity(order)?,
        items,
        payments,
    })
}

/// Total quantity per product, keyed in ascending product id order.
fn demand_by_product(
    lines: impl IntoIterator<Item = (Uuid, i32)>,
) -> AppResult<BTreeMap<Uuid, i64>> {
    let mut demand: BTreeMap<Uuid, i64> = BTreeMap::new();
    for (product_id, quantity) in lines {
        let total = demand.entry(product_id).or_insert(0);
        *total = total
            .checked_add(i64::from(quantity))
            .ok_or_else(|| AppError::ValidationFailed("Ordered quantity is too large".into()))?;
    }
    Ok(demand)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demand_merges_repeated_products() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let demand = demand_by_product([(a, 2), (b, 1), (a, 3)]).unwrap();
        assert_eq!(demand.len(), 2);
        assert_eq!(demand[&a], 5);
        assert_eq!(demand[&b], 1);
        let keys: Vec<_> = demand.keys().copied().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn demand_does_not_wrap_on_huge_quantities() {
        let a = Uuid::new_v4();
        let demand = demand_by_product([(a, i32::MAX), (a, i32::MAX)]).unwrap();
        assert_eq!(demand[&a], 2 * i64::from(i32::MAX));
        assert!(demand[&a] > i64::from(i32::MAX));
    }
}
