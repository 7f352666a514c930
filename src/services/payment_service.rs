use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        money::Cents,
        order::OrderStatus,
        payment::{PaymentStatus, check_new_payment, remaining_after},
    },
    dto::payments::{AddPaymentRequest, PaymentList},
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_owner_or_admin},
    models::{Payment, order_status_of, payment_from_entity, payment_status_of},
    response::{ApiResponse, Meta},
    services::order_service::lock_order,
    state::AppState,
};

/// Records a payment against a PENDING order and lowers its remaining balance.
/// Cash settles on receipt; other methods wait for settlement.
pub async fn add_payment(
    state: &AppState,
    user: &AuthUser,
    payload: AddPaymentRequest,
) -> AppResult<ApiResponse<Payment>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    let order = lock_order(&txn, payload.order_id).await?;
    let status = order_status_of(&order)?;
    if !status.accepts_payments() {
        return Err(AppError::InvalidState(format!(
            "Payments can only be added to PENDING orders, order is {}",
            status.as_str()
        )));
    }

    // The order row lock serializes sequence allocation per order.
    let (existing, balance) = ledger_balance(&txn, &order).await?;
    let method = check_new_payment(&payload.method, payload.amount, balance)?;
    let sequence_number = i32::try_from(existing + 1)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("payment sequence overflow")))?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let initial = method.initial_status();
    let paid_at = payload.paid_at.map(Into::into).unwrap_or(now);

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        sequence_number: Set(sequence_number),
        amount: Set(payload.amount),
        method: Set(method.as_str().into()),
        reference: Set(payload.reference),
        bank: Set(payload.bank),
        due_date: Set(payload.due_date.map(Into::into)),
        paid_at: Set(paid_at),
        settled_at: Set((initial == PaymentStatus::Settled).then_some(now)),
        status: Set(initial.as_str().into()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let remaining = balance - payload.amount;
    let order_id = order.id;
    let mut active: OrderActive = order.into();
    active.remaining = Set(remaining);
    active.updated_at = Set(now);
    active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order_id,
        sequence_number,
        amount = payload.amount,
        method = method.as_str(),
        remaining,
        "payment recorded"
    );
    audit::record(
        state,
        user,
        "payment_add",
        "payments",
        serde_json::json!({ "payment_id": payment.id, "order_id": order_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment recorded",
        payment_from_entity(payment)?,
        Some(Meta::empty()),
    ))
}

pub async fn settle_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    let payment = Payments::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Payment"))?;
    let settled = payment_status_of(&payment)?.settle()?;

    let mut active: PaymentActive = payment.into();
    active.status = Set(settled.as_str().into());
    active.settled_at = Set(Some(Utc::now().into()));
    let payment = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(payment_id = %id, order_id = %payment.order_id, "payment settled");
    audit::record(
        state,
        user,
        "payment_settle",
        "payments",
        serde_json::json!({ "payment_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment settled",
        payment_from_entity(payment)?,
        Some(Meta::empty()),
    ))
}

/// Rejects a payment awaiting settlement and returns its amount to the order's
/// remaining balance.
pub async fn reject_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    // Order first, then payment: the same lock order add_payment uses.
    let order_id = Payments::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Payment"))?
        .order_id;
    let order = lock_order(&txn, order_id).await?;
    let payment = Payments::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Payment"))?;

    let rejected = payment_status_of(&payment)?.reject()?;
    let amount = payment.amount;
    let (_, balance) = ledger_balance(&txn, &order).await?;

    let mut active: PaymentActive = payment.into();
    active.status = Set(rejected.as_str().into());
    let payment = active.update(&txn).await?;

    let order_status = order_status_of(&order)?;
    let remaining = balance + amount;
    let mut order_active: OrderActive = order.into();
    order_active.remaining = Set(remaining);
    order_active.updated_at = Set(Utc::now().into());
    order_active.update(&txn).await?;

    txn.commit().await?;

    if order_status == OrderStatus::Confirmed {
        tracing::warn!(
            payment_id = %id,
            order_id = %order_id,
            remaining,
            "payment rejected on a confirmed order, balance reopened"
        );
    } else {
        tracing::info!(payment_id = %id, order_id = %order_id, remaining, "payment rejected");
    }
    audit::record(
        state,
        user,
        "payment_reject",
        "payments",
        serde_json::json!({ "payment_id": id, "order_id": order_id, "amount": amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment rejected",
        payment_from_entity(payment)?,
        Some(Meta::empty()),
    ))
}

/// Remaining balance recomputed from the order's payments, along with how
/// many payments it has. Callers hold the order row lock.
async fn ledger_balance(
    txn: &DatabaseTransaction,
    order: &OrderModel,
) -> AppResult<(usize, Cents)> {
    let ledger = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .all(txn)
        .await?
        .iter()
        .map(|payment| payment_status_of(payment).map(|status| (status, payment.amount)))
        .collect::<AppResult<Vec<_>>>()?;

    let remaining = remaining_after(order.total_ttc, &ledger);
    if remaining != order.remaining {
        tracing::warn!(
            order_id = %order.id,
            stored = order.remaining,
            computed = remaining,
            "order balance disagrees with its payments, using the payments"
        );
    }
    Ok((ledger.len(), remaining))
}

pub async fn get_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    let payment = Payments::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Payment"))?;
    let order = Orders::find_by_id(payment.order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    ensure_owner_or_admin(user, order.client_id)?;

    Ok(ApiResponse::success(
        "Payment",
        payment_from_entity(payment)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_order_payments(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<PaymentList>> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    ensure_owner_or_admin(user, order.client_id)?;

    let items = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .order_by_asc(PaymentCol::SequenceNumber)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(payment_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Payments",
        PaymentList { items },
        Some(Meta::empty()),
    ))
}
