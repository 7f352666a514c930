use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::payments::AddPaymentRequest,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Payment,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(add_payment))
        .route("/{id}", get(get_payment))
        .route("/{id}/settle", post(settle_payment))
        .route("/{id}/reject", post(reject_payment))
}

#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = AddPaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = ApiResponse<Payment>),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not PENDING"),
        (status = 422, description = "Invalid method, amount or cash ceiling exceeded"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn add_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddPaymentRequest>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::add_payment(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    params(
        ("id" = Uuid, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Get payment", body = ApiResponse<Payment>),
        (status = 404, description = "Payment not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::get_payment(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/settle",
    params(
        ("id" = Uuid, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Payment settled", body = ApiResponse<Payment>),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Payment already settled or rejected"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn settle_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::settle_payment(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/reject",
    params(
        ("id" = Uuid, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Payment rejected, amount returned to the balance", body = ApiResponse<Payment>),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Payment already settled or rejected"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn reject_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::reject_payment(&state, &user, id).await?;
    Ok(Json(resp))
}
