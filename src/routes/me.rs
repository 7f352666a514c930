use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::{clients::ClientStats, orders::OrderList},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_client},
    models::Client,
    response::ApiResponse,
    routes::params::Pagination,
    services::{client_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(my_profile))
        .route("/orders", get(my_orders))
        .route("/stats", get(my_stats))
}

#[utoipa::path(
    get,
    path = "/api/me/profile",
    responses(
        (status = 200, description = "Profile of the logged-in client", body = ApiResponse<Client>),
        (status = 403, description = "Caller is not a client"),
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn my_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Client>>> {
    let resp = client_service::my_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/me/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Own order history, newest first", body = ApiResponse<OrderList>),
        (status = 403, description = "Caller is not a client"),
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let client_id = ensure_client(&user)?;
    let resp = order_service::list_client_orders(&state, &user, client_id, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/me/stats",
    responses(
        (status = 200, description = "Loyalty tier and spending totals", body = ApiResponse<ClientStats>),
        (status = 403, description = "Caller is not a client"),
    ),
    security(("bearer_auth" = [])),
    tag = "Me"
)]
pub async fn my_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ClientStats>>> {
    let resp = client_service::my_stats(&state, &user).await?;
    Ok(Json(resp))
}
