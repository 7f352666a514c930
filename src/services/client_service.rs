use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        loyalty::{LoyaltyLedger, LoyaltyTier},
        money::Cents,
    },
    dto::clients::{ClientList, ClientStats, CreateClientRequest, UpdateClientRequest},
    entity::{
        clients::{ActiveModel as ClientActive, Column as ClientCol, Entity as Clients},
        orders::{Column as OrderCol, Entity as Orders},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_client, ensure_owner_or_admin},
    models::{Client, Role, client_from_entity},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::auth_service::hash_password,
    state::AppState,
};

pub async fn create_client(
    state: &AppState,
    user: &AuthUser,
    payload: CreateClientRequest,
) -> AppResult<ApiResponse<Client>> {
    ensure_admin(user)?;
    let username = payload.username.trim().to_string();
    if username.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "username and password are required".into(),
        ));
    }
    if payload.company_name.trim().is_empty() {
        return Err(AppError::BadRequest("company_name is required".into()));
    }

    let password_hash = hash_password(&payload.password)?;

    let txn = state.orm.begin().await?;

    let taken = Users::find()
        .filter(UserCol::Username.eq(username.as_str()))
        .one(&txn)
        .await?;
    if taken.is_some() {
        return Err(AppError::BadRequest("Username is already taken".into()));
    }

    let client = ClientActive {
        id: Set(Uuid::new_v4()),
        company_name: Set(payload.company_name),
        contact_name: Set(payload.contact_name),
        email: Set(payload.email),
        phone: Set(payload.phone),
        address: Set(payload.address),
        loyalty_tier: Set(LoyaltyTier::Basic.as_str().into()),
        total_orders: Set(0),
        total_spent: Set(0),
        first_order_at: Set(None),
        last_order_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        password_hash: Set(password_hash),
        role: Set(Role::Client.as_str().into()),
        client_id: Set(Some(client.id)),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    audit::record(
        state,
        user,
        "client_create",
        "clients",
        serde_json::json!({ "client_id": client.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Client created",
        client_from_entity(client),
        Some(Meta::empty()),
    ))
}

pub async fn get_client(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Client>> {
    ensure_owner_or_admin(user, id)?;
    let client = find_client(state, id).await?;
    Ok(ApiResponse::success("Client", client, Some(Meta::empty())))
}

pub async fn list_clients(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ClientList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Clients::find().order_by_desc(ClientCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(client_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Clients",
        ClientList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Profile fields only. Totals and tier belong to the loyalty ledger.
pub async fn update_client(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateClientRequest,
) -> AppResult<ApiResponse<Client>> {
    ensure_owner_or_admin(user, id)?;
    let existing = Clients::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Client"))?;

    let mut active: ClientActive = existing.into();
    if let Some(company_name) = payload.company_name {
        if company_name.trim().is_empty() {
            return Err(AppError::BadRequest("company_name must not be empty".into()));
        }
        active.company_name = Set(company_name);
    }
    if let Some(contact_name) = payload.contact_name {
        active.contact_name = Set(Some(contact_name));
    }
    if let Some(email) = payload.email {
        active.email = Set(Some(email));
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(address) = payload.address {
        active.address = Set(Some(address));
    }
    active.updated_at = Set(Utc::now().into());

    let client = active.update(&state.orm).await?;

    audit::record(
        state,
        user,
        "client_update",
        "clients",
        serde_json::json!({ "client_id": client.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        client_from_entity(client),
        Some(Meta::empty()),
    ))
}

/// Removes the client and its login account. Clients with order history are kept.
pub async fn delete_client(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    let client = Clients::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Client"))?;

    let orders = Orders::find()
        .filter(OrderCol::ClientId.eq(client.id))
        .count(&txn)
        .await?;
    if orders > 0 {
        return Err(AppError::InvalidState(format!(
            "Client has {orders} order(s) and cannot be deleted"
        )));
    }

    Users::delete_many()
        .filter(UserCol::ClientId.eq(client.id))
        .exec(&txn)
        .await?;
    Clients::delete_by_id(client.id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        state,
        user,
        "client_delete",
        "clients",
        serde_json::json!({ "client_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn my_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Client>> {
    let client_id = ensure_client(user)?;
    let client = find_client(state, client_id).await?;
    Ok(ApiResponse::success("Profile", client, Some(Meta::empty())))
}

pub async fn my_stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ClientStats>> {
    let client_id = ensure_client(user)?;
    let client = find_client(state, client_id).await?;
    Ok(ApiResponse::success(
        "Stats",
        ClientStats::from(client),
        Some(Meta::empty()),
    ))
}

/// Loyalty ledger step of order confirmation. Runs inside the confirming
/// transaction and locks the client row so concurrent confirmations for the
/// same client add up.
pub(crate) async fn record_confirmed_order(
    txn: &DatabaseTransaction,
    client_id: Uuid,
    order_total: Cents,
    ordered_at: DateTime<Utc>,
) -> AppResult<()> {
    let client = Clients::find_by_id(client_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound("Client"))?;

    let ledger = LoyaltyLedger {
        total_orders: client.total_orders,
        total_spent: client.total_spent,
        first_order_at: client.first_order_at.map(|dt| dt.with_timezone(&Utc)),
        last_order_at: client.last_order_at.map(|dt| dt.with_timezone(&Utc)),
        tier: LoyaltyTier::from_stored(&client.loyalty_tier),
    }
    .record_confirmed_order(order_total, ordered_at);

    let previous_tier = client.loyalty_tier.clone();
    let mut active: ClientActive = client.into();
    active.total_orders = Set(ledger.total_orders);
    active.total_spent = Set(ledger.total_spent);
    active.first_order_at = Set(ledger.first_order_at.map(Into::into));
    active.last_order_at = Set(ledger.last_order_at.map(Into::into));
    active.loyalty_tier = Set(ledger.tier.as_str().into());
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await?;

    if previous_tier != ledger.tier.as_str() {
        tracing::info!(
            client_id = %client_id,
            from = %previous_tier,
            to = ledger.tier.as_str(),
            "loyalty tier changed"
        );
    }

    Ok(())
}

async fn find_client(state: &AppState, id: Uuid) -> AppResult<Client> {
    Clients::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(client_from_entity)
        .ok_or(AppError::NotFound("Client"))
}
