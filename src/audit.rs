use serde_json::Value;
use uuid::Uuid;

use crate::{error::AppResult, middleware::auth::AuthUser, state::AppState};

pub async fn log_audit(
    state: &AppState,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(&state.pool)
    .await?;

    Ok(())
}

/// Records an action after its transaction committed. A failed write is only logged.
pub async fn record(state: &AppState, actor: &AuthUser, action: &str, resource: &str, metadata: Value) {
    if let Err(err) = log_audit(state, Some(actor.user_id), action, Some(resource), Some(metadata)).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
