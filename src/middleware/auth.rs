use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{config::jwt_secret, dto::auth::Claims, error::AppError, models::Role};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
    pub client_id: Option<Uuid>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Returns the caller's client id, failing for admins and for client accounts
/// that have no client profile attached.
pub fn ensure_client(user: &AuthUser) -> Result<Uuid, AppError> {
    if user.role != Role::Client {
        return Err(AppError::Forbidden);
    }
    user.client_id.ok_or(AppError::NotFound("Client profile"))
}

pub fn ensure_owner_or_admin(user: &AuthUser, client_id: Uuid) -> Result<(), AppError> {
    if user.is_admin() || user.client_id == Some(client_id) {
        return Ok(());
    }
    Err(AppError::Forbidden)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthorized)?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::BadRequest("Invalid Authorization scheme".into()))?
            .trim();

        let secret = jwt_secret()?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized)?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::BadRequest("Invalid user id in token".into()))?;
        let role = Role::parse(&decoded.claims.role).ok_or(AppError::Unauthorized)?;
        let client_id = decoded
            .claims
            .client_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|_| AppError::BadRequest("Invalid client id in token".into()))?;

        Ok(AuthUser {
            user_id,
            role,
            client_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(client_id: Uuid) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Client,
            client_id: Some(client_id),
        }
    }

    #[test]
    fn clients_only_reach_their_own_records() {
        let own = Uuid::new_v4();
        let user = client(own);
        assert!(ensure_owner_or_admin(&user, own).is_ok());
        assert!(matches!(
            ensure_owner_or_admin(&user, Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));
        assert!(ensure_admin(&user).is_err());
        assert_eq!(ensure_client(&user).ok(), Some(own));
    }

    #[test]
    fn admins_pass_ownership_but_are_not_clients() {
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
            client_id: None,
        };
        assert!(ensure_owner_or_admin(&admin, Uuid::new_v4()).is_ok());
        assert!(ensure_admin(&admin).is_ok());
        assert!(matches!(ensure_client(&admin), Err(AppError::Forbidden)));
    }
}
