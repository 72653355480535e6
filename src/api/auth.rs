//! Request identity. An upstream gateway authenticates the caller and sets
//! `X-User-Id`; this service only loads the user it names.

use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::AppState;
use crate::domain::aggregates::User;
use crate::ShopError;

pub const USER_HEADER: &str = "x-user-id";

pub struct CurrentUser(pub User);

/// A [`CurrentUser`] that is also an admin.
pub struct AdminUser(pub User);

fn user_id(parts: &Parts) -> Option<Uuid> {
    let raw = parts.headers.get(USER_HEADER)?.to_str().ok()?;
    Uuid::parse_str(raw.trim()).ok()
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = user_id(parts).ok_or_else(|| ShopError::Forbidden("please sign in".into()))?;
        match state.users.get(id).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(ShopError::NotFound(_)) => Err(ShopError::Forbidden("unknown user".into())),
            Err(e) => Err(e),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        user.require_admin()?;
        Ok(AdminUser(user))
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/users", post(register))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
}

/// Creates a customer account. Admins are made by promotion only.
async fn register(State(s): State<AppState>, Json(r): Json<RegisterRequest>) -> crate::Result<(StatusCode, Json<User>)> {
    r.validate()?;
    let user = s.users.create(&r.email, &r.first_name, &r.last_name).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
