//! Bearer-token authentication

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// The user a request's bearer token was issued to
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::unauthorized("Authentication credentials were not provided")
                })?;

        match state.auth.user_for_token(bearer.token()) {
            Some(user) => Ok(AuthUser(user.to_string())),
            None => {
                debug!("Rejected unknown bearer token");
                Err(ApiError::unauthorized("Invalid token"))
            }
        }
    }
}
