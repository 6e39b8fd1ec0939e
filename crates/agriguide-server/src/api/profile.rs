//! Profile and token endpoints for the signed-in user

use agriguide_core::{ProfileUpdate, UserProfile};
use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.profiles.profile(&user).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(update), _): WithRejection<Json<ProfileUpdate>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let profile = state.profiles.update_profile(&user, update).await?;
    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": profile
    })))
}

/// Reaching this handler means the bearer token resolved to a user
pub async fn verify_token(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let profile = state.profiles.profile(&user).await?;
    Ok(Json(json!({ "valid": true, "user": profile })))
}
