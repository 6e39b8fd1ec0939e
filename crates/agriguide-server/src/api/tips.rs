//! Daily farming tip endpoint

use agriguide_core::DailyTip;
use axum::{extract::State, Json};

use crate::auth::AuthUser;
use crate::state::AppState;

pub async fn daily_tip(State(state): State<AppState>, AuthUser(_): AuthUser) -> Json<DailyTip> {
    Json(state.tips.daily_tip().await)
}
