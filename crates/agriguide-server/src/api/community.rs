//! Community board endpoints: posts, likes and comments

use agriguide_core::community::{LikeOutcome, PostComment};
use agriguide_core::{NewPost, PostView};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

pub async fn list_posts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Query(query), _): WithRejection<Query<FeedQuery>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let posts = state.community.feed(&user, query.limit).await?;
    Ok(Json(json!({ "posts": posts })))
}

pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(new_post), _): WithRejection<Json<NewPost>, ApiError>,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    let post = state.community.create_post(&user, new_post).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
) -> Result<Json<PostView>, ApiError> {
    Ok(Json(state.community.post(&user, &post_id).await?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.community.delete_post(&user, &post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
) -> Result<Json<LikeOutcome>, ApiError> {
    Ok(Json(state.community.toggle_like(&user, &post_id).await?))
}

pub async fn list_comments(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(post_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let comments = state.community.comments(&post_id).await?;
    Ok(Json(json!({ "comments": comments })))
}

pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<CommentRequest>, ApiError>,
) -> Result<(StatusCode, Json<PostComment>), ApiError> {
    let comment = state
        .community
        .add_comment(&user, &post_id, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
