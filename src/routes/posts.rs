//! Post endpoints, scoped by the token's account

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::error::{GatewayError, GatewayResult};
use crate::middleware::Authenticated;
use crate::models::PostsResponse;
use crate::token::Claims;
use crate::GatewayState;

/// Echo the decoded token
#[utoipa::path(
    get,
    path = "/v2/test",
    responses(
        (status = 200, description = "Decoded token claims", body = Claims),
        (status = 401, description = "Invalid token", body = ErrorBody),
        (status = 419, description = "Expired token", body = ErrorBody)
    ),
    security(("token" = [])),
    tag = "posts"
)]
pub async fn whoami(Extension(Authenticated(claims)): Extension<Authenticated>) -> Json<Claims> {
    Json(claims)
}

/// Posts written by the caller
#[utoipa::path(
    get,
    path = "/v2/posts/my",
    responses(
        (status = 200, description = "Caller's posts", body = PostsResponse),
        (status = 401, description = "Invalid token", body = ErrorBody),
        (status = 419, description = "Expired token", body = ErrorBody)
    ),
    security(("token" = [])),
    tag = "posts"
)]
pub async fn my_posts(
    State(state): State<Arc<GatewayState>>,
    Extension(Authenticated(claims)): Extension<Authenticated>,
) -> GatewayResult<Json<PostsResponse>> {
    let posts = state.content.posts_by_account(claims.id).await?;

    Ok(Json(PostsResponse {
        code: 200,
        payload: posts,
    }))
}

/// Posts tagged with a hashtag
#[utoipa::path(
    get,
    path = "/v2/posts/hashtag/{title}",
    params(("title" = String, Path, description = "Hashtag title")),
    responses(
        (status = 200, description = "Tagged posts", body = PostsResponse),
        (status = 404, description = "Unknown hashtag", body = ErrorBody),
        (status = 401, description = "Invalid token", body = ErrorBody),
        (status = 419, description = "Expired token", body = ErrorBody)
    ),
    security(("token" = [])),
    tag = "posts"
)]
pub async fn posts_by_hashtag(
    State(state): State<Arc<GatewayState>>,
    Path(title): Path<String>,
) -> GatewayResult<Json<PostsResponse>> {
    let Some(hashtag) = state.content.find_hashtag(&title).await? else {
        return Err(GatewayError::NotFound("no results found".into()));
    };
    let posts = state.content.posts_by_hashtag(&hashtag).await?;

    Ok(Json(PostsResponse {
        code: 200,
        payload: posts,
    }))
}
