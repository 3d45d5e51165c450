//! Follow graph endpoint

use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::error::{GatewayError, GatewayResult};
use crate::middleware::Authenticated;
use crate::models::FollowResponse;
use crate::GatewayState;

/// Followers and followings of the caller
#[utoipa::path(
    get,
    path = "/v2/follow",
    responses(
        (status = 200, description = "Follow graph", body = FollowResponse),
        (status = 404, description = "Account not found", body = ErrorBody),
        (status = 401, description = "Invalid token", body = ErrorBody),
        (status = 419, description = "Expired token", body = ErrorBody)
    ),
    security(("token" = [])),
    tag = "follow"
)]
pub async fn follow_graph(
    State(state): State<Arc<GatewayState>>,
    Extension(Authenticated(claims)): Extension<Authenticated>,
) -> GatewayResult<Json<FollowResponse>> {
    let Some(account) = state.content.find_account(claims.id).await? else {
        return Err(GatewayError::NotFound("account not found".into()));
    };

    let follower = state.content.followers(account.id).await?;
    let following = state.content.followings(account.id).await?;

    Ok(Json(FollowResponse {
        code: 200,
        follower,
        following,
    }))
}
