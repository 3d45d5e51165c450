//! Token issuance endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use crate::error::{GatewayError, GatewayResult};
use crate::models::{TokenIssued, TokenRequest};
use crate::GatewayState;

/// Exchange a tenant secret for a token bound to the tenant's account
#[utoipa::path(
    post,
    path = "/v2/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenIssued),
        (status = 401, description = "Unregistered domain", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 500, description = "Lookup failure", body = ErrorBody)
    ),
    tag = "token"
)]
pub async fn issue_token(
    State(state): State<Arc<GatewayState>>,
    input: Result<Json<TokenRequest>, JsonRejection>,
) -> GatewayResult<Json<TokenIssued>> {
    // A body without a secret matches no tenant
    let Json(input) = input.map_err(|rejection| {
        tracing::info!(status = %rejection.status(), "token requested without a readable secret");
        GatewayError::UnknownTenant
    })?;

    let Some((tenant, account)) = state.registry.find_by_secret(&input.client_secret).await? else {
        tracing::info!("token requested with unregistered secret");
        return Err(GatewayError::UnknownTenant);
    };

    let token = state.codec.issue(account.id, &account.nick, &state.issuer)?;
    tracing::info!(host = %tenant.host, account_id = %account.id, "token issued");

    Ok(Json(TokenIssued {
        code: 200,
        message: "token issued".into(),
        token,
    }))
}
