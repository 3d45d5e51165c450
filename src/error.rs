//! Gateway errors and their HTTP mapping

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::content::ContentError;
use crate::models::{ErrorBody, Tier};
use crate::registry::RegistryError;
use crate::token::TokenError;

/// Non-standard status reserved for expired tokens
pub const TOKEN_EXPIRED_STATUS: u16 = 419;

/// Client-facing errors.
///
/// Messages never carry secrets or token material.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No tenant matches the presented secret
    #[error("unregistered domain, register the domain first")]
    UnknownTenant,

    /// Signature or claim set rejected
    #[error("invalid token")]
    InvalidToken,

    /// Token decoded but past its expiry
    #[error("token expired")]
    TokenExpired,

    /// Tier quota exhausted for the current window
    #[error("{message}")]
    RateLimited {
        tier: Tier,
        message: String,
        retry_after_secs: u64,
    },

    #[error("{0}")]
    NotFound(String),

    /// Retired API version
    #[error("a new version is available, use the new version")]
    Deprecated,

    /// External lookup failed. The detail is logged, never returned.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl GatewayError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnknownTenant | GatewayError::InvalidToken => StatusCode::UNAUTHORIZED,
            GatewayError::TokenExpired => {
                StatusCode::from_u16(TOKEN_EXPIRED_STATUS).unwrap_or(StatusCode::UNAUTHORIZED)
            }
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Deprecated => StatusCode::GONE,
            GatewayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body returned to the caller
    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            GatewayError::Upstream(_) => "server error".to_string(),
            other => other.to_string(),
        };
        ErrorBody {
            code: self.status_code().as_u16(),
            message,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if let GatewayError::Upstream(detail) = &self {
            tracing::error!(%detail, "upstream lookup failed");
        }

        let status = self.status_code();
        let mut response = (status, Json(self.to_body())).into_response();

        if let GatewayError::RateLimited { retry_after_secs, .. } = &self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
        }

        response
    }
}

impl From<TokenError> for GatewayError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => GatewayError::TokenExpired,
            TokenError::Invalid(_) => GatewayError::InvalidToken,
            TokenError::Signing(detail) => GatewayError::Upstream(detail),
        }
    }
}

impl From<RegistryError> for GatewayError {
    fn from(err: RegistryError) -> Self {
        GatewayError::Upstream(err.to_string())
    }
}

impl From<ContentError> for GatewayError {
    fn from(err: ContentError) -> Self {
        GatewayError::Upstream(err.to_string())
    }
}

/// Result type for gateway handlers
pub type GatewayResult<T> = Result<T, GatewayError>;
