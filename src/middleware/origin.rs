//! Origin Guard
//!
//! Resolves the tenant behind a request's `Origin` and grants CORS only to
//! registered origins, echoing the exact origin back. Unregistered or missing
//! origins pass through without CORS headers; the browser's same-origin policy
//! does the blocking.

use async_trait::async_trait;
use axum::http::{request::Parts, HeaderValue, Uri};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::{RequestContext, Stage, StageOutcome};
use crate::config::CorsConfig;
use crate::error::GatewayError;
use crate::models::Tenant;
use crate::registry::TenantRegistry;

/// Host (with port) of an `Origin` header value.
///
/// Returns `None` for `null`, non-UTF-8 or scheme-less values.
pub fn origin_host(origin: &HeaderValue) -> Option<String> {
    let raw = origin.to_str().ok()?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return None;
    }

    let uri: Uri = raw.parse().ok()?;
    uri.scheme()?;
    let authority = uri.authority()?;
    Some(authority.as_str().to_ascii_lowercase())
}

/// Build the CORS layer.
///
/// An origin is allowed only when the [`OriginGuard`] placed a [`Tenant`] in
/// the request extensions, so the layer must sit inside the guard.
pub fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let methods = cors.methods().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring CORS methods");
        Vec::new()
    });
    let headers = cors.headers().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring CORS headers");
        Vec::new()
    });

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|_origin: &HeaderValue, parts: &Parts| {
            parts.extensions.get::<Tenant>().is_some()
        }))
        .allow_methods(methods)
        .allow_headers(headers)
        .max_age(Duration::from_secs(cors.max_age_secs))
}

/// Pipeline stage resolving the tenant from the request origin
pub struct OriginGuard {
    registry: Arc<dyn TenantRegistry>,
}

impl OriginGuard {
    pub fn new(registry: Arc<dyn TenantRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Stage for OriginGuard {
    fn name(&self) -> &'static str {
        "origin_guard"
    }

    async fn run(&self, ctx: &mut RequestContext) -> StageOutcome {
        let Some(host) = ctx.origin.as_ref().and_then(origin_host) else {
            return StageOutcome::Continue;
        };

        match self.registry.find_by_origin(&host).await {
            Ok(Some(tenant)) => {
                tracing::debug!(%host, tier = %tenant.tier, "origin matched tenant");
                ctx.tenant = Some(tenant);
                StageOutcome::Continue
            }
            Ok(None) => {
                tracing::debug!(%host, "origin not registered, no CORS granted");
                StageOutcome::Continue
            }
            Err(e) => StageOutcome::Reject(GatewayError::from(e)),
        }
    }
}
