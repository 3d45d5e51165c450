//! Gateway request pipeline
//!
//! Requests run through an ordered list of [`Stage`]s before reaching a
//! handler. Each stage either lets the request continue or ends it with a
//! response:
//!
//! ```text
//! Received ─▶ OriginGuard ─▶ CorsLayer ─▶ RateLimit ─▶ [TokenAuth] ─▶ handler
//!                 │              │            │             │
//!                 ▼              ▼            ▼             ▼
//!                500         preflight       429        401 / 419
//! ```
//!
//! The Origin Guard runs as its own pipeline outside the CORS layer so the
//! layer can see the resolved [`Tenant`]. Both pipelines share one
//! [`RequestId`]. No stage holds a lock across an await point.

pub mod auth;
pub mod origin;
pub mod rate_limit;

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::models::Tenant;
use crate::token::Claims;

pub use auth::TokenAuthStage;
pub use origin::OriginGuard;
pub use rate_limit::{RateLimitStage, RateLimiter};

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Request id carried in request extensions across pipelines
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

/// Per-request state shared between stages
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub method: Method,
    pub path: String,
    pub origin: Option<HeaderValue>,
    pub authorization: Option<String>,
    pub client_addr: Option<SocketAddr>,
    /// Tenant resolved from the origin
    pub tenant: Option<Tenant>,
    /// `(limit, remaining)` for the current window
    pub quota: Option<(u64, u64)>,
    pub claims: Option<Claims>,
}

impl RequestContext {
    pub fn from_request(request: &Request) -> Self {
        let headers = request.headers();
        let extensions = request.extensions();

        Self {
            request_id: extensions
                .get::<RequestId>()
                .map_or_else(Uuid::new_v4, |RequestId(id)| *id),
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            origin: headers.get(header::ORIGIN).cloned(),
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            client_addr: extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
            tenant: extensions.get::<Tenant>().cloned(),
            quota: None,
            claims: None,
        }
    }

    /// Decorate an outgoing response with quota headers
    fn finish(&self, mut response: Response) -> Response {
        if let Some((limit, remaining)) = self.quota {
            let headers = response.headers_mut();
            headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
        }

        response
    }
}

/// Result of running one stage
pub enum StageOutcome {
    Continue,
    /// End the request with an error
    Reject(GatewayError),
    /// End the request with a prepared response
    Respond(Response),
}

/// One step of the request pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &mut RequestContext) -> StageOutcome;
}

/// Fixed, ordered list of stages
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Arc<dyn Stage>]>,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages: stages.into(),
        }
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order. Returns the terminal response, if any stage
    /// produced one.
    pub async fn run(&self, ctx: &mut RequestContext) -> Option<Response> {
        for stage in self.stages.iter() {
            match stage.run(ctx).await {
                StageOutcome::Continue => {}
                StageOutcome::Reject(err) => {
                    tracing::debug!(stage = stage.name(), error = %err, "request rejected");
                    return Some(err.into_response());
                }
                StageOutcome::Respond(response) => {
                    tracing::debug!(stage = stage.name(), "request answered by stage");
                    return Some(response);
                }
            }
        }
        None
    }
}

/// Authenticated caller, available to handlers behind [`TokenAuthStage`]
#[derive(Debug, Clone)]
pub struct Authenticated(pub Claims);

/// Axum middleware running a [`Pipeline`] in front of the inner router
pub async fn gateway(State(pipeline): State<Pipeline>, mut request: Request, next: Next) -> Response {
    let mut ctx = RequestContext::from_request(&request);
    let span = tracing::info_span!(
        "gateway",
        request_id = %ctx.request_id,
        method = %ctx.method,
        path = %ctx.path,
    );

    async move {
        let response = match pipeline.run(&mut ctx).await {
            Some(response) => response,
            None => {
                request.extensions_mut().insert(RequestId(ctx.request_id));
                if let Some(claims) = ctx.claims.clone() {
                    request.extensions_mut().insert(Authenticated(claims));
                }
                if let Some(tenant) = ctx.tenant.clone() {
                    request.extensions_mut().insert(tenant);
                }
                next.run(request).await
            }
        };

        tracing::debug!(status = response.status().as_u16(), "request finished");
        ctx.finish(response)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use crate::models::{AccountId, ClientSecret, Tier};
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        name: &'static str,
        hits: Arc<AtomicUsize>,
        reject: bool,
    }

    #[async_trait]
    impl Stage for Counting {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, _ctx: &mut RequestContext) -> StageOutcome {
            self.hits.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                StageOutcome::Reject(GatewayError::InvalidToken)
            } else {
                StageOutcome::Continue
            }
        }
    }

    fn ctx() -> RequestContext {
        let request = axum::http::Request::builder().uri("/v2/test").body(Body::empty()).unwrap();
        RequestContext::from_request(&request)
    }

    #[tokio::test]
    async fn test_stops_at_first_terminal_stage() {
        let hits: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(Counting { name: "a", hits: hits[0].clone(), reject: false }),
            Arc::new(Counting { name: "b", hits: hits[1].clone(), reject: true }),
            Arc::new(Counting { name: "c", hits: hits[2].clone(), reject: false }),
        ];
        let pipeline = Pipeline::new(stages);

        let response = pipeline.run(&mut ctx()).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(pipeline.stage_names(), vec!["a", "b", "c"]);
        assert_eq!(hits[0].load(Ordering::SeqCst), 1);
        assert_eq!(hits[1].load(Ordering::SeqCst), 1);
        assert_eq!(hits[2].load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_continue_yields_none() {
        let hits = Arc::new(AtomicUsize::new(0));
        let stage: Arc<dyn Stage> = Arc::new(Counting { name: "a", hits, reject: false });
        let pipeline = Pipeline::new(vec![stage]);

        assert!(pipeline.run(&mut ctx()).await.is_none());
    }

    #[test]
    fn test_context_reads_raw_authorization() {
        let request = axum::http::Request::builder()
            .uri("/v2/posts/my")
            .header(header::AUTHORIZATION, "raw.token.value")
            .header(header::ORIGIN, "http://app.example.com")
            .body(Body::empty())
            .unwrap();

        let ctx = RequestContext::from_request(&request);
        assert_eq!(ctx.authorization.as_deref(), Some("raw.token.value"));
        assert!(ctx.client_addr.is_none());
        assert!(ctx.tenant.is_none());
    }

    #[test]
    fn test_context_picks_up_outer_pipeline_state() {
        let id = Uuid::new_v4();
        let tenant = Tenant {
            host: "app.example.com".into(),
            client_secret: ClientSecret::new("abc123"),
            tier: Tier::Premium,
            account_id: AccountId(7),
        };
        let mut request = axum::http::Request::builder()
            .uri("/v2/test")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(RequestId(id));
        request.extensions_mut().insert(tenant);

        let ctx = RequestContext::from_request(&request);
        assert_eq!(ctx.request_id, id);
        assert_eq!(ctx.tenant.unwrap().tier, Tier::Premium);
    }
}
