//! Token authentication stage

use async_trait::async_trait;
use std::sync::Arc;

use super::{RequestContext, Stage, StageOutcome};
use crate::error::GatewayError;
use crate::token::{TokenCodec, TokenError};

/// Verifies the raw token in `Authorization` (no `Bearer ` prefix)
pub struct TokenAuthStage {
    codec: Arc<TokenCodec>,
}

impl TokenAuthStage {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

#[async_trait]
impl Stage for TokenAuthStage {
    fn name(&self) -> &'static str {
        "token_auth"
    }

    async fn run(&self, ctx: &mut RequestContext) -> StageOutcome {
        let Some(token) = ctx.authorization.as_deref() else {
            return StageOutcome::Reject(GatewayError::InvalidToken);
        };

        match self.codec.verify(token) {
            Ok(claims) => {
                tracing::debug!(account_id = %claims.id, "token verified");
                ctx.claims = Some(claims);
                StageOutcome::Continue
            }
            Err(TokenError::Expired) => StageOutcome::Reject(GatewayError::TokenExpired),
            Err(e) => {
                tracing::debug!(error = %e, "token rejected");
                StageOutcome::Reject(GatewayError::from(e))
            }
        }
    }
}
