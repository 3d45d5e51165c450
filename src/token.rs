//! Token Codec
//!
//! Stateless HS256 bearer tokens. A token carries the account id, display
//! name, issuer and its issue/expiry timestamps; nothing is stored server side.
//! Expiry is checked against the injected [`Clock`] with no leeway, after the
//! signature has been verified.

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::models::AccountId;

/// Lifetime of an issued token
pub const TOKEN_TTL_SECS: i64 = 30 * 60;

/// Token claims
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    pub id: AccountId,
    pub nick: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Token codec errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Signs and verifies bearer tokens
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Create a codec keyed with a shared secret
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is enforced against `clock`, strictly.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            clock,
        }
    }

    /// Issue a token valid for [`TOKEN_TTL_SECS`] from now
    pub fn issue(
        &self,
        account_id: AccountId,
        display_name: &str,
        issuer: &str,
    ) -> Result<String, TokenError> {
        let now = self.clock.now();
        let exp = now + Duration::seconds(TOKEN_TTL_SECS);

        let claims = Claims {
            id: account_id,
            nick: display_name.to_string(),
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token and return its claims unchanged
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        if self.clock.now().timestamp() > data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    const SECRET: &[u8] = b"nodebird-test-secret";

    fn codec() -> (TokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        (TokenCodec::new(SECRET, clock.clone()), clock)
    }

    fn tamper(token: &str) -> String {
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let payload = &mut parts[1];
        let mid = payload.len() / 2;
        let replacement = if &payload[mid..mid + 1] == "A" { "B" } else { "A" };
        payload.replace_range(mid..mid + 1, replacement);
        parts.join(".")
    }

    #[test]
    fn test_issue_then_verify_returns_claims() {
        let (codec, clock) = codec();
        let token = codec.issue(AccountId(7), "kim", "nodebird").unwrap();

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.id, AccountId(7));
        assert_eq!(claims.nick, "kim");
        assert_eq!(claims.iss, "nodebird");
        assert_eq!(claims.iat, clock.now().timestamp());
        assert_eq!(claims.exp, claims.iat + TOKEN_TTL_SECS);
    }

    #[test]
    fn test_issue_is_deterministic_for_fixed_clock() {
        let (codec, _) = codec();
        let a = codec.issue(AccountId(1), "lee", "nodebird").unwrap();
        let b = codec.issue(AccountId(1), "lee", "nodebird").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_valid_at_exact_expiry() {
        let (codec, clock) = codec();
        let token = codec.issue(AccountId(7), "kim", "nodebird").unwrap();

        clock.advance(Duration::seconds(TOKEN_TTL_SECS));
        assert!(codec.verify(&token).is_ok());
    }

    #[test]
    fn test_expired_one_second_after_expiry() {
        let (codec, clock) = codec();
        let token = codec.issue(AccountId(7), "kim", "nodebird").unwrap();

        clock.advance(Duration::seconds(TOKEN_TTL_SECS + 1));
        assert!(matches!(codec.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let (codec, _) = codec();
        let token = codec.issue(AccountId(7), "kim", "nodebird").unwrap();

        assert!(matches!(codec.verify(&tamper(&token)), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_tampered_expired_token_is_invalid() {
        let (codec, clock) = codec();
        let token = codec.issue(AccountId(7), "kim", "nodebird").unwrap();
        clock.advance(Duration::hours(2));

        assert!(matches!(codec.verify(&tamper(&token)), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_foreign_key_is_invalid() {
        let (codec, clock) = codec();
        let other = TokenCodec::new(b"some-other-secret", clock);
        let token = other.issue(AccountId(7), "kim", "nodebird").unwrap();

        assert!(matches!(codec.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let (codec, _) = codec();
        assert!(matches!(codec.verify(""), Err(TokenError::Invalid(_))));
        assert!(matches!(codec.verify("not.a.token"), Err(TokenError::Invalid(_))));
    }
}
