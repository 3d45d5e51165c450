//! API Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

// ============ Tenants ============

/// Usage tier of a registered domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Free
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Free => f.write_str("free"),
            Tier::Premium => f.write_str("premium"),
        }
    }
}

/// Shared secret a tenant exchanges for tokens.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(***)")
    }
}

/// Registered third-party domain
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Origin host, including the port when one is used
    pub host: String,
    pub client_secret: ClientSecret,
    #[serde(default)]
    pub tier: Tier,
    /// Account that registered the domain
    pub account_id: AccountId,
}

// ============ Accounts ============

/// Account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account as exposed through the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    pub id: AccountId,
    pub nick: String,
}

// ============ Content ============

/// Post owned by an account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub content: String,
    #[serde(default)]
    pub img: Option<String>,
    pub user_id: AccountId,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Hashtag titles attached to the post
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// Hashtag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Hashtag {
    pub title: String,
}

/// Directed follow edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub follower_id: AccountId,
    pub following_id: AccountId,
}

// ============ Envelopes ============

/// Token issuance request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub client_secret: String,
}

/// Token issuance response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenIssued {
    pub code: u16,
    pub message: String,
    pub token: String,
}

/// Post listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostsResponse {
    pub code: u16,
    pub payload: Vec<Post>,
}

/// Follow graph of the token's account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FollowResponse {
    pub code: u16,
    pub follower: Vec<Account>,
    pub following: Vec<Account>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}
