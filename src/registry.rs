//! Tenant Registry Client
//!
//! Read-only lookup of registered domains. The gateway never writes through
//! this interface; registration belongs to a separate component.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::models::{Account, AccountId, Tenant};

/// Registry result type
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("tenant {host} references unknown account {account_id}")]
    DanglingAccount { host: String, account_id: AccountId },
}

/// Lookup of tenants by origin host or by secret
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Tenant registered for an origin host
    async fn find_by_origin(&self, host: &str) -> RegistryResult<Option<Tenant>>;

    /// Tenant owning a secret, together with its account
    async fn find_by_secret(&self, secret: &str) -> RegistryResult<Option<(Tenant, Account)>>;
}

/// In-memory registry (for development and testing)
pub struct InMemoryTenantRegistry {
    by_host: RwLock<HashMap<String, Tenant>>,
    hosts_by_secret: RwLock<HashMap<String, String>>,
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryTenantRegistry {
    pub fn new() -> Self {
        Self {
            by_host: RwLock::new(HashMap::new()),
            hosts_by_secret: RwLock::new(HashMap::new()),
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Build a registry from seed records
    pub fn seeded(tenants: Vec<Tenant>, accounts: Vec<Account>) -> Self {
        let registry = Self::new();
        for account in accounts {
            registry.insert_account(account);
        }
        for tenant in tenants {
            registry.insert_tenant(tenant);
        }
        registry
    }

    pub fn insert_account(&self, account: Account) {
        self.accounts.write().insert(account.id, account);
    }

    /// Register a tenant, replacing any previous record for the same host
    pub fn insert_tenant(&self, tenant: Tenant) {
        let mut by_host = self.by_host.write();
        let mut by_secret = self.hosts_by_secret.write();

        if let Some(previous) = by_host.get(&tenant.host) {
            by_secret.remove(previous.client_secret.expose());
        }
        by_secret.insert(tenant.client_secret.expose().to_string(), tenant.host.clone());
        by_host.insert(tenant.host.clone(), tenant);
    }

    pub fn len(&self) -> usize {
        self.by_host.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryTenantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TenantRegistry for InMemoryTenantRegistry {
    async fn find_by_origin(&self, host: &str) -> RegistryResult<Option<Tenant>> {
        Ok(self.by_host.read().get(host).cloned())
    }

    async fn find_by_secret(&self, secret: &str) -> RegistryResult<Option<(Tenant, Account)>> {
        let tenant = {
            let by_secret = self.hosts_by_secret.read();
            let Some(host) = by_secret.get(secret) else {
                return Ok(None);
            };
            match self.by_host.read().get(host) {
                Some(tenant) => tenant.clone(),
                None => return Ok(None),
            }
        };

        let account = self.accounts.read().get(&tenant.account_id).cloned();
        match account {
            Some(account) => Ok(Some((tenant, account))),
            None => Err(RegistryError::DanglingAccount {
                host: tenant.host,
                account_id: tenant.account_id,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClientSecret, Tier};

    fn registry() -> InMemoryTenantRegistry {
        InMemoryTenantRegistry::seeded(
            vec![Tenant {
                host: "app.example.com".into(),
                client_secret: ClientSecret::new("abc123"),
                tier: Tier::Free,
                account_id: AccountId(7),
            }],
            vec![Account { id: AccountId(7), nick: "kim".into() }],
        )
    }

    #[tokio::test]
    async fn test_find_by_origin() {
        let registry = registry();

        let tenant = registry.find_by_origin("app.example.com").await.unwrap().unwrap();
        assert_eq!(tenant.tier, Tier::Free);
        assert!(registry.find_by_origin("evil.example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_secret_joins_account() {
        let registry = registry();

        let (tenant, account) = registry.find_by_secret("abc123").await.unwrap().unwrap();
        assert_eq!(tenant.host, "app.example.com");
        assert_eq!(account.nick, "kim");
        assert!(registry.find_by_secret("bogus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replacing_tenant_retires_old_secret() {
        let registry = registry();
        registry.insert_tenant(Tenant {
            host: "app.example.com".into(),
            client_secret: ClientSecret::new("rotated"),
            tier: Tier::Premium,
            account_id: AccountId(7),
        });

        assert_eq!(registry.len(), 1);
        assert!(registry.find_by_secret("abc123").await.unwrap().is_none());
        assert!(registry.find_by_secret("rotated").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_dangling_account_is_an_error() {
        let registry = InMemoryTenantRegistry::new();
        registry.insert_tenant(Tenant {
            host: "orphan.example.com".into(),
            client_secret: ClientSecret::new("orphan"),
            tier: Tier::Free,
            account_id: AccountId(99),
        });

        assert!(matches!(
            registry.find_by_secret("orphan").await,
            Err(RegistryError::DanglingAccount { .. })
        ));
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let tenant = registry().by_host.read().get("app.example.com").cloned().unwrap();
        assert!(!format!("{:?}", tenant).contains("abc123"));
    }
}
