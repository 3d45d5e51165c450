//! Rate Limiter
//!
//! Fixed-window counters keyed by tenant. Each key owns one window that starts
//! at its first request and resets once the window length has elapsed; every
//! request inside the window increments the same counter. The window store is
//! capacity bounded and swept of stale entries by a background task.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;

use super::{RequestContext, Stage, StageOutcome};
use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::GatewayError;
use crate::models::Tier;

/// Key shared by callers with neither a tenant nor a known address
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Outcome of a rate limit check
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { limit: u64, remaining: u64 },
    Limited { limit: u64, retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug)]
struct Window {
    started_at: DateTime<Utc>,
    count: u64,
}

/// Per-key fixed-window rate limiter
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            clock,
        }
    }

    fn window_len(&self) -> Duration {
        Duration::seconds(self.config.window_secs as i64)
    }

    /// Count a request against `key` using the quota of `tier`.
    ///
    /// The increment and the comparison happen under the key's shard lock, so
    /// concurrent callers never over-admit. Consumption is never refunded.
    pub fn check(&self, key: &str, tier: Tier) -> RateDecision {
        let now = self.clock.now();
        let limit = self.config.for_tier(tier).max_requests;
        let window_len = self.window_len();

        if !self.windows.contains_key(key) && self.windows.len() >= self.config.max_tracked_windows {
            self.make_room(now);
        }

        let mut window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Window { started_at: now, count: 0 });

        if now - window.started_at >= window_len {
            window.started_at = now;
            window.count = 0;
        }
        window.count += 1;

        if window.count <= limit {
            RateDecision::Allowed {
                limit,
                remaining: limit - window.count,
            }
        } else {
            let reset_in = window.started_at + window_len - now;
            RateDecision::Limited {
                limit,
                retry_after_secs: reset_in.num_seconds().max(1) as u64,
            }
        }
    }

    /// Drop windows that have fully elapsed. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let window_len = self.window_len();
        let before = self.windows.len();
        self.windows.retain(|_, w| now - w.started_at < window_len);
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked windows
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    fn make_room(&self, now: DateTime<Utc>) {
        let window_len = self.window_len();
        self.windows.retain(|_, w| now - w.started_at < window_len);

        if self.windows.len() < self.config.max_tracked_windows {
            return;
        }

        let oldest = self
            .windows
            .iter()
            .min_by_key(|entry| entry.value().started_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            tracing::warn!(
                capacity = self.config.max_tracked_windows,
                "rate window store full, evicting oldest window"
            );
            self.windows.remove(&key);
        }
    }
}

/// Run [`RateLimiter::sweep`] on the configured interval
pub fn spawn_sweeper(limiter: Arc<RateLimiter>) -> JoinHandle<()> {
    let period = StdDuration::from_secs(limiter.config.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let removed = limiter.sweep();
            if removed > 0 {
                tracing::debug!(removed, remaining = limiter.tracked(), "swept rate windows");
            }
        }
    })
}

/// Pipeline stage charging each request to its tenant's window
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
}

impl RateLimitStage {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }

    fn key_for(ctx: &RequestContext) -> (String, Tier) {
        match (&ctx.tenant, ctx.client_addr) {
            (Some(tenant), _) => (format!("tenant:{}", tenant.host), tenant.tier),
            (None, Some(addr)) => (format!("addr:{}", addr.ip()), Tier::Free),
            (None, None) => (ANONYMOUS_KEY.to_string(), Tier::Free),
        }
    }
}

#[async_trait]
impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn run(&self, ctx: &mut RequestContext) -> StageOutcome {
        let (key, tier) = Self::key_for(ctx);

        match self.limiter.check(&key, tier) {
            RateDecision::Allowed { limit, remaining } => {
                ctx.quota = Some((limit, remaining));
                StageOutcome::Continue
            }
            RateDecision::Limited { limit, retry_after_secs } => {
                tracing::info!(%key, %tier, limit, "rate limit exceeded");
                ctx.quota = Some((limit, 0));
                StageOutcome::Reject(GatewayError::RateLimited {
                    tier,
                    message: self.limiter.config.for_tier(tier).message.clone(),
                    retry_after_secs,
                })
            }
        }
    }
}
