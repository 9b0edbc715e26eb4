use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{DirectoryError, Result};
use crate::observability::metrics;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderLimits {
    pub requests_per_min: Option<u64>,
    pub requests_per_day: Option<u64>,
}

/// Token bucket per minute plus a fixed calendar-day window (UTC).
#[derive(Debug, Clone)]
pub struct RateLimiter {
    provider: String,
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    limits: ProviderLimits,
    // token bucket is modeled by the current tokens and the time of last refill
    rpm_tokens: Mutex<(f64, Instant)>,
    daily: Mutex<DailyWindow>,
}

#[derive(Debug)]
struct DailyWindow {
    day: NaiveDate,
    used: u64,
}

impl RateLimiter {
    pub fn new(provider: impl Into<String>, limits: ProviderLimits) -> Self {
        let rpm_capacity = limits.requests_per_min.unwrap_or(0) as f64;
        Self {
            provider: provider.into(),
            inner: Arc::new(Inner {
                limits,
                rpm_tokens: Mutex::new((rpm_capacity, Instant::now())),
                daily: Mutex::new(DailyWindow {
                    day: Utc::now().date_naive(),
                    used: 0,
                }),
            }),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Wait for a request slot. Fails without waiting when today's quota is spent.
    pub async fn acquire(&self) -> Result<()> {
        self.acquire_on(Utc::now().date_naive()).await
    }

    pub async fn acquire_on(&self, today: NaiveDate) -> Result<()> {
        // Daily window first, a spent quota should not wait on the minute bucket
        if let Some(per_day) = self.inner.limits.requests_per_day {
            let mut window = self.inner.daily.lock().await;
            if window.day != today {
                window.day = today;
                window.used = 0;
            }
            if window.used >= per_day {
                metrics::discovery::quota_exhausted(&self.provider);
                warn!(provider = %self.provider, limit = per_day, "Daily request quota exhausted");
                return Err(DirectoryError::QuotaExhausted {
                    provider: self.provider.clone(),
                    limit: per_day,
                });
            }
            window.used += 1;
        }

        if let Some(rpm) = self.inner.limits.requests_per_min {
            if rpm > 0 {
                self.consume_tokens(rpm as f64, 60.0, 1.0).await;
            }
        }
        Ok(())
    }

    /// Requests left in today's window, `None` when there is no daily limit
    pub async fn remaining_on(&self, today: NaiveDate) -> Option<u64> {
        let per_day = self.inner.limits.requests_per_day?;
        let window = self.inner.daily.lock().await;
        if window.day != today {
            return Some(per_day);
        }
        Some(per_day.saturating_sub(window.used))
    }

    async fn consume_tokens(&self, capacity: f64, period_secs: f64, cost: f64) {
        // refill continuously, wait until enough tokens accumulate
        loop {
            let mut guard = self.inner.rpm_tokens.lock().await;
            let (ref mut tokens, ref mut last) = *guard;
            let now = Instant::now();
            let elapsed = now.duration_since(*last).as_secs_f64();
            let refill_rate = capacity / period_secs;
            *tokens = (*tokens + elapsed * refill_rate).min(capacity);
            *last = now;
            if *tokens >= cost {
                *tokens -= cost;
                break;
            }
            let secs = (cost - *tokens) / refill_rate;
            drop(guard);
            debug!(provider = %self.provider, wait_secs = secs, "Rate limit reached, waiting");
            tokio::time::sleep(Duration::from_secs_f64(secs.max(0.001))).await;
        }
    }
}

/// One limiter per configured provider. Providers without limits pass through.
#[derive(Debug, Clone, Default)]
pub struct ProviderRateLimiter {
    limiters: HashMap<String, RateLimiter>,
}

impl ProviderRateLimiter {
    pub fn from_config(providers: &BTreeMap<String, ProviderLimits>) -> Self {
        let limiters = providers
            .iter()
            .map(|(name, limits)| (name.clone(), RateLimiter::new(name.clone(), limits.clone())))
            .collect();
        Self { limiters }
    }

    pub fn get(&self, provider: &str) -> Option<&RateLimiter> {
        self.limiters.get(provider)
    }

    pub async fn acquire(&self, provider: &str) -> Result<()> {
        match self.limiters.get(provider) {
            Some(limiter) => limiter.acquire().await,
            None => {
                debug!(provider, "No rate limit configured for provider");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[tokio::test]
    async fn test_daily_quota_is_enforced_and_resets() {
        let limiter = RateLimiter::new(
            "apify",
            ProviderLimits {
                requests_per_min: Some(600),
                requests_per_day: Some(2),
            },
        );

        limiter.acquire_on(day(1)).await.unwrap();
        limiter.acquire_on(day(1)).await.unwrap();
        assert_eq!(limiter.remaining_on(day(1)).await, Some(0));

        let err = limiter.acquire_on(day(1)).await.unwrap_err();
        assert!(matches!(err, DirectoryError::QuotaExhausted { limit: 2, .. }));

        // next day opens a fresh window
        assert_eq!(limiter.remaining_on(day(2)).await, Some(2));
        limiter.acquire_on(day(2)).await.unwrap();
        assert_eq!(limiter.remaining_on(day(2)).await, Some(1));
    }

    #[tokio::test]
    async fn test_minute_bucket_allows_burst_up_to_capacity() {
        let limiter = RateLimiter::new(
            "google_places",
            ProviderLimits {
                requests_per_min: Some(5),
                requests_per_day: None,
            },
        );
        let started = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await.unwrap();
        }
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(limiter.remaining_on(day(1)).await, None);
    }

    #[tokio::test]
    async fn test_unknown_provider_passes_through() {
        let mut providers = BTreeMap::new();
        providers.insert(
            "firecrawl".to_string(),
            ProviderLimits {
                requests_per_min: None,
                requests_per_day: Some(1),
            },
        );
        let limiter = ProviderRateLimiter::from_config(&providers);

        limiter.acquire("firecrawl").await.unwrap();
        assert!(limiter.acquire("firecrawl").await.is_err());
        assert!(limiter.acquire("somebody_else").await.is_ok());
        assert_eq!(limiter.get("firecrawl").map(|l| l.provider()), Some("firecrawl"));
    }
}
