use crate::app::ports::RateLimiterPort;
use crate::pipeline::ingestion::rate_limiter::ProviderRateLimiter;
use async_trait::async_trait;

pub struct RateLimiterAdapter(pub ProviderRateLimiter);

#[async_trait]
impl RateLimiterPort for RateLimiterAdapter {
    async fn acquire(&self, provider: &str) -> Result<(), String> {
        self.0.acquire(provider).await.map_err(|e| e.to_string())
    }
}
