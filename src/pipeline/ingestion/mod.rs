// Pipeline ingestion: provider rate limiting and discovery job idempotency

pub mod idempotency;
pub mod rate_limiter;

pub use idempotency::{compute_job_key, IdempotencyLedger};
pub use rate_limiter::{ProviderLimits, ProviderRateLimiter, RateLimiter};
