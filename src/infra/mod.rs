pub mod memory;
pub mod rate_limiter_adapter;
pub mod sender;
