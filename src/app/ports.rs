use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::GoldenRecord;
use crate::outreach::model::{OutreachEvent, OutreachMessage};
use crate::pipeline::processing::conflation::{DedupeCandidate, DedupePoolEntry};
use crate::pipeline::processing::normalize::NormalizedContact;

// Contact-store ports
#[async_trait]
pub trait ContactStorePort: Send + Sync {
    /// Matching subset of the existing records
    async fn dedupe_pool(&self) -> Result<Vec<DedupePoolEntry>, String>;
    async fn get(&self, id: Uuid) -> Result<Option<GoldenRecord>, String>;
    async fn upsert(&self, record: &GoldenRecord) -> Result<(), String>;
}

/// Contact whose dedupe candidates need a human decision
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub contact: NormalizedContact,
    pub source: String,
    pub candidates: Vec<DedupeCandidate>,
}

#[async_trait]
pub trait ReviewQueuePort: Send + Sync {
    async fn enqueue(&self, item: ReviewItem) -> Result<(), String>;
}

// Provider-side ports
#[async_trait]
pub trait RateLimiterPort: Send + Sync {
    async fn acquire(&self, provider: &str) -> Result<(), String>;
}

// Outreach ports
#[async_trait]
pub trait MessageSenderPort: Send + Sync {
    async fn send(&self, to: &str, message: &OutreachMessage) -> Result<(), String>;
}

#[async_trait]
pub trait OutreachEventPort: Send + Sync {
    async fn append(&self, event: OutreachEvent) -> Result<(), String>;
}
