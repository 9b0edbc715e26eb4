use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::app::ports::{ContactStorePort, OutreachEventPort, ReviewItem, ReviewQueuePort};
use crate::domain::GoldenRecord;
use crate::outreach::model::{OutreachEvent, OutreachEventLog};
use crate::pipeline::processing::conflation::DedupePoolEntry;

/// Contact store kept in memory, in insertion order
#[derive(Default)]
pub struct InMemoryContactStore {
    records: RwLock<(Vec<Uuid>, HashMap<Uuid, GoldenRecord>)>,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<GoldenRecord>) -> Self {
        let order = records.iter().map(|r| r.id).collect();
        let by_id = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            records: RwLock::new((order, by_id)),
        }
    }

    pub async fn records(&self) -> Vec<GoldenRecord> {
        let guard = self.records.read().await;
        let (order, by_id) = &*guard;
        order.iter().filter_map(|id| by_id.get(id).cloned()).collect()
    }
}

#[async_trait]
impl ContactStorePort for InMemoryContactStore {
    async fn dedupe_pool(&self) -> Result<Vec<DedupePoolEntry>, String> {
        Ok(self.records().await.iter().map(DedupePoolEntry::from).collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<GoldenRecord>, String> {
        Ok(self.records.read().await.1.get(&id).cloned())
    }

    async fn upsert(&self, record: &GoldenRecord) -> Result<(), String> {
        let mut guard = self.records.write().await;
        let (order, by_id) = &mut *guard;
        if by_id.insert(record.id, record.clone()).is_none() {
            order.push(record.id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryReviewQueue {
    items: Mutex<Vec<ReviewItem>>,
}

impl InMemoryReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn items(&self) -> Vec<ReviewItem> {
        self.items.lock().await.clone()
    }
}

#[async_trait]
impl ReviewQueuePort for InMemoryReviewQueue {
    async fn enqueue(&self, item: ReviewItem) -> Result<(), String> {
        self.items.lock().await.push(item);
        Ok(())
    }
}

/// Event sink backed by the append-only log
#[derive(Default)]
pub struct InMemoryEventLog {
    log: Mutex<OutreachEventLog>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<OutreachEvent> {
        self.log.lock().await.events().to_vec()
    }
}

#[async_trait]
impl OutreachEventPort for InMemoryEventLog {
    async fn append(&self, event: OutreachEvent) -> Result<(), String> {
        self.log.lock().await.append(event);
        Ok(())
    }
}
