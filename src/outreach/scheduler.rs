use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::domain::GoldenRecord;
use crate::outreach::model::{OutreachThread, SequenceStep};

/// Local-time window in which nothing is sent. `start_hour > end_hour` wraps
/// over midnight; equal hours mean no quiet window at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuietHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            start_hour: 20,
            end_hour: 8,
        }
    }
}

impl QuietHours {
    pub fn is_quiet(&self, hour: u32) -> bool {
        if self.start_hour > self.end_hour {
            hour >= self.start_hour || hour < self.end_hour
        } else {
            self.start_hour <= hour && hour < self.end_hour
        }
    }
}

/// Send gate: false inside quiet hours (judged on the hour of `now` in its own
/// time zone) and false until `last_sent_at + delay_hours` has passed.
pub fn should_send_now<Tz: TimeZone>(
    now: &DateTime<Tz>,
    quiet_hours: &QuietHours,
    last_sent_at: Option<DateTime<Utc>>,
    delay_hours: u32,
) -> bool {
    if quiet_hours.is_quiet(now.hour()) {
        return false;
    }
    match last_sent_at {
        Some(last) => now.with_timezone(&Utc) >= last + Duration::hours(i64::from(delay_hours)),
        None => true,
    }
}

/// Earliest time the step may go out after the previous send
pub fn next_send_at(last_sent_at: DateTime<Utc>, step: &SequenceStep) -> DateTime<Utc> {
    last_sent_at + Duration::hours(i64::from(step.total_delay_hours()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Replied,
    Bounced,
}

/// Whether the sequence halts before `step` given what happened on the thread
pub fn should_stop(step: &SequenceStep, thread: &OutreachThread) -> Option<StopReason> {
    if step.stop_on_bounce && thread.bounced {
        Some(StopReason::Bounced)
    } else if step.stop_on_reply && thread.replied {
        Some(StopReason::Replied)
    } else {
        None
    }
}

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([a-z_]+)\s*\}\}").expect("valid placeholder pattern"));

/// Fill `{{first_name}}`, `{{last_name}}`, `{{company}}` and `{{email}}`.
/// Missing values render empty; unknown placeholders are left untouched.
pub fn render_template(template: &str, record: &GoldenRecord) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            let value = match &caps[1] {
                "first_name" => record.identity.first_name.clone(),
                "last_name" => record.identity.last_name.clone(),
                "company" => record.identity.legal_name.clone(),
                "email" => record.channels.email_public.clone(),
                _ => return caps[0].to_string(),
            };
            value.unwrap_or_default()
        })
        .into_owned()
}

/// Serializes sends per thread and keeps a minimum pause between two sends on
/// the same thread. Different threads proceed in parallel.
#[derive(Debug, Default)]
pub struct ThreadSendGate {
    min_interval: std::time::Duration,
    threads: Mutex<HashMap<Uuid, Arc<Mutex<Option<Instant>>>>>,
}

impl ThreadSendGate {
    pub fn new(min_interval: std::time::Duration) -> Self {
        Self {
            min_interval,
            threads: Mutex::new(HashMap::new()),
        }
    }

    /// Drops idle slots on the way, so the map only holds threads that are
    /// sending or still inside their minimum interval.
    async fn slot(&self, thread_id: Uuid) -> Arc<Mutex<Option<Instant>>> {
        let mut threads = self.threads.lock().await;
        let min_interval = self.min_interval;
        threads.retain(|id, slot| *id == thread_id || !is_idle(slot, min_interval));
        threads.entry(thread_id).or_default().clone()
    }

    /// Stop tracking a thread, e.g. once its sequence has ended
    pub async fn forget(&self, thread_id: Uuid) {
        self.threads.lock().await.remove(&thread_id);
    }

    /// Number of threads currently tracked
    pub async fn tracked(&self) -> usize {
        self.threads.lock().await.len()
    }

    /// Run `send` while holding the thread's slot
    pub async fn send<T, F, Fut>(&self, thread_id: Uuid, send: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let slot = self.slot(thread_id).await;
        let mut last_send = slot.lock().await;

        if let Some(previous) = *last_send {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(%thread_id, wait_ms = wait.as_millis() as u64, "Waiting for minimum send interval");
                tokio::time::sleep(wait).await;
            }
        }

        let result = send().await;
        *last_send = Some(Instant::now());
        result
    }
}

// Nobody else holds the slot and its interval has run out
fn is_idle(slot: &Arc<Mutex<Option<Instant>>>, min_interval: std::time::Duration) -> bool {
    if Arc::strong_count(slot) > 1 {
        return false;
    }
    match slot.try_lock() {
        Ok(last_send) => last_send.map_or(true, |at| at.elapsed() >= min_interval),
        Err(_) => false,
    }
}
