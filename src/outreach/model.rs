use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::SuppressionReason;
use crate::error::{DirectoryError, Result};
use crate::outreach::inbound::InboundType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outbound,
    Inbound,
}

/// Delivery state machine: draft -> queued -> sent -> delivered | bounced | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Draft,
    Queued,
    Sent,
    Delivered,
    Bounced,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Draft => "draft",
            DeliveryStatus::Queued => "queued",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Bounced => "bounced",
            DeliveryStatus::Failed => "failed",
        }
    }

    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        use DeliveryStatus::*;
        matches!(
            (self, next),
            (Draft, Queued) | (Queued, Sent) | (Sent, Delivered) | (Sent, Bounced) | (Sent, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Bounced | DeliveryStatus::Failed)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Conversation with exactly one golden record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachThread {
    pub id: Uuid,
    pub record_id: Uuid,
    pub campaign_id: Option<String>,
    /// Index of the next sequence step to send
    pub current_step: usize,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub replied: bool,
    pub bounced: bool,
    pub created_at: DateTime<Utc>,
}

impl OutreachThread {
    pub fn new(record_id: Uuid, campaign_id: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_id,
            campaign_id,
            current_step: 0,
            last_sent_at: None,
            replied: false,
            bounced: false,
            created_at: now,
        }
    }

    /// Advance the sequence after a successful send
    pub fn record_send(&mut self, now: DateTime<Utc>) {
        self.last_sent_at = Some(now);
        self.current_step += 1;
    }

    /// Reflect a classified inbound message on the thread
    pub fn record_inbound(&mut self, kind: InboundType) {
        match kind {
            InboundType::Reply => self.replied = true,
            InboundType::Bounce => self.bounced = true,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub direction: Direction,
    pub delivery_status: DeliveryStatus,
    pub subject: String,
    pub body: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OutreachMessage {
    pub fn outbound_draft(thread_id: Uuid, subject: impl Into<String>, body: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            thread_id,
            direction: Direction::Outbound,
            delivery_status: DeliveryStatus::Draft,
            subject: subject.into(),
            body: body.into(),
            sent_at: None,
            created_at: now,
        }
    }

    /// Received messages enter the thread already delivered
    pub fn inbound(thread_id: Uuid, subject: impl Into<String>, body: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            thread_id,
            direction: Direction::Inbound,
            delivery_status: DeliveryStatus::Delivered,
            subject: subject.into(),
            body: body.into(),
            sent_at: None,
            created_at: now,
        }
    }

    /// Move to `next`, returning the event to append to the thread log.
    pub fn transition(&mut self, next: DeliveryStatus, now: DateTime<Utc>) -> Result<OutreachEvent> {
        if !self.delivery_status.can_transition_to(next) {
            return Err(DirectoryError::InvalidTransition {
                from: self.delivery_status.to_string(),
                to: next.to_string(),
            });
        }
        let from = self.delivery_status;
        self.delivery_status = next;
        if next == DeliveryStatus::Sent {
            self.sent_at = Some(now);
        }
        Ok(OutreachEvent {
            thread_id: self.thread_id,
            kind: OutreachEventKind::StatusTransition {
                message_id: self.id,
                from,
                to: next,
            },
            occurred_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutreachEventKind {
    StatusTransition {
        message_id: Uuid,
        from: DeliveryStatus,
        to: DeliveryStatus,
    },
    AgentDecision {
        decision: String,
    },
    InboundClassified {
        kind: InboundType,
        confidence: f64,
    },
    Suppression {
        reason: SuppressionReason,
    },
    SuppressionCleared {
        actor: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachEvent {
    pub thread_id: Uuid,
    pub kind: OutreachEventKind,
    pub occurred_at: DateTime<Utc>,
}

/// Append-only event log. Events can be added and read, never changed or removed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutreachEventLog {
    events: Vec<OutreachEvent>,
}

impl OutreachEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: OutreachEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[OutreachEvent] {
        &self.events
    }

    pub fn for_thread(&self, thread_id: Uuid) -> impl Iterator<Item = &OutreachEvent> {
        self.events.iter().filter(move |e| e.thread_id == thread_id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Ordered step of a campaign sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub order: u32,
    pub template_ref: String,
    #[serde(default)]
    pub delay_days: u32,
    #[serde(default)]
    pub delay_hours: u32,
    #[serde(default = "default_true")]
    pub stop_on_reply: bool,
    #[serde(default = "default_true")]
    pub stop_on_bounce: bool,
}

fn default_true() -> bool {
    true
}

impl SequenceStep {
    /// Delay since the previous send, in hours
    pub fn total_delay_hours(&self) -> u32 {
        self.delay_days * 24 + self.delay_hours
    }
}
