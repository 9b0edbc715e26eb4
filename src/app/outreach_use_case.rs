use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::app::ports::{MessageSenderPort, OutreachEventPort};
use crate::config::OutreachConfig;
use crate::domain::GoldenRecord;
use crate::observability::metrics;
use crate::outreach::model::{DeliveryStatus, OutreachEvent, OutreachEventKind, OutreachMessage, OutreachThread, SequenceStep};
use crate::outreach::scheduler::{render_template, should_send_now, should_stop, QuietHours, StopReason, ThreadSendGate};
use crate::outreach::segment::{select_segment, SegmentFilter};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum SendDecision {
    Sent { message_id: Uuid },
    Stopped { reason: StopReason },
    Suppressed,
    NoEmail,
    /// Quiet hours or step delay not elapsed yet
    Deferred,
}

/// A sequence step ready to go out
pub struct StepTemplate<'a> {
    pub step: &'a SequenceStep,
    pub subject: &'a str,
    pub body: &'a str,
}

/// Use case for campaign sends: segment selection and per-thread step delivery
pub struct OutreachUseCase {
    quiet_hours: QuietHours,
    gate: ThreadSendGate,
    sender: Arc<dyn MessageSenderPort>,
    events: Arc<dyn OutreachEventPort>,
}

impl OutreachUseCase {
    pub fn new(config: &OutreachConfig, sender: Arc<dyn MessageSenderPort>, events: Arc<dyn OutreachEventPort>) -> Self {
        Self {
            quiet_hours: config.quiet_hours,
            gate: ThreadSendGate::new(Duration::from_secs(config.min_send_interval_secs)),
            sender,
            events,
        }
    }

    pub fn segment<'a>(&self, records: &'a [GoldenRecord], filter: &SegmentFilter) -> Vec<&'a GoldenRecord> {
        let selected = select_segment(records, filter);
        metrics::outreach::segment_selected(selected.len());
        info!(candidates = records.len(), selected = selected.len(), "Outreach segment selected");
        selected
    }

    /// Send the next step on a thread if nothing stops or defers it.
    /// `now` carries the recipient's local offset; quiet hours are judged on it.
    pub async fn send_step<Tz: TimeZone>(
        &self,
        thread: &mut OutreachThread,
        record: &GoldenRecord,
        template: StepTemplate<'_>,
        now: &DateTime<Tz>,
    ) -> Result<SendDecision> {
        let now_utc = now.with_timezone(&Utc);

        if let Some(reason) = should_stop(template.step, thread) {
            debug!(thread_id = %thread.id, ?reason, "Sequence stopped");
            self.gate.forget(thread.id).await;
            return Ok(SendDecision::Stopped { reason });
        }
        if record.compliance.do_not_contact_email {
            self.gate.forget(thread.id).await;
            metrics::outreach::send_deferred("suppressed");
            return Ok(SendDecision::Suppressed);
        }
        let Some(to) = record.channels.email_public.as_deref().filter(|e| !e.trim().is_empty()) else {
            metrics::outreach::send_deferred("no_email");
            return Ok(SendDecision::NoEmail);
        };
        if !should_send_now(now, &self.quiet_hours, thread.last_sent_at, template.step.total_delay_hours()) {
            metrics::outreach::send_deferred("timing");
            debug!(thread_id = %thread.id, "Send deferred by quiet hours or step delay");
            return Ok(SendDecision::Deferred);
        }

        let mut message = OutreachMessage::outbound_draft(
            thread.id,
            render_template(template.subject, record),
            render_template(template.body, record),
            now_utc,
        );
        let queued = message.transition(DeliveryStatus::Queued, now_utc)?;
        self.append(queued).await?;

        let sender = self.sender.clone();
        let outgoing = &message;
        let sent = self
            .gate
            .send(thread.id, move || async move { sender.send(to, outgoing).await })
            .await;

        if let Err(e) = sent {
            error!(thread_id = %thread.id, message_id = %message.id, error = %e, "Send failed");
            self.append(OutreachEvent {
                thread_id: thread.id,
                kind: OutreachEventKind::AgentDecision {
                    decision: format!("send failed: {}", e),
                },
                occurred_at: now_utc,
            })
            .await?;
            return Err(anyhow!("send failed for thread {}: {}", thread.id, e));
        }

        let sent_event = message.transition(DeliveryStatus::Sent, now_utc)?;
        self.append(sent_event).await?;
        thread.record_send(now_utc);

        info!(thread_id = %thread.id, message_id = %message.id, step = template.step.order, "Outreach step sent");
        Ok(SendDecision::Sent { message_id: message.id })
    }

    async fn append(&self, event: OutreachEvent) -> Result<()> {
        self.events.append(event).await.map_err(|e| anyhow!(e))
    }
}
