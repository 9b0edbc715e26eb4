use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::ports::{ContactStorePort, OutreachEventPort};
use crate::observability::metrics;
use crate::outreach::inbound::{classify_inbound, InboundClassification, InboundMessage};
use crate::outreach::model::{OutreachEvent, OutreachEventKind, OutreachThread};
use crate::outreach::suppression::apply_suppression;

/// Use case for an inbound message on a thread: classify it, update the
/// thread, apply suppression to the contact and log what happened.
pub struct InboundUseCase {
    store: Arc<dyn ContactStorePort>,
    events: Arc<dyn OutreachEventPort>,
}

impl InboundUseCase {
    pub fn new(store: Arc<dyn ContactStorePort>, events: Arc<dyn OutreachEventPort>) -> Self {
        Self { store, events }
    }

    pub async fn handle(
        &self,
        thread: &mut OutreachThread,
        message: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<InboundClassification> {
        let classification = classify_inbound(message);
        metrics::outreach::inbound_classified(classification.kind.as_str());
        info!(
            thread_id = %thread.id,
            kind = %classification.kind,
            confidence = classification.confidence,
            "Inbound message classified"
        );

        thread.record_inbound(classification.kind);
        self.events
            .append(OutreachEvent {
                thread_id: thread.id,
                kind: OutreachEventKind::InboundClassified {
                    kind: classification.kind,
                    confidence: classification.confidence,
                },
                occurred_at: now,
            })
            .await
            .map_err(|e| anyhow!(e))?;

        let Some(mut record) = self.store.get(thread.record_id).await.map_err(|e| anyhow!(e))? else {
            warn!(record_id = %thread.record_id, "Thread points at unknown record, compliance flags not updated");
            return Ok(classification);
        };

        let updated = apply_suppression(&record.compliance, classification.kind, now);
        if updated == record.compliance {
            return Ok(classification);
        }

        let newly_suppressed = updated.is_suppressed() && updated.suppression_reason != record.compliance.suppression_reason;
        record.compliance = updated;
        record.updated_at = now;
        self.store.upsert(&record).await.map_err(|e| anyhow!(e))?;

        if let (true, Some(reason)) = (newly_suppressed, record.compliance.suppression_reason) {
            metrics::outreach::suppression_applied(reason.as_str());
            info!(record_id = %record.id, reason = reason.as_str(), "Contact suppressed");
            self.events
                .append(OutreachEvent {
                    thread_id: thread.id,
                    kind: OutreachEventKind::Suppression { reason },
                    occurred_at: now,
                })
                .await
                .map_err(|e| anyhow!(e))?;
        }

        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GoldenRecord, QualityStatus, SuppressionReason};
    use crate::infra::memory::{InMemoryContactStore, InMemoryEventLog};
    use crate::outreach::inbound::InboundType;
    use crate::pipeline::processing::category::CategoryClassification;
    use crate::pipeline::processing::normalize::NormalizedContact;

    fn stored_record() -> GoldenRecord {
        let contact = NormalizedContact {
            company: Some("Hausverwaltung Nord".to_string()),
            email: Some("info@hv-nord.de".to_string()),
            ..Default::default()
        };
        let category = CategoryClassification { primary: "property_management".to_string(), secondary: vec![] };
        GoldenRecord::from_normalized(&contact, category, "apify", None, 0.9, QualityStatus::Approved, Utc::now())
    }

    #[tokio::test]
    async fn test_bounce_then_reply_keeps_suppression() {
        let record = stored_record();
        let store = Arc::new(InMemoryContactStore::with_records(vec![record.clone()]));
        let events = Arc::new(InMemoryEventLog::new());
        let use_case = InboundUseCase::new(store.clone(), events.clone());
        let mut thread = OutreachThread::new(record.id, None, Utc::now());

        let bounce = InboundMessage {
            subject: "Mail delivery failed".to_string(),
            body_text: "User unknown".to_string(),
            from_email: "mailer-daemon@mx.hv-nord.de".to_string(),
        };
        let result = use_case.handle(&mut thread, &bounce, Utc::now()).await.unwrap();
        assert_eq!(result.kind, InboundType::Bounce);
        assert!(thread.bounced);

        let reply = InboundMessage {
            subject: "Re: Anfrage".to_string(),
            body_text: "Gerne, melden Sie sich.".to_string(),
            from_email: "info@hv-nord.de".to_string(),
        };
        use_case.handle(&mut thread, &reply, Utc::now()).await.unwrap();

        let stored = store.records().await.remove(0);
        assert!(stored.compliance.do_not_contact_email);
        assert_eq!(stored.compliance.suppression_reason, Some(SuppressionReason::Bounced));
        assert!(stored.compliance.last_inbound_at.is_some());

        let kinds: Vec<bool> = events
            .events()
            .await
            .iter()
            .map(|e| matches!(e.kind, OutreachEventKind::Suppression { .. }))
            .collect();
        assert_eq!(kinds, vec![false, true, false]);
    }
}
