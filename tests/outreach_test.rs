use anyhow::Result;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use std::sync::Arc;

use market_directory::app::inbound_use_case::InboundUseCase;
use market_directory::domain::{GoldenRecord, QualityStatus, SuppressionReason};
use market_directory::infra::memory::{InMemoryContactStore, InMemoryEventLog};
use market_directory::outreach::{
    classify_inbound, render_template, select_segment, should_send_now, InboundMessage, InboundType,
    OutreachEventKind, OutreachThread, QuietHours, SegmentFilter,
};
use market_directory::pipeline::processing::category::CategoryClassification;
use market_directory::pipeline::processing::normalize::NormalizedContact;

fn record(email: Option<&str>, status: QualityStatus) -> GoldenRecord {
    let contact = NormalizedContact {
        first_name: Some("Max".to_string()),
        last_name: Some("Mustermann".to_string()),
        company: Some("Mustermann Finanz GmbH".to_string()),
        email: email.map(str::to_string),
        city: Some("Berlin".to_string()),
        postal_code: Some("10115".to_string()),
        ..Default::default()
    };
    let category = CategoryClassification {
        primary: "financial_advisor".to_string(),
        secondary: Vec::new(),
    };
    GoldenRecord::from_normalized(&contact, category, "apify", None, 0.9, status, Utc::now())
}

fn berlin(hour: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(2 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 3, hour, 0, 0)
        .unwrap()
}

fn inbound(subject: &str, body: &str, from: &str) -> InboundMessage {
    InboundMessage {
        subject: subject.to_string(),
        body_text: body.to_string(),
        from_email: from.to_string(),
    }
}

#[test]
fn test_quiet_hours_gate() {
    let quiet = QuietHours::default();
    assert!(!should_send_now(&berlin(21), &quiet, None, 0));
    assert!(should_send_now(&berlin(9), &quiet, None, 0));
    assert!(should_send_now(&berlin(19), &quiet, None, 0));

    let last = berlin(9).with_timezone(&Utc) - Duration::hours(47);
    assert!(!should_send_now(&berlin(9), &quiet, Some(last), 48));
    assert!(should_send_now(&berlin(10), &quiet, Some(last), 48));
}

#[test]
fn test_inbound_classification() {
    let unsubscribe = classify_inbound(&inbound("Re: Angebot", "Bitte abmelden, danke.", "max@example.de"));
    assert_eq!(unsubscribe.kind, InboundType::Unsubscribe);

    let bounce = classify_inbound(&inbound("Delivery Status Notification", "", "mailer-daemon@example.de"));
    assert_eq!(bounce.kind, InboundType::Bounce);

    let reply = classify_inbound(&inbound("Re: Angebot", "Gerne, rufen Sie mich an.", "max@example.de"));
    assert_eq!(reply.kind, InboundType::Reply);
    assert_eq!(reply.confidence, 0.70);
}

#[test]
fn test_segment_excludes_suppressed_and_emailless() {
    let reachable = record(Some("max@example.de"), QualityStatus::Approved);
    let mut suppressed = record(Some("anna@example.de"), QualityStatus::Approved);
    suppressed.compliance.do_not_contact_email = true;
    let no_email = record(None, QualityStatus::Approved);
    let candidate = record(Some("lisa@example.de"), QualityStatus::Candidate);

    let records = vec![reachable.clone(), suppressed, no_email, candidate];
    let selected = select_segment(&records, &SegmentFilter::default());
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].id, reachable.id);
}

#[test]
fn test_render_template() {
    let record = record(Some("max@example.de"), QualityStatus::Approved);
    assert_eq!(
        render_template("Hallo {{first_name}} {{last_name}} von {{company}} ({{unknown}})", &record),
        "Hallo Max Mustermann von Mustermann Finanz GmbH ({{unknown}})"
    );
}

#[tokio::test]
async fn test_reply_after_bounce_keeps_suppression() -> Result<()> {
    let record = record(Some("max@example.de"), QualityStatus::Approved);
    let store = Arc::new(InMemoryContactStore::with_records(vec![record.clone()]));
    let events = Arc::new(InMemoryEventLog::new());
    let use_case = InboundUseCase::new(store.clone(), events.clone());
    let mut thread = OutreachThread::new(record.id, Some("spring".to_string()), Utc::now());

    let bounce = use_case
        .handle(&mut thread, &inbound("Undeliverable: Angebot", "", "postmaster@example.de"), Utc::now())
        .await?;
    assert_eq!(bounce.kind, InboundType::Bounce);

    let reply = use_case
        .handle(&mut thread, &inbound("Re: Angebot", "Klingt interessant.", "max@example.de"), Utc::now())
        .await?;
    assert_eq!(reply.kind, InboundType::Reply);

    let stored = store.records().await;
    assert!(stored[0].compliance.do_not_contact_email);
    assert_eq!(stored[0].compliance.suppression_reason, Some(SuppressionReason::Bounced));
    assert!(stored[0].compliance.last_inbound_at.is_some());
    assert!(thread.bounced && thread.replied);

    let suppressions = events
        .events()
        .await
        .into_iter()
        .filter(|e| matches!(e.kind, OutreachEventKind::Suppression { .. }))
        .count();
    assert_eq!(suppressions, 1);
    Ok(())
}
