use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

use market_directory::app::directory_use_case::{DirectoryUseCase, IngestOutcome};
use market_directory::domain::QualityStatus;
use market_directory::infra::memory::{InMemoryContactStore, InMemoryReviewQueue};
use market_directory::pipeline::processing::conflation::{find_dedupe_matches, DedupePoolEntry, MatchType};
use market_directory::pipeline::processing::normalize::{
    normalize_contact, normalize_domain, normalize_phone, NormalizedContact, RawContactInput,
};
use market_directory::pipeline::processing::quality_gate::{apply_quality_gate, calc_confidence};
use uuid::Uuid;

fn vogel() -> RawContactInput {
    RawContactInput {
        contact_person_name: Some("Frau Lena Vogel".to_string()),
        company_name: Some("Hundeschule Vogel".to_string()),
        email: Some(" Info@Hundeschule-Vogel.de ".to_string()),
        phone: Some("089 1234567".to_string()),
        street: Some("Leopoldstraße 12".to_string()),
        postal_code: Some("80802".to_string()),
        city: Some("Munich".to_string()),
        provider: Some("apify".to_string()),
        category_tags: vec!["Hundeschule".to_string()],
        ..Default::default()
    }
}

#[test]
fn test_phone_normalization() {
    assert_eq!(normalize_phone(Some("+49 30 1234567")), "+49301234567");
    assert_eq!(normalize_phone(Some("030 1234567")), "+49301234567");
    assert_eq!(normalize_phone(Some("")), "");
    assert_eq!(normalize_phone(None), "");
}

#[test]
fn test_domain_normalization() {
    assert_eq!(normalize_domain(Some("https://WWW.Example.de/kontakt?x=1")), "example.de");
    assert_eq!(normalize_domain(Some("http://shop.example.de.")), "shop.example.de");
    assert_eq!(normalize_domain(None), "");
}

#[test]
fn test_normalize_splits_person_name() {
    let result = normalize_contact(&vogel());
    let contact = result.normalized;
    assert_eq!(contact.salutation.as_deref(), Some("Frau"));
    assert_eq!(contact.first_name.as_deref(), Some("Lena"));
    assert_eq!(contact.last_name.as_deref(), Some("Vogel"));
    assert_eq!(contact.email.as_deref(), Some("info@hundeschule-vogel.de"));
    assert_eq!(contact.phone_e164.as_deref(), Some("+49891234567"));
    assert!(result.warnings.is_empty());
}

#[test]
fn test_empty_contact_score_is_bounded() {
    let result = calc_confidence(&NormalizedContact::default(), 0);
    assert!((0.0..=1.0).contains(&result.score));
    assert_eq!(apply_quality_gate(result.score), QualityStatus::Candidate);
}

#[test]
fn test_quality_gate_boundaries() {
    assert_eq!(apply_quality_gate(0.85), QualityStatus::Approved);
    assert_eq!(apply_quality_gate(0.849), QualityStatus::NeedsReview);
    assert_eq!(apply_quality_gate(0.60), QualityStatus::NeedsReview);
    assert_eq!(apply_quality_gate(0.599), QualityStatus::Candidate);
}

#[test]
fn test_email_match_outranks_phone_match() {
    let candidate = NormalizedContact {
        email: Some("info@example.de".to_string()),
        phone_e164: Some("+49301234567".to_string()),
        ..Default::default()
    };
    let by_phone = DedupePoolEntry {
        id: Uuid::from_u128(1),
        phone: Some("030 1234567".to_string()),
        ..Default::default()
    };
    let by_email = DedupePoolEntry {
        id: Uuid::from_u128(2),
        email: Some("INFO@example.de".to_string()),
        phone: Some("+49301234567".to_string()),
        ..Default::default()
    };

    let matches = find_dedupe_matches(&candidate, &[by_phone, by_email]);
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].match_type, MatchType::Email);
    assert_eq!(matches[0].existing_record_id, Uuid::from_u128(2));
    assert_eq!(matches[1].match_type, MatchType::Phone);
}

#[tokio::test]
async fn test_batch_creates_merges_and_queues_for_review() -> Result<()> {
    let store = Arc::new(InMemoryContactStore::new());
    let queue = Arc::new(InMemoryReviewQueue::new());
    let use_case = DirectoryUseCase::new(store.clone(), queue.clone());

    let same_email_elsewhere = RawContactInput {
        email: Some("info@hundeschule-vogel.de".to_string()),
        website: Some("https://www.hundeschule-vogel.de/kontakt".to_string()),
        city: Some("Berlin".to_string()),
        provider: Some("google_places".to_string()),
        ..Default::default()
    };
    let company_only = RawContactInput {
        company: Some("Hundeschule  Vogel".to_string()),
        ..Default::default()
    };

    let raws = vec![vogel(), same_email_elsewhere, company_only, vogel()];
    let (reports, run_metrics) = use_case.ingest_batch(&raws, Utc::now()).await?;

    let created_id = match &reports[0].outcome {
        IngestOutcome::Created { record_id } => *record_id,
        other => panic!("expected a new record, got {:?}", other),
    };
    assert_eq!(reports[0].category.primary, "dog_training");

    match &reports[1].outcome {
        IngestOutcome::Merged { record_id, decisions } => {
            assert_eq!(*record_id, created_id);
            let fields: Vec<&str> = decisions.iter().map(|d| d.field.as_str()).collect();
            assert!(fields.contains(&"domain"));
            assert!(!fields.contains(&"city"));
        }
        other => panic!("expected a merge, got {:?}", other),
    }
    assert_eq!(reports[2].outcome, IngestOutcome::QueuedForReview { candidates: 1 });
    assert_eq!(reports[3].outcome, IngestOutcome::BatchDuplicate);

    let records = store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].address.city.as_deref(), Some("Munich"));
    assert_eq!(records[0].channels.domain.as_deref(), Some("hundeschule-vogel.de"));
    assert!(records[0].provenance.iter().any(|p| p.field_name == "domain" && p.source == "google_places"));

    let review = queue.items().await;
    assert_eq!(review.len(), 1);
    assert_eq!(review[0].candidates[0].match_type, MatchType::CompanyName);

    assert_eq!(run_metrics.raw_found, 4);
    assert_eq!(run_metrics.duplicates, 3);
    Ok(())
}
