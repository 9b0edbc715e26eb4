use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::constants::DEFAULT_COUNTRY;
use crate::error::{DirectoryError, Result};
use crate::pipeline::processing::category::CategoryClassification;
use crate::pipeline::processing::normalize::NormalizedContact;

/// Lifecycle status of a golden record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QualityStatus {
    Candidate,
    Enriched,
    NeedsReview,
    Approved,
    Rejected,
    Blocked,
}

impl QualityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityStatus::Candidate => "candidate",
            QualityStatus::Enriched => "enriched",
            QualityStatus::NeedsReview => "needs_review",
            QualityStatus::Approved => "approved",
            QualityStatus::Rejected => "rejected",
            QualityStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Company,
    SoleTrader,
    PublicBody,
    Association,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    Unsubscribed,
    Bounced,
    Complaint,
    Manual,
    Blocklist,
}

impl SuppressionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuppressionReason::Unsubscribed => "unsubscribed",
            SuppressionReason::Bounced => "bounced",
            SuppressionReason::Complaint => "complaint",
            SuppressionReason::Manual => "manual",
            SuppressionReason::Blocklist => "blocklist",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsentBasis {
    #[default]
    Unknown,
    LegitimateInterest,
    ExplicitOptIn,
}

/// Contactability flags. The do-not-contact flags only ever go from false to
/// true through automated events; see `outreach::suppression`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ComplianceFlags {
    pub do_not_contact_email: bool,
    pub do_not_contact_phone: bool,
    pub suppression_reason: Option<SuppressionReason>,
    pub last_outreach_at: Option<DateTime<Utc>>,
    pub last_inbound_at: Option<DateTime<Utc>>,
    pub consent_basis: ConsentBasis,
}

impl ComplianceFlags {
    pub fn is_suppressed(&self) -> bool {
        self.do_not_contact_email || self.do_not_contact_phone
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldProvenance {
    pub field_name: String,
    pub source: String,
    pub provider_object_id: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContactIdentity {
    pub display_name: String,
    pub legal_name: Option<String>,
    pub category_primary: String,
    pub categories_secondary: Vec<String>,
    pub entity_kind: EntityKind,
    pub salutation: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContactAddress {
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub region_state: Option<String>,
    pub country: String,
    pub geo: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContactChannels {
    pub phone_e164: Option<String>,
    pub phones_additional: Vec<String>,
    pub email_public: Option<String>,
    pub website_url: Option<String>,
    pub domain: Option<String>,
    pub social_links: Vec<String>,
}

/// The deduplicated, scored representation of one real-world contact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoldenRecord {
    pub id: Uuid,
    pub identity: ContactIdentity,
    pub address: ContactAddress,
    pub channels: ContactChannels,
    pub compliance: ComplianceFlags,
    pub provenance: Vec<FieldProvenance>,
    /// Every provider or source that has reported this contact, whether or not
    /// it contributed a field
    #[serde(default)]
    pub sources: BTreeSet<String>,
    pub confidence_score: f64,
    pub quality_status: QualityStatus,
    /// Set when a reviewer pinned the status; rescoring no longer moves it
    pub status_overridden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GoldenRecord {
    /// Assemble a fresh record from a normalized contact. Every filled field
    /// gets one provenance entry attributed to `source`.
    pub fn from_normalized(
        contact: &NormalizedContact,
        category: CategoryClassification,
        source: &str,
        provider_object_id: Option<&str>,
        confidence_score: f64,
        quality_status: QualityStatus,
        now: DateTime<Utc>,
    ) -> Self {
        let filled = [
            ("salutation", &contact.salutation),
            ("first_name", &contact.first_name),
            ("last_name", &contact.last_name),
            ("company", &contact.company),
            ("phone_e164", &contact.phone_e164),
            ("email", &contact.email),
            ("website_url", &contact.website_url),
            ("domain", &contact.domain),
            ("street", &contact.street),
            ("postal_code", &contact.postal_code),
            ("city", &contact.city),
        ];
        let provenance = filled
            .iter()
            .filter(|(_, value)| value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false))
            .map(|(field, _)| FieldProvenance {
                field_name: field.to_string(),
                source: source.to_string(),
                provider_object_id: provider_object_id.map(str::to_string),
                fetched_at: now,
            })
            .collect();

        let entity_kind = if contact.company.is_some() {
            EntityKind::Company
        } else if contact.last_name.is_some() {
            EntityKind::SoleTrader
        } else {
            EntityKind::Unknown
        };

        Self {
            id: Uuid::new_v4(),
            identity: ContactIdentity {
                display_name: contact.display_name(),
                legal_name: contact.company.clone(),
                category_primary: category.primary,
                categories_secondary: category.secondary,
                entity_kind,
                salutation: contact.salutation.clone(),
                first_name: contact.first_name.clone(),
                last_name: contact.last_name.clone(),
            },
            address: ContactAddress {
                street: contact.street.clone(),
                postal_code: contact.postal_code.clone(),
                city: contact.city.clone(),
                region_state: None,
                country: DEFAULT_COUNTRY.to_string(),
                geo: None,
            },
            channels: ContactChannels {
                phone_e164: contact.phone_e164.clone(),
                phones_additional: contact.phones_additional.clone(),
                email_public: contact.email.clone(),
                website_url: contact.website_url.clone(),
                domain: contact.domain.clone(),
                social_links: Vec::new(),
            },
            compliance: ComplianceFlags::default(),
            provenance,
            sources: BTreeSet::from([source.to_string()]),
            confidence_score,
            quality_status,
            status_overridden: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Primary category, falling back to the first secondary code when the primary is blank.
    pub fn category(&self) -> Option<&str> {
        let primary = self.identity.category_primary.trim();
        if !primary.is_empty() {
            return Some(primary);
        }
        self.identity.categories_secondary.first().map(|s| s.as_str())
    }

    /// Adds corroborating sources. Blank names are ignored.
    pub fn corroborate<I, S>(&mut self, sources: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for source in sources {
            let source = source.as_ref().trim();
            if !source.is_empty() {
                self.sources.insert(source.to_string());
            }
        }
    }

    /// Distinct corroborating sources plus any provenance source, at least one.
    pub fn source_count(&self) -> usize {
        let mut sources: BTreeSet<&str> = self.sources.iter().map(|s| s.as_str()).collect();
        sources.extend(self.provenance.iter().map(|p| p.source.as_str()));
        sources.len().max(1)
    }

    /// Manual approval. Refused when the score is under the auto-approve threshold.
    pub fn approve(&mut self, auto_approve_threshold: f64, now: DateTime<Utc>) -> Result<()> {
        if self.confidence_score < auto_approve_threshold {
            return Err(DirectoryError::ApprovalBelowThreshold {
                score: self.confidence_score,
                threshold: auto_approve_threshold,
            });
        }
        self.set_manual_status(QualityStatus::Approved, now);
        Ok(())
    }

    pub fn reject(&mut self, now: DateTime<Utc>) {
        self.set_manual_status(QualityStatus::Rejected, now);
    }

    pub fn block(&mut self, now: DateTime<Utc>) {
        self.set_manual_status(QualityStatus::Blocked, now);
    }

    /// Marks a candidate as enriched after additional sources were merged in.
    /// Pinned statuses are left alone.
    pub fn mark_enriched(&mut self, now: DateTime<Utc>) {
        if !self.status_overridden && self.quality_status == QualityStatus::Candidate {
            self.quality_status = QualityStatus::Enriched;
            self.updated_at = now;
        }
    }

    fn set_manual_status(&mut self, status: QualityStatus, now: DateTime<Utc>) {
        self.quality_status = status;
        self.status_overridden = true;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_record(score: f64, status: QualityStatus) -> GoldenRecord {
        let now = Utc::now();
        GoldenRecord {
            id: Uuid::new_v4(),
            identity: ContactIdentity {
                display_name: "Hundeschule Wau".to_string(),
                category_primary: "dog_training".to_string(),
                ..Default::default()
            },
            address: ContactAddress { country: "DE".to_string(), ..Default::default() },
            channels: ContactChannels::default(),
            compliance: ComplianceFlags::default(),
            provenance: Vec::new(),
            sources: BTreeSet::new(),
            confidence_score: score,
            quality_status: status,
            status_overridden: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_approve_requires_threshold() {
        let mut record = sample_record(0.70, QualityStatus::NeedsReview);
        let result = record.approve(0.85, Utc::now());
        assert!(matches!(result, Err(DirectoryError::ApprovalBelowThreshold { .. })));
        assert_eq!(record.quality_status, QualityStatus::NeedsReview);

        record.confidence_score = 0.86;
        record.approve(0.85, Utc::now()).unwrap();
        assert_eq!(record.quality_status, QualityStatus::Approved);
        assert!(record.status_overridden);
    }

    #[test]
    fn test_reject_and_block_pin_status() {
        let mut record = sample_record(0.3, QualityStatus::Candidate);
        record.reject(Utc::now());
        assert_eq!(record.quality_status, QualityStatus::Rejected);
        record.mark_enriched(Utc::now());
        assert_eq!(record.quality_status, QualityStatus::Rejected);
        record.block(Utc::now());
        assert_eq!(record.quality_status, QualityStatus::Blocked);
    }

    #[test]
    fn test_from_normalized_records_provenance_per_field() {
        let contact = NormalizedContact {
            company: Some("Tierklinik Nord".to_string()),
            email: Some("info@tierklinik-nord.de".to_string()),
            city: Some("Hamburg".to_string()),
            street: Some(" ".to_string()),
            ..Default::default()
        };
        let category = CategoryClassification { primary: "veterinary".to_string(), secondary: vec![] };
        let record = GoldenRecord::from_normalized(
            &contact,
            category,
            "google_places",
            Some("place-1"),
            0.62,
            QualityStatus::NeedsReview,
            Utc::now(),
        );

        assert_eq!(record.identity.display_name, "Tierklinik Nord");
        assert_eq!(record.identity.entity_kind, EntityKind::Company);
        assert_eq!(record.category(), Some("veterinary"));
        let fields: Vec<&str> = record.provenance.iter().map(|p| p.field_name.as_str()).collect();
        assert_eq!(fields, vec!["company", "email", "city"]);
        assert_eq!(record.source_count(), 1);
        assert!(!record.compliance.is_suppressed());
    }

    #[test]
    fn test_category_falls_back_to_secondary() {
        let mut record = sample_record(0.5, QualityStatus::Candidate);
        record.identity.category_primary = " ".to_string();
        record.identity.categories_secondary = vec!["veterinary".to_string()];
        assert_eq!(record.category(), Some("veterinary"));
    }

    #[test]
    fn test_source_count_is_distinct() {
        let mut record = sample_record(0.5, QualityStatus::Candidate);
        let now = Utc::now();
        for (field, source) in [("email", "apify"), ("phone", "apify"), ("domain", "google_places")] {
            record.provenance.push(FieldProvenance {
                field_name: field.to_string(),
                source: source.to_string(),
                provider_object_id: None,
                fetched_at: now,
            });
        }
        assert_eq!(record.source_count(), 2);
    }

    #[test]
    fn test_corroborating_sources_count_without_provenance() {
        let mut record = sample_record(0.5, QualityStatus::Candidate);
        assert_eq!(record.source_count(), 1);

        record.corroborate(["apify", " ", "firecrawl", "apify"]);
        assert_eq!(record.source_count(), 2);

        record.provenance.push(FieldProvenance {
            field_name: "email".to_string(),
            source: "google_places".to_string(),
            provider_object_id: None,
            fetched_at: Utc::now(),
        });
        assert_eq!(record.source_count(), 3);
    }
}
