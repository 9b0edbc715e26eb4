use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{GoldenRecord, QualityStatus};

/// Campaign segment filter. Empty allow-lists do not filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentFilter {
    pub statuses: Vec<QualityStatus>,
    pub require_email: bool,
    /// Include records with a do-not-contact flag
    pub include_do_not_contact: bool,
    pub categories: Vec<String>,
    /// City substrings or postal code prefixes
    pub regions: Vec<String>,
    pub min_confidence: Option<f64>,
}

impl Default for SegmentFilter {
    fn default() -> Self {
        Self {
            statuses: vec![QualityStatus::Approved],
            require_email: true,
            include_do_not_contact: false,
            categories: Vec::new(),
            regions: Vec::new(),
            min_confidence: None,
        }
    }
}

fn has_email(record: &GoldenRecord) -> bool {
    record
        .channels
        .email_public
        .as_deref()
        .map(|e| !e.trim().is_empty())
        .unwrap_or(false)
}

fn in_region(record: &GoldenRecord, regions: &[String]) -> bool {
    let city = record.address.city.as_deref().unwrap_or_default().to_lowercase();
    let postal = record.address.postal_code.as_deref().unwrap_or_default();
    regions.iter().any(|region| {
        let region = region.trim();
        if region.is_empty() {
            return false;
        }
        (!city.is_empty() && city.contains(&region.to_lowercase())) || (!postal.is_empty() && postal.starts_with(region))
    })
}

impl SegmentFilter {
    /// Checks in order: status, email, do-not-contact, category, region, confidence.
    pub fn matches(&self, record: &GoldenRecord) -> bool {
        if !self.statuses.contains(&record.quality_status) {
            return false;
        }
        if self.require_email && !has_email(record) {
            return false;
        }
        if !self.include_do_not_contact && record.compliance.is_suppressed() {
            return false;
        }
        if !self.categories.is_empty() {
            match record.category() {
                Some(code) if self.categories.iter().any(|c| c == code) => {}
                _ => return false,
            }
        }
        if !self.regions.is_empty() && !in_region(record, &self.regions) {
            return false;
        }
        if let Some(min) = self.min_confidence {
            if record.confidence_score < min {
                return false;
            }
        }
        true
    }
}

pub fn select_segment<'a>(records: &'a [GoldenRecord], filter: &SegmentFilter) -> Vec<&'a GoldenRecord> {
    let selected: Vec<&GoldenRecord> = records.iter().filter(|r| filter.matches(r)).collect();
    debug!(candidates = records.len(), selected = selected.len(), "Segment selected");
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComplianceFlags, ContactAddress, ContactChannels, ContactIdentity};
    use chrono::Utc;
    use uuid::Uuid;

    fn record(status: QualityStatus, email: Option<&str>, city: &str, postal: &str, category: &str, score: f64) -> GoldenRecord {
        let now = Utc::now();
        GoldenRecord {
            id: Uuid::new_v4(),
            identity: ContactIdentity {
                display_name: "Test".to_string(),
                category_primary: category.to_string(),
                ..Default::default()
            },
            address: ContactAddress {
                city: Some(city.to_string()),
                postal_code: Some(postal.to_string()),
                country: "DE".to_string(),
                ..Default::default()
            },
            channels: ContactChannels {
                email_public: email.map(str::to_string),
                ..Default::default()
            },
            compliance: ComplianceFlags::default(),
            provenance: Vec::new(),
            sources: Default::default(),
            confidence_score: score,
            quality_status: status,
            status_overridden: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_default_filter_keeps_approved_with_email() {
        let records = vec![
            record(QualityStatus::Approved, Some("a@x.de"), "Berlin", "10115", "bank_retail", 0.9),
            record(QualityStatus::NeedsReview, Some("b@x.de"), "Berlin", "10115", "bank_retail", 0.7),
            record(QualityStatus::Approved, None, "Berlin", "10115", "bank_retail", 0.9),
        ];
        let selected = select_segment(&records, &SegmentFilter::default());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].channels.email_public.as_deref(), Some("a@x.de"));
    }

    #[test]
    fn test_do_not_contact_excluded_unless_overridden() {
        let mut suppressed = record(QualityStatus::Approved, Some("a@x.de"), "Berlin", "10115", "bank_retail", 0.9);
        suppressed.compliance.do_not_contact_email = true;
        let records = vec![suppressed];

        assert!(select_segment(&records, &SegmentFilter::default()).is_empty());
        let filter = SegmentFilter { include_do_not_contact: true, ..Default::default() };
        assert_eq!(select_segment(&records, &filter).len(), 1);
    }

    #[test]
    fn test_region_matches_city_or_postal_prefix() {
        let records = vec![
            record(QualityStatus::Approved, Some("a@x.de"), "Frankfurt am Main", "60311", "veterinary", 0.9),
            record(QualityStatus::Approved, Some("b@x.de"), "Offenbach", "63065", "veterinary", 0.9),
            record(QualityStatus::Approved, Some("c@x.de"), "München", "80331", "veterinary", 0.9),
        ];
        let filter = SegmentFilter { regions: vec!["frankfurt".to_string(), "63".to_string()], ..Default::default() };
        let cities: Vec<&str> = select_segment(&records, &filter)
            .iter()
            .filter_map(|r| r.address.city.as_deref())
            .collect();
        assert_eq!(cities, vec!["Frankfurt am Main", "Offenbach"]);
    }

    #[test]
    fn test_category_and_confidence() {
        let records = vec![
            record(QualityStatus::Approved, Some("a@x.de"), "Köln", "50667", "veterinary", 0.95),
            record(QualityStatus::Approved, Some("b@x.de"), "Köln", "50667", "pet_shop", 0.95),
            record(QualityStatus::Approved, Some("c@x.de"), "Köln", "50667", "veterinary", 0.86),
        ];
        let filter = SegmentFilter {
            categories: vec!["veterinary".to_string()],
            min_confidence: Some(0.9),
            ..Default::default()
        };
        let selected = select_segment(&records, &filter);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].channels.email_public.as_deref(), Some("a@x.de"));
    }
}
