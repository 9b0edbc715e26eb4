use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::domain::GoldenRecord;
use crate::pipeline::processing::normalize::{normalize_phone, phone_digit_count, NormalizedContact};

pub mod merge;

pub use merge::{contact_of, merge_contacts, merge_into_golden, MergeDecision, MergeOutcome};

/// Dedupe rules in priority order; the first one that matches a pool entry wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Email,
    Domain,
    Phone,
    NameAddress,
    CompanyName,
}

impl MatchType {
    pub fn score(&self) -> f64 {
        match self {
            MatchType::Email => 0.95,
            MatchType::Domain => 0.85,
            MatchType::Phone => 0.80,
            MatchType::NameAddress => 0.70,
            MatchType::CompanyName => 0.50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Email => "email",
            MatchType::Domain => "domain",
            MatchType::Phone => "phone",
            MatchType::NameAddress => "name_address",
            MatchType::CompanyName => "company_name",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scored hypothesis that an incoming contact and an existing record are the same entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupeCandidate {
    pub existing_record_id: Uuid,
    pub match_type: MatchType,
    /// The value that matched
    pub match_field: String,
    pub score: f64,
    pub explanation: String,
}

/// The subset of an existing record needed for matching
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupePoolEntry {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub domain: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub postal_code: Option<String>,
    pub street: Option<String>,
}

impl From<&GoldenRecord> for DedupePoolEntry {
    fn from(record: &GoldenRecord) -> Self {
        Self {
            id: record.id,
            email: record.channels.email_public.clone(),
            phone: record.channels.phone_e164.clone(),
            domain: record.channels.domain.clone(),
            first_name: record.identity.first_name.clone(),
            last_name: record.identity.last_name.clone(),
            company: record.identity.legal_name.clone().or_else(|| Some(record.identity.display_name.clone())),
            postal_code: record.address.postal_code.clone(),
            street: record.address.street.clone(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Match a normalized contact against a pool of existing records.
///
/// Rules are checked per pool entry in priority order and stop at the first hit,
/// so an entry contributes at most one candidate. Result is sorted by score, best first.
pub fn find_dedupe_matches(candidate: &NormalizedContact, pool: &[DedupePoolEntry]) -> Vec<DedupeCandidate> {
    let mut matches: Vec<DedupeCandidate> = pool.iter().filter_map(|existing| match_entry(candidate, existing)).collect();
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches
}

fn match_entry(candidate: &NormalizedContact, existing: &DedupePoolEntry) -> Option<DedupeCandidate> {
    let hit = |match_type: MatchType, match_field: String, explanation: String| DedupeCandidate {
        existing_record_id: existing.id,
        match_type,
        match_field,
        score: match_type.score(),
        explanation,
    };

    // 1. email, case-insensitive
    if let (Some(a), Some(b)) = (non_empty(&candidate.email), non_empty(&existing.email)) {
        if a.to_lowercase() == b.to_lowercase() {
            return Some(hit(MatchType::Email, a.to_string(), format!("Email match: {}", a)));
        }
    }

    // 2. normalized domain
    if let (Some(a), Some(b)) = (non_empty(&candidate.domain), non_empty(&existing.domain)) {
        if a == b {
            return Some(hit(MatchType::Domain, a.to_string(), format!("Domain match: {}", a)));
        }
    }

    // 3. phone, only for numbers long enough to be unambiguous
    if let (Some(a), Some(b)) = (non_empty(&candidate.phone_e164), non_empty(&existing.phone)) {
        let existing_phone = normalize_phone(Some(b));
        if a == existing_phone && phone_digit_count(a) >= 10 {
            return Some(hit(MatchType::Phone, a.to_string(), format!("Phone match: {}", a)));
        }
    }

    // 4. last name + postal code + street
    if let (Some(last_a), Some(last_b), Some(plz_a), Some(plz_b), Some(street_a), Some(street_b)) = (
        non_empty(&candidate.last_name),
        non_empty(&existing.last_name),
        non_empty(&candidate.postal_code),
        non_empty(&existing.postal_code),
        non_empty(&candidate.street),
        non_empty(&existing.street),
    ) {
        if last_a.to_lowercase() == last_b.to_lowercase() && plz_a == plz_b && squash(street_a) == squash(street_b) {
            return Some(hit(
                MatchType::NameAddress,
                format!("{}, {}", last_a, plz_a),
                format!("Name+postal code+street match: {} in {}", last_a, plz_a),
            ));
        }
    }

    // 5. company name, whitespace and case insensitive
    if let (Some(a), Some(b)) = (non_empty(&candidate.company), non_empty(&existing.company)) {
        if squash(a) == squash(b) {
            return Some(hit(MatchType::CompanyName, a.to_string(), format!("Company name match: {}", a)));
        }
    }

    None
}

/// What the caller should do with a ranked candidate list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DedupeResolution {
    /// Strong match: merge into this record without review
    AutoMerge(DedupeCandidate),
    /// Weaker matches that a reviewer has to confirm
    ManualReview(Vec<DedupeCandidate>),
    /// No match at all
    NewRecord,
}

/// Caller-side auto-merge policy. The matcher itself never decides to merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupePolicy {
    pub auto_merge_types: Vec<MatchType>,
}

impl Default for DedupePolicy {
    fn default() -> Self {
        Self {
            auto_merge_types: vec![MatchType::Email, MatchType::Domain],
        }
    }
}

impl DedupePolicy {
    pub fn resolve(&self, candidates: &[DedupeCandidate]) -> DedupeResolution {
        match candidates.first() {
            None => DedupeResolution::NewRecord,
            Some(best) if self.auto_merge_types.contains(&best.match_type) => DedupeResolution::AutoMerge(best.clone()),
            Some(_) => DedupeResolution::ManualReview(candidates.to_vec()),
        }
    }
}

const EMPTY_DEDUPE_KEY: &str = "|||";

/// Deterministic key for cheap exact-duplicate checks: `email|phone|last_name|postal_code`.
pub fn build_dedupe_key(contact: &NormalizedContact) -> String {
    [
        contact.email.as_deref().map(|s| s.trim().to_lowercase()).unwrap_or_default(),
        contact.phone_e164.clone().unwrap_or_default(),
        contact.last_name.as_deref().map(|s| s.trim().to_lowercase()).unwrap_or_default(),
        contact.postal_code.clone().unwrap_or_default(),
    ]
    .join("|")
}

/// Drops exact repeats inside one discovery batch. Contacts with an all-empty
/// key are never treated as duplicates of each other.
#[derive(Debug, Default)]
pub struct BatchDeduper {
    seen: HashSet<String>,
    duplicates: usize,
}

impl BatchDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a key is seen.
    pub fn admit(&mut self, contact: &NormalizedContact) -> bool {
        let key = build_dedupe_key(contact);
        if key == EMPTY_DEDUPE_KEY {
            return true;
        }
        if self.seen.insert(key) {
            true
        } else {
            self.duplicates += 1;
            false
        }
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
