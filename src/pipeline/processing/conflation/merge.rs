use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FieldProvenance, GoldenRecord};
use crate::pipeline::processing::normalize::NormalizedContact;

/// Record of one field taken over from the incoming side during a merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeDecision {
    pub field: String,
    pub winner_source: String,
    pub reason: String,
    pub old_value: Option<String>,
    pub new_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub merged: NormalizedContact,
    pub decisions: Vec<MergeDecision>,
}

const FILL_EMPTY_REASON: &str = "master field empty, incoming value taken";

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}

/// Fill-empty-only merge: an incoming value is taken only where the master field is
/// empty or blank. Non-empty master fields are never overwritten.
pub fn merge_contacts(master: &NormalizedContact, incoming: &NormalizedContact, source: &str) -> MergeOutcome {
    let mut merged = master.clone();
    let mut decisions = Vec::new();

    let fields: [(&str, &mut Option<String>, &Option<String>); 11] = [
        ("salutation", &mut merged.salutation, &incoming.salutation),
        ("first_name", &mut merged.first_name, &incoming.first_name),
        ("last_name", &mut merged.last_name, &incoming.last_name),
        ("company", &mut merged.company, &incoming.company),
        ("phone_e164", &mut merged.phone_e164, &incoming.phone_e164),
        ("email", &mut merged.email, &incoming.email),
        ("website_url", &mut merged.website_url, &incoming.website_url),
        ("domain", &mut merged.domain, &incoming.domain),
        ("street", &mut merged.street, &incoming.street),
        ("postal_code", &mut merged.postal_code, &incoming.postal_code),
        ("city", &mut merged.city, &incoming.city),
    ];

    for (name, target, value) in fields {
        if is_blank(value) || !is_blank(target) {
            continue;
        }
        let new_value = value.clone().unwrap_or_default();
        decisions.push(MergeDecision {
            field: name.to_string(),
            winner_source: source.to_string(),
            reason: FILL_EMPTY_REASON.to_string(),
            old_value: target.clone(),
            new_value: new_value.clone(),
        });
        *target = Some(new_value);
    }

    if merged.phones_additional.is_empty() && !incoming.phones_additional.is_empty() {
        merged.phones_additional = incoming.phones_additional.clone();
        decisions.push(MergeDecision {
            field: "phones_additional".to_string(),
            winner_source: source.to_string(),
            reason: FILL_EMPTY_REASON.to_string(),
            old_value: None,
            new_value: incoming.phones_additional.join(", "),
        });
    }

    MergeOutcome { merged, decisions }
}

/// Canonical contact view of a golden record
pub fn contact_of(record: &GoldenRecord) -> NormalizedContact {
    NormalizedContact {
        salutation: record.identity.salutation.clone(),
        first_name: record.identity.first_name.clone(),
        last_name: record.identity.last_name.clone(),
        company: record.identity.legal_name.clone(),
        phone_e164: record.channels.phone_e164.clone(),
        phones_additional: record.channels.phones_additional.clone(),
        email: record.channels.email_public.clone(),
        website_url: record.channels.website_url.clone(),
        domain: record.channels.domain.clone(),
        street: record.address.street.clone(),
        postal_code: record.address.postal_code.clone(),
        city: record.address.city.clone(),
    }
}

/// Merge an incoming contact into a golden record in place, recording one
/// provenance entry per field taken over.
pub fn merge_into_golden(
    record: &mut GoldenRecord,
    incoming: &NormalizedContact,
    source: &str,
    provider_object_id: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<MergeDecision> {
    record.sources.insert(source.to_string());
    let outcome = merge_contacts(&contact_of(record), incoming, source);
    if outcome.decisions.is_empty() {
        return outcome.decisions;
    }

    let merged = outcome.merged;
    let display_name = merged.display_name();
    if !display_name.is_empty() {
        record.identity.display_name = display_name;
    }
    record.identity.salutation = merged.salutation;
    record.identity.first_name = merged.first_name;
    record.identity.last_name = merged.last_name;
    record.identity.legal_name = merged.company;
    record.channels.phone_e164 = merged.phone_e164;
    record.channels.phones_additional = merged.phones_additional;
    record.channels.email_public = merged.email;
    record.channels.website_url = merged.website_url;
    record.channels.domain = merged.domain;
    record.address.street = merged.street;
    record.address.postal_code = merged.postal_code;
    record.address.city = merged.city;

    for decision in &outcome.decisions {
        record.provenance.push(FieldProvenance {
            field_name: decision.field.clone(),
            source: source.to_string(),
            provider_object_id: provider_object_id.map(str::to_string),
            fetched_at: now,
        });
    }
    record.updated_at = now;

    outcome.decisions
}
