use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_COUNTRY_CODE;

pub mod address;
pub mod fields;
pub mod names;

pub use address::{parse_address_line, ParsedAddress};
pub use fields::{normalize_domain, normalize_email, normalize_phone, normalize_phone_with_country, phone_digit_count};
pub use names::{canonical_salutation, split_name, SplitName};

pub const WARNING_NO_IDENTITY: &str = "Neither a person name nor a company name is present";
pub const WARNING_NO_CHANNEL: &str = "Neither an email address nor a usable phone number is present";

/// Loosely typed intake record as delivered by provider adapters.
///
/// Providers disagree on field names, so every known alias is its own optional
/// field. Aliases are resolved once by the normalizer; nothing downstream sees them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawContactInput {
    pub salutation: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact_person_name: Option<String>,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub company: Option<String>,
    /// Map-search hits carry the business name here
    pub name: Option<String>,
    pub phone: Option<String>,
    pub phone_mobile: Option<String>,
    pub email: Option<String>,
    pub website_url: Option<String>,
    pub website: Option<String>,
    pub address_line: Option<String>,
    pub address: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    /// Provider-specific type tags (e.g. map-search place types)
    pub category_tags: Vec<String>,
    pub provider: Option<String>,
    pub provider_object_id: Option<String>,
    /// Sources that corroborate this record
    pub sources: Vec<String>,
}

/// Canonical field set produced by normalization and consumed by every later stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedContact {
    pub salutation: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub phone_e164: Option<String>,
    pub phones_additional: Vec<String>,
    pub email: Option<String>,
    pub website_url: Option<String>,
    pub domain: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
}

impl NormalizedContact {
    /// Name used for display: company first, then the person name.
    pub fn display_name(&self) -> String {
        if let Some(company) = &self.company {
            return company.clone();
        }
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .iter()
            .flatten()
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationResult {
    pub normalized: NormalizedContact,
    pub changes: Vec<FieldChange>,
    pub warnings: Vec<String>,
}

/// Trait for turning raw intake records into canonical contacts
pub trait Normalizer {
    fn normalize(&self, raw: &RawContactInput) -> NormalizationResult;
}

/// Normalizer for a single national market
#[derive(Debug, Clone)]
pub struct DefaultNormalizer {
    pub country_code: String,
}

impl Default for DefaultNormalizer {
    fn default() -> Self {
        Self { country_code: DEFAULT_COUNTRY_CODE.to_string() }
    }
}

impl Normalizer for DefaultNormalizer {
    fn normalize(&self, raw: &RawContactInput) -> NormalizationResult {
        normalize_contact_with_country(raw, &self.country_code)
    }
}

/// Normalize a raw contact using the default country code.
pub fn normalize_contact(raw: &RawContactInput) -> NormalizationResult {
    normalize_contact_with_country(raw, DEFAULT_COUNTRY_CODE)
}

pub fn normalize_contact_with_country(raw: &RawContactInput, country_code: &str) -> NormalizationResult {
    let mut changes = Vec::new();
    let mut warnings = Vec::new();

    // Names
    let mut salutation = clean(&raw.salutation);
    let mut first_name = clean(&raw.first_name);
    let mut last_name = clean(&raw.last_name);

    if first_name.is_none() && last_name.is_none() {
        if let Some(combined) = first_present(&[&raw.contact_person_name, &raw.full_name]) {
            let split = split_name(&combined);
            if salutation.is_none() {
                salutation = split.salutation;
            }
            first_name = split.first_name;
            last_name = split.last_name;
            changes.push(FieldChange {
                field: "name".to_string(),
                from: combined,
                to: join_present(&[first_name.as_deref(), last_name.as_deref()], " "),
            });
        }
    }

    let company = first_present(&[&raw.company_name, &raw.company, &raw.name]);

    // Phones
    let phone_raw = first_present(&[&raw.phone, &raw.phone_mobile]);
    let phone_e164 = phone_raw.as_deref().map(|p| normalize_phone_with_country(Some(p), country_code));
    if let (Some(from), Some(to)) = (&phone_raw, &phone_e164) {
        if from != to {
            changes.push(FieldChange { field: "phone".to_string(), from: from.clone(), to: to.clone() });
        }
    }
    let phone_e164 = phone_e164.filter(|p| !p.is_empty());

    let mut phones_additional = Vec::new();
    if clean(&raw.phone).is_some() {
        if let Some(mobile) = clean(&raw.phone_mobile) {
            let normalized = normalize_phone_with_country(Some(&mobile), country_code);
            if !normalized.is_empty() && Some(&normalized) != phone_e164.as_ref() {
                phones_additional.push(normalized);
            }
        }
    }

    // Email
    let email = match clean(&raw.email) {
        Some(original) => {
            let normalized = normalize_email(Some(&original));
            if normalized != original {
                changes.push(FieldChange { field: "email".to_string(), from: original, to: normalized.clone() });
            }
            Some(normalized)
        }
        None => None,
    };

    // Website
    let website_url = first_present(&[&raw.website_url, &raw.website]);
    let domain = website_url
        .as_deref()
        .map(|url| normalize_domain(Some(url)))
        .filter(|d| !d.is_empty());
    if let (Some(from), Some(to)) = (&website_url, &domain) {
        if from != to {
            changes.push(FieldChange { field: "domain".to_string(), from: from.clone(), to: to.clone() });
        }
    }

    // Address
    let mut street = clean(&raw.street);
    let mut postal_code = clean(&raw.postal_code);
    let mut city = clean(&raw.city);

    if street.is_none() && postal_code.is_none() {
        if let Some(line) = first_present(&[&raw.address_line, &raw.address]) {
            let parsed = parse_address_line(&line);
            street = parsed.street;
            postal_code = parsed.postal_code;
            if city.is_none() {
                city = parsed.city;
            }
            let postal_city = join_present(&[postal_code.as_deref(), city.as_deref()], " ");
            changes.push(FieldChange {
                field: "address".to_string(),
                from: line,
                to: join_present(&[street.as_deref(), Some(postal_city.as_str()).filter(|s| !s.is_empty())], ", "),
            });
        }
    }

    if first_name.is_none() && last_name.is_none() && company.is_none() {
        warnings.push(WARNING_NO_IDENTITY.to_string());
    }
    if email.is_none() && phone_e164.is_none() {
        warnings.push(WARNING_NO_CHANNEL.to_string());
    }

    NormalizationResult {
        normalized: NormalizedContact {
            salutation,
            first_name,
            last_name,
            company,
            phone_e164,
            phones_additional,
            email,
            website_url,
            domain,
            street,
            postal_code,
            city,
        },
        changes,
        warnings,
    }
}

/// Trimmed value, `None` when absent or blank.
fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_present(candidates: &[&Option<String>]) -> Option<String> {
    candidates.iter().find_map(|c| clean(c))
}

fn join_present(parts: &[Option<&str>], sep: &str) -> String {
    parts.iter().flatten().copied().collect::<Vec<_>>().join(sep)
}
