use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::QualityStatus;
use crate::pipeline::processing::normalize::{phone_digit_count, NormalizedContact};

/// Per-signal scores, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceComponents {
    /// Name and/or company present
    pub identity_match: f64,
    /// Street, postal code, city completeness
    pub address_quality: f64,
    /// Phone present and E.164-shaped
    pub phone_validity: f64,
    /// Website domain (or at least an email) present
    pub domain_validity: f64,
    /// Corroborating source count, normalized
    pub source_count: f64,
    /// Share of key fields that are filled
    pub consistency: f64,
}

/// Fixed weights of the confidence components; they sum to 1.0.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceWeights {
    pub identity_match: f64,
    pub address_quality: f64,
    pub phone_validity: f64,
    pub domain_validity: f64,
    pub source_count: f64,
    pub consistency: f64,
}

pub const CONFIDENCE_WEIGHTS: ConfidenceWeights = ConfidenceWeights {
    identity_match: 0.25,
    address_quality: 0.20,
    phone_validity: 0.15,
    domain_validity: 0.15,
    source_count: 0.10,
    consistency: 0.15,
};

impl ConfidenceComponents {
    pub fn weighted_sum(&self, weights: &ConfidenceWeights) -> f64 {
        self.identity_match * weights.identity_match
            + self.address_quality * weights.address_quality
            + self.phone_validity * weights.phone_validity
            + self.domain_validity * weights.domain_validity
            + self.source_count * weights.source_count
            + self.consistency * weights.consistency
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceResult {
    /// Weighted score, clamped to [0, 1] and rounded to two decimals
    pub score: f64,
    pub components: ConfidenceComponents,
    /// Human-readable summary of the strongest and weakest signals
    pub explanation: String,
}

/// Score a normalized contact. Deterministic and total: any input, including an
/// empty contact, produces a score in [0, 1].
pub fn calc_confidence(contact: &NormalizedContact, source_count: usize) -> ConfidenceResult {
    let components = ConfidenceComponents {
        identity_match: identity_match(contact),
        address_quality: address_quality(contact),
        phone_validity: phone_validity(contact.phone_e164.as_deref()),
        domain_validity: domain_validity(contact),
        source_count: source_count_score(source_count),
        consistency: consistency(contact),
    };

    let raw = components.weighted_sum(&CONFIDENCE_WEIGHTS);
    let clamped = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };
    let score = (clamped * 100.0).round() / 100.0;

    ConfidenceResult {
        score,
        components,
        explanation: explain(&components),
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

fn identity_match(c: &NormalizedContact) -> f64 {
    let mut score = 0.0;
    if present(&c.company) {
        score += 0.4;
    }
    if present(&c.first_name) && present(&c.last_name) {
        score += 0.6;
    } else if present(&c.last_name) {
        score += 0.3;
    }
    score
}

fn address_quality(c: &NormalizedContact) -> f64 {
    let mut score: f64 = 0.0;
    if present(&c.city) {
        score += 0.3;
    }
    if present(&c.postal_code) {
        score += 0.3;
    }
    if present(&c.street) {
        score += 0.4;
    }
    score.min(1.0)
}

fn phone_validity(phone: Option<&str>) -> f64 {
    let phone = match phone {
        Some(p) => p.trim(),
        None => return 0.0,
    };
    let digits = phone_digit_count(phone);
    if phone.starts_with('+') && digits >= 10 {
        1.0
    } else if digits >= 6 {
        0.5
    } else {
        0.0
    }
}

fn domain_validity(c: &NormalizedContact) -> f64 {
    if c.domain.as_deref().map(|d| d.contains('.')).unwrap_or(false) {
        1.0
    } else if c.email.as_deref().map(|e| e.contains('@')).unwrap_or(false) {
        0.6
    } else {
        0.0
    }
}

fn source_count_score(sources: usize) -> f64 {
    match sources {
        n if n >= 3 => 1.0,
        2 => 0.6,
        _ => 0.3,
    }
}

fn consistency(c: &NormalizedContact) -> f64 {
    let filled = [
        &c.first_name,
        &c.last_name,
        &c.company,
        &c.email,
        &c.phone_e164,
        &c.domain,
        &c.city,
    ]
    .iter()
    .filter(|v| present(v))
    .count();
    (filled as f64 / 5.0).min(1.0)
}

fn explain(components: &ConfidenceComponents) -> String {
    let mut parts = Vec::new();

    if components.identity_match >= 0.6 {
        parts.push("name complete");
    } else if components.identity_match >= 0.3 {
        parts.push("name partial");
    } else {
        parts.push("name missing");
    }

    if components.address_quality >= 0.7 {
        parts.push("address complete");
    } else if components.address_quality >= 0.3 {
        parts.push("address partial");
    }

    if components.phone_validity >= 0.8 {
        parts.push("phone valid");
    }
    if components.domain_validity >= 0.8 {
        parts.push("domain present");
    }

    parts.join(", ")
}

/// Score thresholds of the quality gate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// At or above: approved without review
    pub auto_approve: f64,
    /// At or above (and below auto_approve): needs manual review
    pub needs_review: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            auto_approve: 0.85,
            needs_review: 0.60,
        }
    }
}

impl QualityThresholds {
    /// Step function from score to status. Never yields `rejected` or `blocked`;
    /// those come only from review or suppression.
    pub fn status_for(&self, score: f64) -> QualityStatus {
        if score >= self.auto_approve {
            QualityStatus::Approved
        } else if score >= self.needs_review {
            QualityStatus::NeedsReview
        } else {
            QualityStatus::Candidate
        }
    }
}

/// Apply the default quality gate thresholds.
pub fn apply_quality_gate(score: f64) -> QualityStatus {
    QualityThresholds::default().status_for(score)
}

/// Outcome of scoring one contact and passing it through the gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub confidence: ConfidenceResult,
    pub status: QualityStatus,
}

/// Trait for implementing Quality Gate assessment logic
pub trait QualityGate {
    fn assess(&self, contact: &NormalizedContact, source_count: usize) -> QualityAssessment;
}

#[derive(Debug, Clone, Default)]
pub struct DefaultQualityGate {
    pub thresholds: QualityThresholds,
}

impl DefaultQualityGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }
}

impl QualityGate for DefaultQualityGate {
    fn assess(&self, contact: &NormalizedContact, source_count: usize) -> QualityAssessment {
        let confidence = calc_confidence(contact, source_count);
        let status = self.thresholds.status_for(confidence.score);
        debug!(score = confidence.score, status = %status, "quality gate decision");
        QualityAssessment { confidence, status }
    }
}
