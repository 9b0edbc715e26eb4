use serde::{Deserialize, Serialize};

use crate::domain::QualityStatus;

/// Per-contact result of a discovery batch, as fed into run aggregation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub quality_status: Option<QualityStatus>,
    pub confidence_score: Option<f64>,
    pub is_duplicate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRunMetrics {
    pub raw_found: usize,
    pub normalized: usize,
    pub enriched: usize,
    pub duplicates: usize,
    pub approved: usize,
    pub needs_review: usize,
    pub rejected: usize,
    pub blocked: usize,
}

impl DiscoveryRunMetrics {
    pub fn absorb(&mut self, other: &DiscoveryRunMetrics) {
        self.raw_found += other.raw_found;
        self.normalized += other.normalized;
        self.enriched += other.enriched;
        self.duplicates += other.duplicates;
        self.approved += other.approved;
        self.needs_review += other.needs_review;
        self.rejected += other.rejected;
        self.blocked += other.blocked;
    }
}

/// Aggregate batch results. A result counts as enriched when its status says so
/// or its score is above 0.5.
pub fn calc_run_metrics(results: &[BatchResult]) -> DiscoveryRunMetrics {
    let count = |status: QualityStatus| results.iter().filter(|r| r.quality_status == Some(status)).count();

    DiscoveryRunMetrics {
        raw_found: results.len(),
        normalized: results.len(),
        enriched: results
            .iter()
            .filter(|r| {
                r.quality_status == Some(QualityStatus::Enriched) || r.confidence_score.map(|s| s > 0.5).unwrap_or(false)
            })
            .count(),
        duplicates: results.iter().filter(|r| r.is_duplicate).count(),
        approved: count(QualityStatus::Approved),
        needs_review: count(QualityStatus::NeedsReview),
        rejected: count(QualityStatus::Rejected),
        blocked: count(QualityStatus::Blocked),
    }
}
