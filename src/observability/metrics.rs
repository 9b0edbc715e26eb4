//! Metrics for the directory engine.
//!
//! Metric names live in one enum so there are no magic strings at call sites.
//! Recording is a no-op until `init()` installs the Prometheus recorder.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Heartbeat
    Heartbeat,

    // Normalize metrics
    NormalizeRecordsProcessed,
    NormalizeWarnings,
    NormalizeChanges,

    // Quality gate metrics
    QualityGateStatus,
    QualityGateConfidence,

    // Dedupe and merge metrics
    DedupeBatchDuplicates,
    DedupeMatches,
    DedupeResolutions,
    MergeFieldsFilled,

    // Category metrics
    CategoryFallbacks,

    // Discovery metrics
    DiscoveryRegionsPlanned,
    DiscoveryTotalSlots,
    DiscoveryCreditsUsed,
    JobSuccesses,
    JobRetries,
    JobFailures,
    RateLimitQuotaExhausted,

    // Outreach metrics
    OutreachSegmentSize,
    OutreachSendsDeferred,
    InboundClassified,
    SuppressionsApplied,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Heartbeat => "mktdir_heartbeat_total",

            MetricName::NormalizeRecordsProcessed => "mktdir_normalize_records_processed_total",
            MetricName::NormalizeWarnings => "mktdir_normalize_warnings_total",
            MetricName::NormalizeChanges => "mktdir_normalize_changes_total",

            MetricName::QualityGateStatus => "mktdir_quality_gate_status_total",
            MetricName::QualityGateConfidence => "mktdir_quality_gate_confidence",

            MetricName::DedupeBatchDuplicates => "mktdir_dedupe_batch_duplicates_total",
            MetricName::DedupeMatches => "mktdir_dedupe_matches_total",
            MetricName::DedupeResolutions => "mktdir_dedupe_resolutions_total",
            MetricName::MergeFieldsFilled => "mktdir_merge_fields_filled_total",

            MetricName::CategoryFallbacks => "mktdir_category_fallbacks_total",

            MetricName::DiscoveryRegionsPlanned => "mktdir_discovery_regions_planned",
            MetricName::DiscoveryTotalSlots => "mktdir_discovery_total_slots",
            MetricName::DiscoveryCreditsUsed => "mktdir_discovery_credits_used_total",
            MetricName::JobSuccesses => "mktdir_job_successes_total",
            MetricName::JobRetries => "mktdir_job_retries_total",
            MetricName::JobFailures => "mktdir_job_failures_total",
            MetricName::RateLimitQuotaExhausted => "mktdir_rate_limit_quota_exhausted_total",

            MetricName::OutreachSegmentSize => "mktdir_outreach_segment_size",
            MetricName::OutreachSendsDeferred => "mktdir_outreach_sends_deferred_total",
            MetricName::InboundClassified => "mktdir_inbound_classified_total",
            MetricName::SuppressionsApplied => "mktdir_suppressions_applied_total",
        }
    }

    /// Every metric name, for dashboards and tests
    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            Heartbeat,
            NormalizeRecordsProcessed,
            NormalizeWarnings,
            NormalizeChanges,
            QualityGateStatus,
            QualityGateConfidence,
            DedupeBatchDuplicates,
            DedupeMatches,
            DedupeResolutions,
            MergeFieldsFilled,
            CategoryFallbacks,
            DiscoveryRegionsPlanned,
            DiscoveryTotalSlots,
            DiscoveryCreditsUsed,
            JobSuccesses,
            JobRetries,
            JobFailures,
            RateLimitQuotaExhausted,
            OutreachSegmentSize,
            OutreachSendsDeferred,
            InboundClassified,
            SuppressionsApplied,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it twice is an error from the exporter.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Current metrics in Prometheus text format, if `init()` ran
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

pub fn heartbeat() {
    ::metrics::counter!(MetricName::Heartbeat.as_str()).increment(1);
}

pub fn emit_counter(name: MetricName, value: f64) {
    ::metrics::counter!(name.as_str()).increment(value.max(0.0) as u64);
}

pub fn emit_labeled_counter(name: MetricName, label: &'static str, value: &str) {
    ::metrics::counter!(name.as_str(), label => value.to_string()).increment(1);
}

pub fn emit_histogram(name: MetricName, value: f64) {
    ::metrics::histogram!(name.as_str()).record(value);
}

pub fn emit_gauge(name: MetricName, value: f64) {
    ::metrics::gauge!(name.as_str()).set(value);
}

// ============================================================================
// Phase helpers
// ============================================================================

pub mod normalize {
    use super::{emit_counter, MetricName};

    pub fn record_normalized(changes: usize, warnings: usize) {
        emit_counter(MetricName::NormalizeRecordsProcessed, 1.0);
        emit_counter(MetricName::NormalizeChanges, changes as f64);
        emit_counter(MetricName::NormalizeWarnings, warnings as f64);
    }
}

pub mod quality_gate {
    use super::{emit_histogram, emit_labeled_counter, MetricName};
    use crate::domain::QualityStatus;

    pub fn record_assessment(score: f64, status: QualityStatus) {
        emit_histogram(MetricName::QualityGateConfidence, score);
        emit_labeled_counter(MetricName::QualityGateStatus, "status", status.as_str());
    }
}

pub mod dedupe {
    use super::{emit_counter, emit_labeled_counter, MetricName};

    pub fn batch_duplicate() {
        emit_counter(MetricName::DedupeBatchDuplicates, 1.0);
    }

    pub fn match_found(match_type: &str) {
        emit_labeled_counter(MetricName::DedupeMatches, "match_type", match_type);
    }

    pub fn resolved(resolution: &str) {
        emit_labeled_counter(MetricName::DedupeResolutions, "resolution", resolution);
    }

    pub fn fields_filled(count: usize) {
        emit_counter(MetricName::MergeFieldsFilled, count as f64);
    }
}

pub mod discovery {
    use super::{emit_counter, emit_gauge, emit_labeled_counter, MetricName};

    pub fn plan_built(regions: usize, total_slots: u32) {
        emit_gauge(MetricName::DiscoveryRegionsPlanned, regions as f64);
        emit_gauge(MetricName::DiscoveryTotalSlots, total_slots as f64);
    }

    pub fn credits_used(credits: u32) {
        emit_counter(MetricName::DiscoveryCreditsUsed, credits as f64);
    }

    pub fn job_succeeded() {
        emit_counter(MetricName::JobSuccesses, 1.0);
    }

    pub fn job_retried() {
        emit_counter(MetricName::JobRetries, 1.0);
    }

    pub fn job_failed() {
        emit_counter(MetricName::JobFailures, 1.0);
    }

    pub fn quota_exhausted(provider: &str) {
        emit_labeled_counter(MetricName::RateLimitQuotaExhausted, "provider", provider);
    }
}

pub mod outreach {
    use super::{emit_gauge, emit_labeled_counter, MetricName};

    pub fn segment_selected(size: usize) {
        emit_gauge(MetricName::OutreachSegmentSize, size as f64);
    }

    pub fn send_deferred(reason: &str) {
        emit_labeled_counter(MetricName::OutreachSendsDeferred, "reason", reason);
    }

    pub fn inbound_classified(kind: &str) {
        emit_labeled_counter(MetricName::InboundClassified, "kind", kind);
    }

    pub fn suppression_applied(reason: &str) {
        emit_labeled_counter(MetricName::SuppressionsApplied, "reason", reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let names: Vec<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
        assert!(names.iter().all(|n| n.starts_with("mktdir_")));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        emit_counter(MetricName::Heartbeat, 1.0);
        dedupe::match_found("email");
        assert_eq!(MetricName::Heartbeat.to_string(), "mktdir_heartbeat_total");
    }
}
