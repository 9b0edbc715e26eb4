use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::ports::{ContactStorePort, RateLimiterPort, ReviewItem, ReviewQueuePort};
use crate::config::Config;
use crate::constants::{DISCOVERY_SOURCE, FALLBACK_CATEGORY};
use crate::discovery::run_metrics::{calc_run_metrics, BatchResult, DiscoveryRunMetrics};
use crate::domain::GoldenRecord;
use crate::observability::metrics;
use crate::pipeline::processing::category::{CategoryClassification, CategoryRegistry};
use crate::pipeline::processing::conflation::{
    contact_of, find_dedupe_matches, merge_into_golden, BatchDeduper, DedupePolicy, DedupeResolution, MergeDecision,
};
use crate::pipeline::processing::normalize::{DefaultNormalizer, NormalizationResult, Normalizer, RawContactInput};
use crate::pipeline::processing::quality_gate::{DefaultQualityGate, QualityAssessment, QualityGate};

/// What happened to one raw record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    Created { record_id: Uuid },
    Merged { record_id: Uuid, decisions: Vec<MergeDecision> },
    QueuedForReview { candidates: usize },
    BatchDuplicate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub outcome: IngestOutcome,
    pub normalization: NormalizationResult,
    pub assessment: QualityAssessment,
    pub category: CategoryClassification,
}

impl IngestReport {
    fn batch_result(&self) -> BatchResult {
        BatchResult {
            quality_status: Some(self.assessment.status),
            confidence_score: Some(self.assessment.confidence.score),
            is_duplicate: !matches!(self.outcome, IngestOutcome::Created { .. }),
        }
    }
}

/// Use case turning raw provider records into golden records:
/// normalize, score and gate, classify, dedupe against the store, then create,
/// merge or hand over to manual review.
pub struct DirectoryUseCase {
    normalizer: Box<dyn Normalizer + Send + Sync>,
    quality_gate: Box<dyn QualityGate + Send + Sync>,
    categories: Arc<CategoryRegistry>,
    dedupe_policy: DedupePolicy,
    store: Arc<dyn ContactStorePort>,
    review_queue: Arc<dyn ReviewQueuePort>,
    rate_limiter: Option<Arc<dyn RateLimiterPort>>,
}

impl DirectoryUseCase {
    pub fn new(store: Arc<dyn ContactStorePort>, review_queue: Arc<dyn ReviewQueuePort>) -> Self {
        Self {
            normalizer: Box::new(DefaultNormalizer::default()),
            quality_gate: Box::new(DefaultQualityGate::new()),
            categories: Arc::new(CategoryRegistry::builtin().clone()),
            dedupe_policy: DedupePolicy::default(),
            store,
            review_queue,
            rate_limiter: None,
        }
    }

    /// Thresholds and dedupe policy taken from the configuration
    pub fn from_config(config: &Config, store: Arc<dyn ContactStorePort>, review_queue: Arc<dyn ReviewQueuePort>) -> Self {
        let mut use_case = Self::new(store, review_queue);
        use_case.quality_gate = Box::new(DefaultQualityGate::with_thresholds(config.quality.clone()));
        use_case.dedupe_policy = config.dedupe.clone();
        use_case
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiterPort>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn with_categories(mut self, categories: Arc<CategoryRegistry>) -> Self {
        self.categories = categories;
        self
    }

    /// Run one raw record through the pipeline
    pub async fn ingest(&self, raw: &RawContactInput, now: DateTime<Utc>) -> Result<IngestReport> {
        let mut deduper = BatchDeduper::new();
        self.ingest_with(raw, &mut deduper, now).await
    }

    /// Ingest a discovery batch. Exact repeats inside the batch are dropped
    /// before they reach the store.
    pub async fn ingest_batch(
        &self,
        raws: &[RawContactInput],
        now: DateTime<Utc>,
    ) -> Result<(Vec<IngestReport>, DiscoveryRunMetrics)> {
        info!("Starting directory ingest for {} raw records", raws.len());
        let mut deduper = BatchDeduper::new();
        let mut reports = Vec::with_capacity(raws.len());

        for raw in raws {
            reports.push(self.ingest_with(raw, &mut deduper, now).await?);
        }

        let results: Vec<BatchResult> = reports.iter().map(IngestReport::batch_result).collect();
        let run_metrics = calc_run_metrics(&results);
        info!(
            raw = run_metrics.raw_found,
            duplicates = run_metrics.duplicates,
            approved = run_metrics.approved,
            needs_review = run_metrics.needs_review,
            "Directory ingest completed"
        );
        Ok((reports, run_metrics))
    }

    async fn ingest_with(
        &self,
        raw: &RawContactInput,
        deduper: &mut BatchDeduper,
        now: DateTime<Utc>,
    ) -> Result<IngestReport> {
        let source = raw.provider.clone().unwrap_or_else(|| DISCOVERY_SOURCE.to_string());

        if let (Some(limiter), Some(provider)) = (&self.rate_limiter, raw.provider.as_deref()) {
            limiter.acquire(provider).await.map_err(|e| anyhow!(e))?;
        }

        let normalization = self.normalizer.normalize(raw);
        metrics::normalize::record_normalized(normalization.changes.len(), normalization.warnings.len());
        for warning in &normalization.warnings {
            warn!(source = %source, "Normalization warning: {}", warning);
        }
        let contact = &normalization.normalized;

        let assessment = self.quality_gate.assess(contact, source_count(raw));
        metrics::quality_gate::record_assessment(assessment.confidence.score, assessment.status);

        let category = self.classify(raw, contact.company.as_deref());

        if !deduper.admit(contact) {
            metrics::dedupe::batch_duplicate();
            debug!(source = %source, "Dropping exact duplicate inside batch");
            return Ok(IngestReport {
                outcome: IngestOutcome::BatchDuplicate,
                normalization,
                assessment,
                category,
            });
        }

        let pool = self.store.dedupe_pool().await.map_err(|e| anyhow!(e))?;
        let candidates = find_dedupe_matches(contact, &pool);
        for candidate in &candidates {
            metrics::dedupe::match_found(candidate.match_type.as_str());
        }

        let outcome = match self.dedupe_policy.resolve(&candidates) {
            DedupeResolution::NewRecord => {
                metrics::dedupe::resolved("new_record");
                self.create(&normalization, &assessment, &category, &source, raw, now).await?
            }
            DedupeResolution::AutoMerge(best) => {
                metrics::dedupe::resolved("auto_merge");
                match self.store.get(best.existing_record_id).await.map_err(|e| anyhow!(e))? {
                    Some(mut record) => {
                        record.corroborate(corroborating_sources(raw));
                        let decisions = merge_into_golden(
                            &mut record,
                            contact,
                            &source,
                            raw.provider_object_id.as_deref(),
                            now,
                        );
                        metrics::dedupe::fields_filled(decisions.len());
                        self.rescore(&mut record, !decisions.is_empty(), now);
                        self.store.upsert(&record).await.map_err(|e| anyhow!(e))?;
                        info!(
                            record_id = %record.id,
                            match_type = %best.match_type,
                            fields = decisions.len(),
                            "Merged into existing golden record"
                        );
                        IngestOutcome::Merged {
                            record_id: record.id,
                            decisions,
                        }
                    }
                    None => {
                        warn!(record_id = %best.existing_record_id, "Matched record vanished from store, creating new record");
                        self.create(&normalization, &assessment, &category, &source, raw, now).await?
                    }
                }
            }
            DedupeResolution::ManualReview(candidates) => {
                metrics::dedupe::resolved("manual_review");
                let count = candidates.len();
                self.review_queue
                    .enqueue(ReviewItem {
                        contact: contact.clone(),
                        source: source.clone(),
                        candidates,
                    })
                    .await
                    .map_err(|e| anyhow!(e))?;
                info!(candidates = count, "Dedupe candidates queued for manual review");
                IngestOutcome::QueuedForReview { candidates: count }
            }
        };

        Ok(IngestReport {
            outcome,
            normalization,
            assessment,
            category,
        })
    }

    async fn create(
        &self,
        normalization: &NormalizationResult,
        assessment: &QualityAssessment,
        category: &CategoryClassification,
        source: &str,
        raw: &RawContactInput,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        let mut record = GoldenRecord::from_normalized(
            &normalization.normalized,
            category.clone(),
            source,
            raw.provider_object_id.as_deref(),
            assessment.confidence.score,
            assessment.status,
            now,
        );
        record.corroborate(corroborating_sources(raw));
        self.store.upsert(&record).await.map_err(|e| anyhow!(e))?;
        debug!(record_id = %record.id, status = %record.quality_status, "Created golden record");
        Ok(IngestOutcome::Created { record_id: record.id })
    }

    /// Score the merged record again. Reviewer-pinned statuses stay put.
    fn rescore(&self, record: &mut GoldenRecord, fields_filled: bool, now: DateTime<Utc>) {
        let assessment = self.quality_gate.assess(&contact_of(record), record.source_count());
        record.confidence_score = assessment.confidence.score;
        if !record.status_overridden {
            record.quality_status = assessment.status;
            if fields_filled {
                record.mark_enriched(now);
            }
        }
    }

    fn classify(&self, raw: &RawContactInput, company: Option<&str>) -> CategoryClassification {
        if let Some(provider) = raw.provider.as_deref() {
            let tagged = raw
                .category_tags
                .iter()
                .map(|tag| self.categories.classify_provider_tag(provider, tag))
                .find(|c| c.primary != FALLBACK_CATEGORY);
            if let Some(classification) = tagged {
                return classification;
            }
        }

        let classification = self.categories.classify_text(company, raw.description.as_deref());
        if classification.primary == FALLBACK_CATEGORY {
            metrics::emit_counter(metrics::MetricName::CategoryFallbacks, 1.0);
        }
        classification
    }
}

/// Listed sources plus the delivering provider
fn corroborating_sources(raw: &RawContactInput) -> BTreeSet<&str> {
    let mut sources: BTreeSet<&str> = raw.sources.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    if let Some(provider) = raw.provider.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        sources.insert(provider);
    }
    sources
}

/// Distinct corroborating sources, at least one
fn source_count(raw: &RawContactInput) -> usize {
    corroborating_sources(raw).len().max(1)
}
