use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::discovery::budget::{BudgetPlan, CreditLedger};
use crate::discovery::region::RegionQueueEntry;
use crate::observability::metrics;
use crate::pipeline::ingestion::idempotency::{compute_job_key, IdempotencyLedger};

/// A category the scheduler rotates through, with the search query sent to providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCategory {
    pub code: &'static str,
    pub label: &'static str,
    pub query: &'static str,
}

pub const SCAN_CATEGORIES: [ScanCategory; 12] = [
    ScanCategory { code: "financial_advisor", label: "Finanzberater", query: "Finanzberater" },
    ScanCategory { code: "insurance_broker_34d", label: "Versicherungsmakler", query: "Versicherungsmakler" },
    ScanCategory { code: "mortgage_broker_34i", label: "Baufinanzierung", query: "Immobiliardarlehensvermittler Baufinanzierung" },
    ScanCategory { code: "property_management", label: "Hausverwaltung", query: "Hausverwaltung" },
    ScanCategory { code: "real_estate_agent", label: "Immobilienmakler", query: "Immobilienmakler" },
    ScanCategory { code: "dog_boarding", label: "Hundepension", query: "Hundepension Hundehotel" },
    ScanCategory { code: "dog_training", label: "Hundeschule", query: "Hundeschule Hundetrainer" },
    ScanCategory { code: "veterinary", label: "Tierarzt", query: "Tierarzt Tierklinik" },
    ScanCategory { code: "dog_grooming", label: "Hundefriseur", query: "Hundefriseur Hundesalon" },
    ScanCategory { code: "tax_advisor_re", label: "Steuerberater", query: "Steuerberater" },
    ScanCategory { code: "family_office", label: "Family Office", query: "Family Office Vermögensverwaltung" },
    ScanCategory { code: "pet_shop", label: "Zoofachhandel", query: "Zoofachhandel Tierbedarf" },
];

/// Category a region is due for next in the rotation
pub fn next_scan_category(region: &RegionQueueEntry) -> &'static ScanCategory {
    &SCAN_CATEGORIES[region.next_category_index(SCAN_CATEGORIES.len())]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedBatch {
    pub job_key: String,
    pub region_id: String,
    pub region_name: String,
    pub category_code: String,
    pub query: String,
    pub batch_size: u32,
    pub credits: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRunPlan {
    pub batches: Vec<PlannedBatch>,
    /// Job keys skipped because they already ran for this date
    pub already_run: Vec<String>,
    pub credits_remaining: u32,
}

/// Turn a budget plan into concrete batches: top regions first, then
/// exploration, one batch per region, until credits run out. Jobs whose key
/// is already in the ledger are skipped.
pub fn plan_discovery_run(
    plan: &BudgetPlan,
    credits: &mut CreditLedger,
    ledger: &mut IdempotencyLedger,
    tenant_id: &str,
    run_date: NaiveDate,
    batch_size: u32,
) -> DiscoveryRunPlan {
    let mut run = DiscoveryRunPlan::default();

    for region in plan.top_regions.iter().chain(plan.exploration.iter()) {
        if !credits.can_start_batch() {
            info!(remaining = credits.remaining(), "Not enough credits for next batch");
            break;
        }

        let category = next_scan_category(region);
        let job_key = compute_job_key(tenant_id, &region.region_id, category.code, run_date);
        if ledger.contains(&job_key) {
            debug!(region = %region.name, category = category.code, "Batch already ran today, skipping");
            run.already_run.push(job_key);
            continue;
        }

        credits.charge_batch();
        ledger.record(&job_key);
        metrics::discovery::credits_used(credits.cost_per_batch);

        run.batches.push(PlannedBatch {
            job_key,
            region_id: region.region_id.clone(),
            region_name: region.name.clone(),
            category_code: category.code.to_string(),
            query: category.query.to_string(),
            batch_size,
            credits: credits.cost_per_batch,
        });
    }

    run.credits_remaining = credits.remaining();
    info!(
        batches = run.batches.len(),
        skipped = run.already_run.len(),
        credits_remaining = run.credits_remaining,
        "Discovery run planned"
    );
    run
}
