use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::CONTACTS_PER_BATCH;
use crate::discovery::region::RegionQueueEntry;
use crate::observability::metrics;

/// Daily planning configuration. Read by the planner, never written by it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryBudget {
    pub top_regions_pct: f64,
    pub exploration_pct: f64,
    pub raw_target: u32,
    pub approved_target: u32,
    pub review_threshold: f64,
}

impl Default for DiscoveryBudget {
    fn default() -> Self {
        Self {
            top_regions_pct: 0.70,
            exploration_pct: 0.30,
            raw_target: 500,
            approved_target: 100,
            review_threshold: 0.60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetPlan {
    pub top_regions: Vec<RegionQueueEntry>,
    pub exploration: Vec<RegionQueueEntry>,
    /// Estimated number of discovery batches for the raw target
    pub total_slots: u32,
}

/// Split regions, by descending priority, into a top slice of
/// `ceil(count * top_regions_pct)` and an exploration remainder.
pub fn plan_daily_budget(mut regions: Vec<RegionQueueEntry>, budget: &DiscoveryBudget) -> BudgetPlan {
    regions.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));

    let pct = budget.top_regions_pct.clamp(0.0, 1.0);
    // subtract float noise so 10 * 0.7 stays 7
    let top_count = ((regions.len() as f64 * pct) - 1e-9).ceil().max(0.0) as usize;
    let top_count = top_count.min(regions.len());

    let exploration = regions.split_off(top_count);
    let total_slots = budget.raw_target.div_ceil(CONTACTS_PER_BATCH);
    metrics::discovery::plan_built(regions.len() + exploration.len(), total_slots);

    info!(
        top = regions.len(),
        exploration = exploration.len(),
        total_slots,
        "Planned daily discovery budget"
    );

    BudgetPlan {
        top_regions: regions,
        exploration,
        total_slots,
    }
}

/// Daily credit accounting with a preflight check before each batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditLedger {
    pub max_per_day: u32,
    pub cost_per_batch: u32,
    pub used_today: u32,
}

impl CreditLedger {
    pub fn new(max_per_day: u32, cost_per_batch: u32, used_today: u32) -> Self {
        Self {
            max_per_day,
            cost_per_batch,
            used_today,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.max_per_day.saturating_sub(self.used_today)
    }

    pub fn can_start_batch(&self) -> bool {
        self.remaining() >= self.cost_per_batch
    }

    /// Charge one batch. Returns false, charging nothing, when credits do not cover it.
    pub fn charge_batch(&mut self) -> bool {
        if !self.can_start_batch() {
            return false;
        }
        self.used_today += self.cost_per_batch;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions(n: usize) -> Vec<RegionQueueEntry> {
        (0..n)
            .map(|i| {
                let mut r = RegionQueueEntry::new(format!("r{}", i), format!("Region {}", i), None);
                r.priority_score = i as f64;
                r
            })
            .collect()
    }

    #[test]
    fn test_ten_regions_split_seven_three() {
        let plan = plan_daily_budget(regions(10), &DiscoveryBudget::default());
        assert_eq!(plan.top_regions.len(), 7);
        assert_eq!(plan.exploration.len(), 3);
        assert_eq!(plan.top_regions[0].priority_score, 9.0);
        assert_eq!(plan.exploration.last().map(|r| r.priority_score), Some(0.0));
        assert_eq!(plan.total_slots, 20);
    }

    #[test]
    fn test_ceiling_rounds_up() {
        let plan = plan_daily_budget(regions(3), &DiscoveryBudget::default());
        // ceil(2.1) = 3
        assert_eq!(plan.top_regions.len(), 3);
        assert!(plan.exploration.is_empty());
    }

    #[test]
    fn test_empty_and_slot_rounding() {
        let budget = DiscoveryBudget { raw_target: 26, ..Default::default() };
        let plan = plan_daily_budget(Vec::new(), &budget);
        assert!(plan.top_regions.is_empty());
        assert_eq!(plan.total_slots, 2);
    }

    #[test]
    fn test_credit_preflight() {
        let mut ledger = CreditLedger::new(200, 6, 190);
        assert!(ledger.charge_batch());
        assert_eq!(ledger.remaining(), 4);
        assert!(!ledger.can_start_batch());
        assert!(!ledger.charge_batch());
        assert_eq!(ledger.used_today, 196);
    }
}
