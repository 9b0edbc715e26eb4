//! Region prioritization, daily budget planning and discovery job execution.
//!
//! Region and budget state is owned by the caller and passed in by value; the
//! scoring and planning functions keep no state of their own.

pub mod budget;
pub mod job;
pub mod planner;
pub mod region;
pub mod run_metrics;

pub use budget::{plan_daily_budget, BudgetPlan, CreditLedger, DiscoveryBudget};
pub use job::{DiscoveryJob, JobRunner, JobStatus};
pub use planner::{next_scan_category, plan_discovery_run, DiscoveryRunPlan, PlannedBatch, ScanCategory, SCAN_CATEGORIES};
pub use region::{calc_region_priority, default_region_seed, score_regions, RegionPriority, RegionQueueEntry, ScanOutcome};
pub use run_metrics::{calc_run_metrics, BatchResult, DiscoveryRunMetrics};
