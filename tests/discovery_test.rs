use anyhow::anyhow;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use market_directory::discovery::{
    calc_region_priority, default_region_seed, plan_daily_budget, plan_discovery_run, score_regions, CreditLedger,
    DiscoveryBudget, DiscoveryJob, JobRunner, JobStatus, RegionQueueEntry,
};
use market_directory::error::DirectoryError;
use market_directory::pipeline::ingestion::IdempotencyLedger;

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-03T05:00:00Z").unwrap().with_timezone(&Utc)
}

#[test]
fn test_ten_regions_split_seven_three() {
    let regions: Vec<RegionQueueEntry> = (0..10)
        .map(|i| {
            let mut entry = RegionQueueEntry::new(format!("r{}", i), format!("Region {}", i), None);
            entry.priority_score = i as f64;
            entry
        })
        .collect();

    let plan = plan_daily_budget(regions, &DiscoveryBudget::default());
    assert_eq!(plan.top_regions.len(), 7);
    assert_eq!(plan.exploration.len(), 3);
    assert_eq!(plan.top_regions[0].region_id, "r9");
    assert_eq!(plan.exploration[2].region_id, "r0");
    assert_eq!(plan.total_slots, 20);
}

#[test]
fn test_cooldown_pushes_region_down() {
    let fresh = RegionQueueEntry::new("a", "A", Some(500_000));
    let mut cooling = RegionQueueEntry::new("b", "B", Some(500_000));
    cooling.last_scanned_at = Some(now() - Duration::days(1));
    cooling.cooldown_until = Some(now() + Duration::days(2));

    let priority = calc_region_priority(&cooling, now());
    assert!(priority.cooldown_applied);
    assert!(priority.score < calc_region_priority(&fresh, now()).score / 10.0 + 1e-9);

    let plan = plan_daily_budget(score_regions(vec![cooling, fresh], now()), &DiscoveryBudget::default());
    assert_eq!(plan.top_regions[0].region_id, "a");
}

#[test]
fn test_plan_run_is_idempotent_per_day() {
    let run_date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    let plan = plan_daily_budget(score_regions(default_region_seed(), now()), &DiscoveryBudget::default());
    let mut ledger = IdempotencyLedger::new();

    let mut credits = CreditLedger::new(30, 6, 0);
    let first = plan_discovery_run(&plan, &mut credits, &mut ledger, "tenant-a", run_date, 25);
    assert_eq!(first.batches.len(), 5);
    assert_eq!(first.credits_remaining, 0);
    assert_eq!(first.batches[0].region_id, "berlin");

    let mut credits = CreditLedger::new(30, 6, 0);
    let second = plan_discovery_run(&plan, &mut credits, &mut ledger, "tenant-a", run_date, 25);
    assert_eq!(second.already_run.len(), 5);
    assert!(second.batches.iter().all(|b| !first.batches.iter().any(|f| f.job_key == b.job_key)));
}

#[tokio::test]
async fn test_job_fails_after_retries() {
    let runner = JobRunner::new(2);
    let mut job = DiscoveryJob::new("key", "berlin", "dog_training");

    let result: Result<(), DirectoryError> = runner
        .run(&mut job, |attempt| async move { Err(anyhow!("provider timeout on attempt {}", attempt)) })
        .await;

    assert!(matches!(result, Err(DirectoryError::RetriesExhausted { attempts: 3, .. })));
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.last_error.as_deref(), Some("provider timeout on attempt 3"));
}
