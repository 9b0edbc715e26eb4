use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use market_directory::app::directory_use_case::DirectoryUseCase;
use market_directory::app::outreach_use_case::{OutreachUseCase, StepTemplate};
use market_directory::config::Config;
use market_directory::discovery::{
    default_region_seed, plan_daily_budget, plan_discovery_run, score_regions, CreditLedger, RegionQueueEntry,
};
use market_directory::domain::GoldenRecord;
use market_directory::infra::memory::{InMemoryContactStore, InMemoryEventLog, InMemoryReviewQueue};
use market_directory::infra::rate_limiter_adapter::RateLimiterAdapter;
use market_directory::infra::sender::LogOnlySender;
use market_directory::logging;
use market_directory::observability;
use market_directory::outreach::{classify_inbound, InboundMessage, OutreachThread, SegmentFilter, SequenceStep};
use market_directory::pipeline::ingestion::{IdempotencyLedger, ProviderRateLimiter};
use market_directory::pipeline::processing::normalize::{normalize_contact, RawContactInput};

#[derive(Parser)]
#[command(name = "market-directory")]
#[command(about = "Business contact directory engine: normalize, score, dedupe, plan discovery, classify replies")]
#[command(version = "0.1.0")]
struct Cli {
    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw records (JSON array) without scoring or matching
    Normalize {
        #[arg(long)]
        input: PathBuf,
    },
    /// Run raw records (JSON array) through the full directory pipeline
    Ingest {
        #[arg(long)]
        input: PathBuf,
    },
    /// Score regions and plan today's discovery batches
    Plan {
        /// Region queue as JSON array; the built-in German city seed when omitted
        #[arg(long)]
        regions: Option<PathBuf>,
        #[arg(long, default_value = "default")]
        tenant: String,
        /// Run date (YYYY-MM-DD), today when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Credits already spent today
        #[arg(long, default_value_t = 0)]
        credits_used: u32,
    },
    /// Dry-run the first sequence step for a segment of golden records (JSON array)
    Outreach {
        #[arg(long)]
        records: PathBuf,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        /// Only records in these categories (comma-separated)
        #[arg(long)]
        categories: Option<String>,
    },
    /// Classify one inbound message
    ClassifyInbound {
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long, default_value = "")]
        from: String,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();
    if let Err(e) = observability::init() {
        warn!("Metrics recorder not installed: {}", e);
    }
    observability::heartbeat();

    let cli = Cli::parse();
    let config = Config::load()?;
    let now = Utc::now();

    match cli.command {
        Commands::Normalize { input } => {
            let raws: Vec<RawContactInput> = read_json(&input)?;
            let results: Vec<_> = raws.iter().map(normalize_contact).collect();
            info!("Normalized {} records", results.len());
            print_json(&results)?;
        }
        Commands::Ingest { input } => {
            let raws: Vec<RawContactInput> = read_json(&input)?;
            let store = Arc::new(InMemoryContactStore::new());
            let queue = Arc::new(InMemoryReviewQueue::new());
            let limiter = Arc::new(RateLimiterAdapter(ProviderRateLimiter::from_config(&config.providers)));
            let use_case =
                DirectoryUseCase::from_config(&config, store.clone(), queue.clone()).with_rate_limiter(limiter);

            let (reports, run_metrics) = use_case.ingest_batch(&raws, now).await?;

            #[derive(Serialize)]
            struct IngestSummary<'a> {
                reports: &'a [market_directory::app::directory_use_case::IngestReport],
                run_metrics: &'a market_directory::discovery::DiscoveryRunMetrics,
                records: Vec<GoldenRecord>,
                review_queue: Vec<market_directory::app::ports::ReviewItem>,
            }
            print_json(&IngestSummary {
                reports: &reports,
                run_metrics: &run_metrics,
                records: store.records().await,
                review_queue: queue.items().await,
            })?;
        }
        Commands::Plan { regions, tenant, date, credits_used } => {
            let regions: Vec<RegionQueueEntry> = match regions {
                Some(path) => read_json(&path)?,
                None => default_region_seed(),
            };
            let scored = score_regions(regions, now);
            let budget_plan = plan_daily_budget(scored, &config.discovery.budget);

            let discovery = &config.discovery;
            let mut credits = CreditLedger::new(discovery.max_credits_per_day, discovery.cost_per_batch, credits_used);
            let mut ledger = IdempotencyLedger::new();
            let run_date = date.unwrap_or_else(|| now.date_naive());
            let run = plan_discovery_run(&budget_plan, &mut credits, &mut ledger, &tenant, run_date, discovery.batch_size);

            #[derive(Serialize)]
            struct PlanSummary<'a> {
                budget: &'a market_directory::discovery::BudgetPlan,
                run: &'a market_directory::discovery::DiscoveryRunPlan,
            }
            print_json(&PlanSummary { budget: &budget_plan, run: &run })?;
        }
        Commands::Outreach { records, subject, body, categories } => {
            let records: Vec<GoldenRecord> = read_json(&records)?;
            let filter = SegmentFilter {
                categories: categories
                    .map(|list| list.split(',').map(|s| s.trim().to_string()).collect())
                    .unwrap_or_default(),
                ..Default::default()
            };
            let use_case = OutreachUseCase::new(&config.outreach, Arc::new(LogOnlySender), Arc::new(InMemoryEventLog::new()));
            let step = SequenceStep {
                order: 1,
                template_ref: "cli".to_string(),
                delay_days: 0,
                delay_hours: 0,
                stop_on_reply: true,
                stop_on_bounce: true,
            };

            let mut decisions = Vec::new();
            for record in use_case.segment(&records, &filter) {
                let mut thread = OutreachThread::new(record.id, None, now);
                let template = StepTemplate { step: &step, subject: &subject, body: &body };
                let decision = use_case.send_step(&mut thread, record, template, &Local::now()).await?;
                decisions.push((record.id, decision));
            }
            print_json(&decisions)?;
        }
        Commands::ClassifyInbound { subject, body, from } => {
            let message = InboundMessage {
                subject,
                body_text: body,
                from_email: from,
            };
            print_json(&classify_inbound(&message))?;
        }
    }

    if cli.print_metrics {
        if let Some(rendered) = observability::metrics::render() {
            println!("{}", rendered);
        }
    }
    Ok(())
}
