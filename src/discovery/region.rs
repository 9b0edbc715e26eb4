use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{DEFAULT_REGION_POPULATION, NEVER_SCANNED_DAYS};

const POPULATION_FACTOR_CAP: f64 = 40.0;
const FRESHNESS_CAP: f64 = 30.0;
const COVERAGE_GAP_CAP: f64 = 20.0;
const UNKNOWN_POPULATION_COVERAGE_GAP: f64 = 10.0;
const COOLDOWN_PENALTY: f64 = 0.1;

/// One region in the discovery queue. Owned by the scheduling side and passed
/// into the scorer by value; the score itself is always recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionQueueEntry {
    pub region_id: String,
    pub name: String,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(default)]
    pub postal_code_prefix: Option<String>,
    #[serde(default)]
    pub priority_score: f64,
    #[serde(default)]
    pub last_scanned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cooldown_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_contacts: u64,
    #[serde(default)]
    pub approved_contacts: u64,
    /// Position in the scan category rotation
    #[serde(default)]
    pub last_category_index: usize,
}

/// Counts reported back by one discovery batch for a region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub raw_found: u64,
    pub duplicates: u64,
    pub approved: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionPriority {
    pub score: f64,
    pub pop_factor: f64,
    pub freshness: f64,
    pub coverage_gap: f64,
    pub cooldown_applied: bool,
    pub reasoning: String,
}

impl RegionQueueEntry {
    pub fn new(region_id: impl Into<String>, name: impl Into<String>, population: Option<u64>) -> Self {
        Self {
            region_id: region_id.into(),
            name: name.into(),
            population,
            postal_code_prefix: None,
            priority_score: 0.0,
            last_scanned_at: None,
            cooldown_until: None,
            total_contacts: 0,
            approved_contacts: 0,
            last_category_index: 0,
        }
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.map(|until| until > now).unwrap_or(false)
    }

    /// Index of the category to scan next, wrapped into the rotation length.
    pub fn next_category_index(&self, category_count: usize) -> usize {
        if category_count == 0 {
            0
        } else {
            self.last_category_index % category_count
        }
    }

    /// Bookkeeping after a scan: stamps the scan time, starts the cooldown,
    /// adds the non-duplicate contacts and advances the category rotation.
    pub fn record_scan(&mut self, outcome: ScanOutcome, now: DateTime<Utc>, cooldown_days: i64, category_count: usize) {
        self.last_scanned_at = Some(now);
        self.cooldown_until = Some(now + Duration::days(cooldown_days));
        self.total_contacts += outcome.raw_found.saturating_sub(outcome.duplicates);
        self.approved_contacts += outcome.approved;
        if category_count > 0 {
            self.last_category_index = (self.next_category_index(category_count) + 1) % category_count;
        }
    }
}

/// Priority = population factor + freshness + coverage gap, crushed to a tenth
/// while the region is cooling down.
pub fn calc_region_priority(entry: &RegionQueueEntry, now: DateTime<Utc>) -> RegionPriority {
    let population = entry.population.unwrap_or(DEFAULT_REGION_POPULATION) as f64;
    let pop_factor = (population / 100_000.0 * 10.0).min(POPULATION_FACTOR_CAP);

    let days_since_scan = match entry.last_scanned_at {
        Some(scanned) => ((now - scanned).num_seconds() as f64 / 86_400.0).max(0.0),
        None => NEVER_SCANNED_DAYS as f64,
    };
    let freshness = (days_since_scan * 2.0).min(FRESHNESS_CAP);

    // a zero population is as good as unknown for the coverage ratio
    let coverage_gap = match entry.population {
        Some(pop) if pop > 0 => {
            let per_10k = entry.approved_contacts as f64 / pop as f64 * 10_000.0;
            (COVERAGE_GAP_CAP - per_10k).max(0.0).min(COVERAGE_GAP_CAP)
        }
        _ => UNKNOWN_POPULATION_COVERAGE_GAP,
    };

    let cooldown_applied = entry.in_cooldown(now);
    let mut score = pop_factor + freshness + coverage_gap;
    if cooldown_applied {
        score *= COOLDOWN_PENALTY;
    }

    let mut reasoning = format!(
        "population {:.1} + freshness {:.1} + coverage gap {:.1}",
        pop_factor, freshness, coverage_gap
    );
    if cooldown_applied {
        reasoning.push_str(" x0.1 (cooldown)");
    }

    debug!(region = %entry.name, score, cooldown_applied, "Region priority computed");

    RegionPriority {
        score,
        pop_factor,
        freshness,
        coverage_gap,
        cooldown_applied,
        reasoning,
    }
}

/// Recompute `priority_score` for every region.
pub fn score_regions(mut regions: Vec<RegionQueueEntry>, now: DateTime<Utc>) -> Vec<RegionQueueEntry> {
    for region in regions.iter_mut() {
        region.priority_score = calc_region_priority(region, now).score;
    }
    regions
}

// (name, population, postal prefix)
const GERMAN_TOP_REGIONS: [(&str, u64, &str); 25] = [
    ("Berlin", 3_645_000, "1"),
    ("Hamburg", 1_841_000, "2"),
    ("München", 1_472_000, "8"),
    ("Köln", 1_084_000, "5"),
    ("Frankfurt am Main", 753_000, "6"),
    ("Stuttgart", 635_000, "70"),
    ("Düsseldorf", 619_000, "4"),
    ("Leipzig", 587_000, "04"),
    ("Dortmund", 588_000, "44"),
    ("Essen", 583_000, "45"),
    ("Bremen", 563_000, "28"),
    ("Dresden", 556_000, "01"),
    ("Hannover", 536_000, "30"),
    ("Nürnberg", 510_000, "90"),
    ("Duisburg", 498_000, "47"),
    ("Bochum", 365_000, "44"),
    ("Bielefeld", 334_000, "33"),
    ("Bonn", 330_000, "53"),
    ("Münster", 315_000, "48"),
    ("Mannheim", 310_000, "68"),
    ("Karlsruhe", 308_000, "76"),
    ("Augsburg", 296_000, "86"),
    ("Wiesbaden", 278_000, "65"),
    ("Freiburg", 231_000, "79"),
    ("Mainz", 218_000, "55"),
];

fn region_slug(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

/// Queue seed used when no regions exist yet: the largest German cities.
pub fn default_region_seed() -> Vec<RegionQueueEntry> {
    GERMAN_TOP_REGIONS
        .iter()
        .map(|(name, population, prefix)| {
            let mut entry = RegionQueueEntry::new(region_slug(name), *name, Some(*population));
            entry.postal_code_prefix = Some(prefix.to_string());
            entry
        })
        .collect()
}
