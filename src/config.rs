use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::constants::{APIFY_PROVIDER, CONTACTS_PER_BATCH, FIRECRAWL_PROVIDER, GOOGLE_PLACES_PROVIDER};
use crate::discovery::budget::DiscoveryBudget;
use crate::error::{DirectoryError, Result};
use crate::pipeline::ingestion::rate_limiter::ProviderLimits;
use crate::outreach::scheduler::QuietHours;
use crate::pipeline::processing::conflation::DedupePolicy;
use crate::pipeline::processing::quality_gate::QualityThresholds;

pub const DEFAULT_CONFIG_PATH: &str = "market_directory.toml";
pub const CONFIG_PATH_ENV: &str = "MARKET_DIRECTORY_CONFIG";

/// Engine configuration. Every section falls back to the built-in defaults,
/// so an empty file is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub quality: QualityThresholds,
    pub dedupe: DedupePolicy,
    pub discovery: DiscoveryConfig,
    pub outreach: OutreachConfig,
    pub providers: BTreeMap<String, ProviderLimits>,
    pub jobs: JobConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub budget: DiscoveryBudget,
    /// Days a region stays in cooldown after a scan
    pub cooldown_days: i64,
    pub batch_size: u32,
    pub max_credits_per_day: u32,
    pub cost_per_batch: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            budget: DiscoveryBudget::default(),
            cooldown_days: 3,
            batch_size: CONTACTS_PER_BATCH,
            max_credits_per_day: 200,
            cost_per_batch: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachConfig {
    pub quiet_hours: QuietHours,
    /// Minimum pause between two sends on the same thread
    pub min_send_interval_secs: u64,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            quiet_hours: QuietHours::default(),
            min_send_interval_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub max_retries: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(
            GOOGLE_PLACES_PROVIDER.to_string(),
            ProviderLimits { requests_per_min: Some(60), requests_per_day: Some(5_000) },
        );
        providers.insert(
            APIFY_PROVIDER.to_string(),
            ProviderLimits { requests_per_min: Some(30), requests_per_day: Some(1_000) },
        );
        providers.insert(
            FIRECRAWL_PROVIDER.to_string(),
            ProviderLimits { requests_per_min: Some(20), requests_per_day: Some(500) },
        );

        Self {
            quality: QualityThresholds::default(),
            dedupe: DedupePolicy::default(),
            discovery: DiscoveryConfig::default(),
            outreach: OutreachConfig::default(),
            providers,
            jobs: JobConfig::default(),
        }
    }
}

impl Config {
    /// Load from `$MARKET_DIRECTORY_CONFIG`, or from `market_directory.toml` when present.
    /// A missing default file yields the built-in defaults; a missing explicit path is an error.
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_path(&path),
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_path(DEFAULT_CONFIG_PATH),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DirectoryError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.quality.needs_review > self.quality.auto_approve {
            return Err(DirectoryError::Config(format!(
                "quality.needs_review ({}) must not exceed quality.auto_approve ({})",
                self.quality.needs_review, self.quality.auto_approve
            )));
        }
        let pct = self.discovery.budget.top_regions_pct;
        if !(0.0..=1.0).contains(&pct) {
            return Err(DirectoryError::Config(format!(
                "discovery.budget.top_regions_pct must be within [0, 1], got {}",
                pct
            )));
        }
        if self.outreach.quiet_hours.start_hour > 23 || self.outreach.quiet_hours.end_hour > 23 {
            return Err(DirectoryError::Config("quiet hours must be within 0..=23".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.quality.auto_approve, 0.85);
        assert_eq!(config.quality.needs_review, 0.60);
        assert_eq!(config.discovery.cooldown_days, 3);
        assert_eq!(config.outreach.quiet_hours.start_hour, 20);
        assert_eq!(config.outreach.quiet_hours.end_hour, 8);
        assert_eq!(config.jobs.max_retries, 3);
    }

    #[test]
    fn test_partial_override_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[discovery]\ncooldown_days = 7\n\n[discovery.budget]\ntop_regions_pct = 0.5\n\n[outreach.quiet_hours]\nstart_hour = 22\nend_hour = 6\n"
        )
        .unwrap();

        let config = Config::from_path(file.path()).unwrap();
        assert_eq!(config.discovery.cooldown_days, 7);
        assert_eq!(config.discovery.budget.top_regions_pct, 0.5);
        assert_eq!(config.discovery.max_credits_per_day, 200);
        assert_eq!(config.outreach.quiet_hours.start_hour, 22);
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let result = Config::from_toml_str("[quality]\nauto_approve = 0.5\nneeds_review = 0.7\n");
        assert!(matches!(result, Err(DirectoryError::Config(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::from_path("/definitely/not/here.toml");
        assert!(matches!(result, Err(DirectoryError::Config(_))));
    }
}
