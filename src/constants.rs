/// Shared constants for the directory engine.
/// Defaults for everything that is also configurable live in `config.rs`.

// Provider names (keys of the per-provider keyword mappings and rate limits)
pub const GOOGLE_PLACES_PROVIDER: &str = "google_places";
pub const APIFY_PROVIDER: &str = "apify";
pub const FIRECRAWL_PROVIDER: &str = "firecrawl";

/// Country calling code used when a national trunk prefix is rewritten.
pub const DEFAULT_COUNTRY_CODE: &str = "49";

/// ISO country stamped on assembled addresses.
pub const DEFAULT_COUNTRY: &str = "DE";

/// National trunk prefix that gets replaced by the country code.
pub const NATIONAL_TRUNK_PREFIX: char = '0';

/// Fallback category when the classifier finds nothing.
pub const FALLBACK_CATEGORY: &str = "Sonstige";

/// Population assumed for regions without census data.
pub const DEFAULT_REGION_POPULATION: u64 = 100_000;

/// Days-since-scan assumed for regions that were never scanned.
pub const NEVER_SCANNED_DAYS: i64 = 999;

/// Approximate number of contacts a single discovery batch yields.
pub const CONTACTS_PER_BATCH: u32 = 25;

/// Source label stamped on provenance entries written by the discovery scheduler.
pub const DISCOVERY_SOURCE: &str = "discovery-scheduler";

/// Get all providers the engine ships rate-limit defaults for
pub fn get_supported_providers() -> Vec<&'static str> {
    vec![GOOGLE_PLACES_PROVIDER, APIFY_PROVIDER, FIRECRAWL_PROVIDER]
}
