use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Key of a discovery job. A retried job hashes to the same key, so its raw
/// records are not inserted twice.
pub fn compute_job_key(tenant_id: &str, region_id: &str, category_code: &str, run_date: NaiveDate) -> String {
    let mut s = String::new();
    s.push_str(tenant_id);
    s.push('|');
    s.push_str(region_id);
    s.push('|');
    s.push_str(category_code);
    s.push('|');
    s.push_str(&run_date.format("%Y-%m-%d").to_string());

    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

/// In-memory set of job keys already started
#[derive(Debug, Default, Clone)]
pub struct IdempotencyLedger {
    seen: HashSet<String>,
}

impl IdempotencyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// Returns true when the key is new
    pub fn record(&mut self, key: &str) -> bool {
        self.seen.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_job_key_is_stable_hex() {
        let a = compute_job_key("tenant", "berlin", "veterinary", day(1));
        let b = compute_job_key("tenant", "berlin", "veterinary", day(1));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_job_key_varies_by_input() {
        let base = compute_job_key("tenant", "berlin", "veterinary", day(1));
        assert_ne!(base, compute_job_key("tenant", "berlin", "veterinary", day(2)));
        assert_ne!(base, compute_job_key("tenant", "hamburg", "veterinary", day(1)));
        assert_ne!(base, compute_job_key("other", "berlin", "veterinary", day(1)));
    }

    #[test]
    fn test_ledger_records_once() {
        let mut ledger = IdempotencyLedger::new();
        assert!(ledger.record("abc"));
        assert!(!ledger.record("abc"));
        assert!(ledger.contains("abc"));
        assert_eq!(ledger.len(), 1);
    }
}
