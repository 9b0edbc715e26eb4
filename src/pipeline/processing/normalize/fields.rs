use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{DEFAULT_COUNTRY_CODE, NATIONAL_TRUNK_PREFIX};

static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9+.\-]*://").expect("valid scheme pattern"));

/// Normalize a phone number towards E.164 using the default country code.
pub fn normalize_phone(raw: Option<&str>) -> String {
    normalize_phone_with_country(raw, DEFAULT_COUNTRY_CODE)
}

/// Normalize a phone number towards E.164.
///
/// - a leading `+` is kept and everything else but digits is dropped
/// - a national trunk `0` (6+ digits) is replaced by `+<country_code>`
/// - digits already starting with the country code (10+ digits) get a `+`
/// - anything else is returned as bare digits, without guessing a prefix
pub fn normalize_phone_with_country(raw: Option<&str>, country_code: &str) -> String {
    let trimmed = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return String::new(),
    };

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if trimmed.starts_with('+') {
        return format!("+{}", digits);
    }

    if digits.starts_with(NATIONAL_TRUNK_PREFIX) && digits.len() >= 6 {
        return format!("+{}{}", country_code, &digits[1..]);
    }

    if !country_code.is_empty() && digits.starts_with(country_code) && digits.len() >= 10 {
        return format!("+{}", digits);
    }

    digits
}

/// Count of digits in an already normalized phone.
pub fn phone_digit_count(phone: &str) -> usize {
    phone.chars().filter(|c| c.is_ascii_digit()).count()
}

/// Canonical host for a website URL: lowercase, no scheme, no `www.`,
/// authority only, no trailing dot.
pub fn normalize_domain(url: Option<&str>) -> String {
    let lowered = match url.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_lowercase(),
        _ => return String::new(),
    };

    let without_scheme = SCHEME_RE.replace(&lowered, "");
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(&without_scheme);

    let authority = without_www
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    authority.strip_suffix('.').unwrap_or(authority).to_string()
}

/// Trimmed, lowercased email; empty input yields an empty string.
pub fn normalize_email(raw: Option<&str>) -> String {
    raw.map(|s| s.trim().to_lowercase()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_national_prefix_is_rewritten() {
        assert_eq!(normalize_phone(Some("030 1234567")), "+49301234567");
        assert_eq!(normalize_phone(Some("(0171) 555-12-34")), "+491715551234");
    }

    #[test]
    fn test_plus_prefix_is_kept() {
        for raw in ["+49 30 1234567", "+1 (555) 010-9999", "+ 44-20-7946-0958", "+"] {
            let out = normalize_phone(Some(raw));
            assert!(out.starts_with('+'), "{} -> {}", raw, out);
            assert!(out[1..].chars().all(|c| c.is_ascii_digit()), "{} -> {}", raw, out);
        }
    }

    #[test]
    fn test_bare_country_code() {
        assert_eq!(normalize_phone(Some("49301234567")), "+49301234567");
        // too short to assume a country code
        assert_eq!(normalize_phone(Some("4930123")), "4930123");
    }

    #[test]
    fn test_short_or_unknown_numbers_stay_digits() {
        assert_eq!(normalize_phone(Some("0123")), "0123");
        assert_eq!(normalize_phone(Some("112")), "112");
        assert_eq!(normalize_phone(Some("abc")), "");
    }

    #[test]
    fn test_empty_phone() {
        assert_eq!(normalize_phone(Some("")), "");
        assert_eq!(normalize_phone(Some("   ")), "");
        assert_eq!(normalize_phone(None), "");
    }

    #[test]
    fn test_other_country_code() {
        assert_eq!(normalize_phone_with_country(Some("01 234 5678"), "43"), "+4312345678");
    }

    #[test]
    fn test_domain_normalization() {
        assert_eq!(normalize_domain(Some("https://www.Example.com/path?x=1")), "example.com");
        assert_eq!(normalize_domain(Some("http://shop.example.de.")), "shop.example.de");
        assert_eq!(normalize_domain(Some("WWW.example.org#top")), "example.org");
        assert_eq!(normalize_domain(Some("example.com?q=2")), "example.com");
        assert_eq!(normalize_domain(Some("ftp://files.example.net/x")), "files.example.net");
        assert_eq!(normalize_domain(None), "");
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email(Some("  Info@Example.DE ")), "info@example.de");
        assert_eq!(normalize_email(None), "");
    }
}
