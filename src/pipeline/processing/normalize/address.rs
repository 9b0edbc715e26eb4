use once_cell::sync::Lazy;
use regex::Regex;

static POSTAL_CITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{5})\s+(.+)$").expect("valid postal code pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAddress {
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
}

/// Parse a single "street, [extra,] 12345 City" line.
///
/// The first comma segment is the street. When there are at least two segments the
/// last one is split into postal code and city; if it does not start with a
/// five-digit postal code the whole segment is taken as the city.
pub fn parse_address_line(line: &str) -> ParsedAddress {
    let segments: Vec<&str> = line.split(',').map(str::trim).collect();

    let street = segments
        .first()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    if segments.len() < 2 {
        return ParsedAddress { street, ..Default::default() };
    }

    let last = segments[segments.len() - 1];
    if let Some(caps) = POSTAL_CITY_RE.captures(last) {
        return ParsedAddress {
            street,
            postal_code: Some(caps[1].to_string()),
            city: Some(caps[2].trim().to_string()),
        };
    }

    ParsedAddress {
        street,
        postal_code: None,
        city: Some(last.to_string()).filter(|c| !c.is_empty()),
    }
}
