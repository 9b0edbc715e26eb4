/// Result of splitting a combined person name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitName {
    pub salutation: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Canonical salutation for a leading name token, if it is one.
/// Matching ignores case and a trailing period ("Hr." and "hr" both resolve to "Herr").
pub fn canonical_salutation(token: &str) -> Option<&'static str> {
    let key = token.trim().trim_end_matches('.').to_lowercase();
    match key.as_str() {
        "herr" | "hr" => Some("Herr"),
        "frau" | "fr" => Some("Frau"),
        "dr" => Some("Dr."),
        "prof" => Some("Prof."),
        _ => None,
    }
}

/// Split "Herr Max von Mustermann" into salutation, first name and the remaining last name.
///
/// A single remaining token is treated as the last name; a bare salutation yields
/// only the salutation.
pub fn split_name(full_name: &str) -> SplitName {
    let mut tokens = full_name.split_whitespace().peekable();

    let salutation = match tokens.peek().and_then(|t| canonical_salutation(t)) {
        Some(s) => {
            tokens.next();
            Some(s.to_string())
        }
        None => None,
    };

    let remaining: Vec<&str> = tokens.collect();
    match remaining.as_slice() {
        [] => SplitName { salutation, ..Default::default() },
        [only] => SplitName {
            salutation,
            first_name: None,
            last_name: Some((*only).to_string()),
        },
        [first, rest @ ..] => SplitName {
            salutation,
            first_name: Some((*first).to_string()),
            last_name: Some(rest.join(" ")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_with_salutation() {
        let split = split_name("Hr. Max Mustermann");
        assert_eq!(split.salutation.as_deref(), Some("Herr"));
        assert_eq!(split.first_name.as_deref(), Some("Max"));
        assert_eq!(split.last_name.as_deref(), Some("Mustermann"));
    }

    #[test]
    fn test_multi_token_last_name() {
        let split = split_name("  Frau   Anna  von der   Heide ");
        assert_eq!(split.salutation.as_deref(), Some("Frau"));
        assert_eq!(split.first_name.as_deref(), Some("Anna"));
        assert_eq!(split.last_name.as_deref(), Some("von der Heide"));
    }

    #[test]
    fn test_single_token_is_last_name() {
        let split = split_name("DR Schmidt");
        assert_eq!(split.salutation.as_deref(), Some("Dr."));
        assert_eq!(split.first_name, None);
        assert_eq!(split.last_name.as_deref(), Some("Schmidt"));
    }

    #[test]
    fn test_salutation_only_and_empty() {
        let split = split_name("Frau");
        assert_eq!(split.salutation.as_deref(), Some("Frau"));
        assert_eq!(split.last_name, None);

        assert_eq!(split_name("   "), SplitName::default());
    }

    #[test]
    fn test_no_salutation() {
        let split = split_name("Erika Musterfrau");
        assert_eq!(split.salutation, None);
        assert_eq!(split.first_name.as_deref(), Some("Erika"));
    }
}
