use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::constants::FALLBACK_CATEGORY;
use crate::error::{DirectoryError, Result};

const BUILTIN_REGISTRY: &str = include_str!("categories.toml");

static DEFAULT_REGISTRY: Lazy<CategoryRegistry> = Lazy::new(|| {
    CategoryRegistry::from_toml_str(BUILTIN_REGISTRY).expect("built-in category registry is valid TOML")
});

/// Maximum number of secondary category codes reported
pub const MAX_SECONDARY: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryGroup {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryDefinition {
    pub code: String,
    pub label: String,
    pub group: String,
    /// Provider-agnostic keywords used for free-text matching
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Provider name -> provider-specific type tags
    #[serde(default)]
    pub provider_mappings: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryClassification {
    pub primary: String,
    pub secondary: Vec<String>,
}

impl CategoryClassification {
    fn fallback() -> Self {
        Self {
            primary: FALLBACK_CATEGORY.to_string(),
            secondary: Vec::new(),
        }
    }
}

/// Category taxonomy loaded from data. New categories or providers are added in
/// the TOML document, not in code.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CategoryRegistry {
    #[serde(default)]
    pub groups: Vec<CategoryGroup>,
    #[serde(default)]
    pub categories: Vec<CategoryDefinition>,
}

struct ScoredMatch<'a> {
    code: &'a str,
    score: usize,
}

impl CategoryRegistry {
    /// The registry shipped with the crate
    pub fn builtin() -> &'static CategoryRegistry {
        &DEFAULT_REGISTRY
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let registry: CategoryRegistry = toml::from_str(content)?;
        for category in &registry.categories {
            if !registry.groups.is_empty() && !registry.groups.iter().any(|g| g.code == category.group) {
                return Err(DirectoryError::Config(format!(
                    "category '{}' references unknown group '{}'",
                    category.code, category.group
                )));
            }
        }
        Ok(registry)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn get(&self, code: &str) -> Result<&CategoryDefinition> {
        self.categories
            .iter()
            .find(|c| c.code == code)
            .ok_or_else(|| DirectoryError::UnknownCategory(code.to_string()))
    }

    /// Categories of one group, or all categories when no group is given.
    pub fn by_group(&self, group: Option<&str>) -> Vec<&CategoryDefinition> {
        self.categories
            .iter()
            .filter(|c| group.map(|g| c.group == g).unwrap_or(true))
            .collect()
    }

    /// Classify from company name and description.
    ///
    /// Every category is tested with every keyword as a substring of the lowercased
    /// text; a category scores the length of its longest matching keyword, so more
    /// specific keywords win.
    pub fn classify_text(&self, company_name: Option<&str>, description: Option<&str>) -> CategoryClassification {
        let text = format!("{} {}", company_name.unwrap_or_default(), description.unwrap_or_default()).to_lowercase();
        if text.trim().is_empty() {
            return CategoryClassification::fallback();
        }

        let matches = self
            .categories
            .iter()
            .filter_map(|category| {
                category
                    .keywords
                    .iter()
                    .map(|kw| kw.to_lowercase())
                    .filter(|kw| !kw.is_empty() && text.contains(kw.as_str()))
                    .map(|kw| kw.chars().count())
                    .max()
                    .map(|score| ScoredMatch { code: &category.code, score })
            })
            .collect();

        rank(matches)
    }

    /// Classify from a provider-specific type tag, consulting only that provider's mappings.
    /// An exact (case-insensitive) tag match outranks a containment match.
    pub fn classify_provider_tag(&self, provider: &str, tag: &str) -> CategoryClassification {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            return CategoryClassification::fallback();
        }

        let matches = self
            .categories
            .iter()
            .filter_map(|category| {
                let keywords = category.provider_mappings.get(provider)?;
                keywords
                    .iter()
                    .map(|kw| kw.to_lowercase())
                    .filter_map(|kw| {
                        let len = kw.chars().count();
                        if kw.is_empty() {
                            None
                        } else if kw == tag {
                            Some(len + 1_000)
                        } else if tag.contains(kw.as_str()) {
                            Some(len)
                        } else {
                            None
                        }
                    })
                    .max()
                    .map(|score| ScoredMatch { code: &category.code, score })
            })
            .collect();

        rank(matches)
    }
}

fn rank(mut matches: Vec<ScoredMatch<'_>>) -> CategoryClassification {
    // stable sort keeps registry order among equal scores
    matches.sort_by(|a, b| b.score.cmp(&a.score));

    let mut codes: Vec<&str> = Vec::new();
    for m in &matches {
        if !codes.contains(&m.code) {
            codes.push(m.code);
        }
    }

    match codes.split_first() {
        None => CategoryClassification::fallback(),
        Some((primary, rest)) => CategoryClassification {
            primary: primary.to_string(),
            secondary: rest.iter().take(MAX_SECONDARY).map(|c| c.to_string()).collect(),
        },
    }
}

/// Classify free text against the built-in registry.
pub fn classify_category(company_name: Option<&str>, description: Option<&str>) -> CategoryClassification {
    CategoryRegistry::builtin().classify_text(company_name, description)
}
