//! Triage categories the classifier may assign.
//!
//! A taxonomy is loaded from a TOML file of `[[category]]` tables, or falls
//! back to the built-in email triage set. Names are stored lowercased.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Top-level TOML wrapper.
#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    category: Vec<CategoryDef>,
}

/// One category and the description shown to the classifier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryDef {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: Vec<CategoryDef>,
}

const BUILTIN: &[(&str, &str)] = &[
    ("urgent", "Needs a response or decision today"),
    ("action", "Requires the user to do something, not time-critical"),
    ("fyi", "Informational; no action needed"),
    ("meeting", "Invitations, reschedules, and meeting logistics"),
    ("newsletter", "Subscriptions, digests, and marketing"),
    ("spam", "Unsolicited or junk mail"),
];

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            categories: BUILTIN
                .iter()
                .map(|(name, description)| CategoryDef {
                    name: (*name).to_string(),
                    description: (*description).to_string(),
                })
                .collect(),
        }
    }
}

impl Taxonomy {
    /// Build from explicit definitions. Rejects an empty set, blank names, and duplicates.
    pub fn new(defs: Vec<CategoryDef>) -> Result<Self> {
        if defs.is_empty() {
            return Err(Error::Config("taxonomy has no categories".to_string()));
        }

        let mut categories: Vec<CategoryDef> = Vec::with_capacity(defs.len());
        for def in defs {
            let name = def.name.trim().to_lowercase();
            if name.is_empty() {
                return Err(Error::Config("taxonomy category with blank name".to_string()));
            }
            if categories.iter().any(|c| c.name == name) {
                return Err(Error::Config(format!("duplicate taxonomy category {name:?}")));
            }
            categories.push(CategoryDef {
                name,
                description: def.description,
            });
        }
        Ok(Self { categories })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TaxonomyFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("bad taxonomy: {e}")))?;
        Self::new(file.category)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read taxonomy {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` when given, else the built-in set.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Case-insensitive lookup returning the canonical name.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let wanted = name.trim().to_lowercase();
        self.categories
            .iter()
            .find(|c| c.name == wanted)
            .map(|c| c.name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    /// `- name: description` lines for prompts.
    pub fn prompt_lines(&self) -> String {
        self.categories
            .iter()
            .map(|c| format!("- {}: {}", c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml_and_lowercases() {
        let taxonomy = Taxonomy::from_toml_str(
            r#"
            [[category]]
            name = "Receipts"
            description = "Purchase confirmations"

            [[category]]
            name = "todo"
            description = "Things to do"
            "#,
        )
        .unwrap();
        assert_eq!(taxonomy.names().collect::<Vec<_>>(), vec!["receipts", "todo"]);
        assert_eq!(taxonomy.resolve(" RECEIPTS "), Some("receipts"));
        assert_eq!(taxonomy.resolve("spam"), None);
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = Taxonomy::from_toml_str(
            r#"
            [[category]]
            name = "fyi"
            description = "a"
            [[category]]
            name = "FYI"
            description = "b"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn builtin_has_fyi_and_spam() {
        let taxonomy = Taxonomy::default();
        assert_eq!(taxonomy.resolve("fyi"), Some("fyi"));
        assert_eq!(taxonomy.resolve("Spam"), Some("spam"));
        assert!(taxonomy.prompt_lines().contains("- urgent: "));
    }
}
