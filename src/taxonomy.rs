//! Immutable label resources: the curated synonym dictionary and the closed
//! list of canonical categories.
//!
//! Both are injected into the pipeline at construction time. The compiled-in
//! copies under `resources/` are used unless file paths are configured.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::constants::OTHER_LABEL;
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::labels::clean_major;

const BUILTIN_DICTIONARY: &str = include_str!("../resources/major_mapping.toml");
const BUILTIN_CATEGORIES: &str = include_str!("../resources/categories.toml");

#[derive(Debug, Deserialize)]
struct DictionaryFile {
    mapping: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CategoryFile {
    categories: Vec<String>,
}

/// Curated dictionary plus ordered canonical categories
#[derive(Debug, Clone)]
pub struct Taxonomy {
    dictionary: HashMap<String, String>,
    categories: Vec<String>,
}

impl Taxonomy {
    /// Taxonomy compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_DICTIONARY, "major_mapping.toml", BUILTIN_CATEGORIES, "categories.toml")
    }

    /// Load both resources from disk; a missing file is fatal
    pub fn load(dictionary_path: &Path, categories_path: &Path) -> Result<Self> {
        let dictionary = read_resource(dictionary_path)?;
        let categories = read_resource(categories_path)?;
        Self::parse(
            &dictionary,
            &dictionary_path.display().to_string(),
            &categories,
            &categories_path.display().to_string(),
        )
    }

    fn parse(dictionary: &str, dictionary_name: &str, categories: &str, categories_name: &str) -> Result<Self> {
        let dictionary: DictionaryFile =
            toml::from_str(dictionary).map_err(|e| PipelineError::InvalidResource {
                name: dictionary_name.to_string(),
                reason: e.to_string(),
            })?;
        let categories: CategoryFile =
            toml::from_str(categories).map_err(|e| PipelineError::InvalidResource {
                name: categories_name.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_parts(dictionary.mapping, categories.categories)
    }

    /// Build and validate a taxonomy from in-memory parts
    pub fn from_parts<I, K, V>(dictionary: I, categories: Vec<String>) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        if categories.is_empty() {
            return Err(invalid("categories", "category list is empty"));
        }

        let mut seen = HashSet::new();
        for category in &categories {
            if category.trim().is_empty() {
                return Err(invalid("categories", "blank category name"));
            }
            if category == OTHER_LABEL {
                return Err(invalid(
                    "categories",
                    &format!("'{}' is reserved for unmatched majors", OTHER_LABEL),
                ));
            }
            if !seen.insert(category.as_str()) {
                return Err(invalid(
                    "categories",
                    &format!("duplicate category '{}'", category),
                ));
            }
        }

        let mut mapping = HashMap::new();
        for (raw, category) in dictionary {
            let category = category.into();
            if !seen.contains(category.as_str()) {
                return Err(invalid(
                    "dictionary",
                    &format!("'{}' maps to unknown category '{}'", raw.as_ref(), category),
                ));
            }

            let key = clean_major(raw.as_ref());
            if key.is_empty() {
                return Err(invalid(
                    "dictionary",
                    &format!("key '{}' is empty after cleaning", raw.as_ref()),
                ));
            }

            match mapping.get(&key) {
                Some(existing) if existing != &category => {
                    return Err(invalid(
                        "dictionary",
                        &format!(
                            "'{}' maps to both '{}' and '{}'",
                            key, existing, category
                        ),
                    ));
                }
                _ => {
                    mapping.insert(key, category);
                }
            }
        }

        debug!(
            "Loaded taxonomy with {} synonyms across {} categories",
            mapping.len(),
            categories.len()
        );

        Ok(Self {
            dictionary: mapping,
            categories,
        })
    }

    /// Exact dictionary lookup of an already cleaned major
    pub fn lookup(&self, cleaned: &str) -> Option<&str> {
        self.dictionary.get(cleaned).map(String::as_str)
    }

    /// Canonical categories in priority order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn dictionary_len(&self) -> usize {
        self.dictionary.len()
    }
}

fn read_resource(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(PipelineError::MissingResource(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

fn invalid(name: &str, reason: &str) -> PipelineError {
    PipelineError::InvalidResource {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
