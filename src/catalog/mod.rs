//! Static catalog of known features.
//!
//! The catalog is a JSON object mapping category names (for example
//! `commands`, `intervals`, `events`) to arrays of feature names. Category and
//! feature order are preserved exactly as written, since listings must follow
//! the declared order.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("feature '{0}' is listed more than once")]
    DuplicateFeature(String),
}

/// A named group of features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub features: Vec<String>,
}

/// Ordered, immutable feature catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureCatalog {
    categories: Vec<Category>,
}

impl FeatureCatalog {
    /// Build a catalog, rejecting feature names that appear twice.
    pub fn new(categories: Vec<Category>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for feature in categories.iter().flat_map(|c| c.features.iter()) {
            if !seen.insert(feature.as_str()) {
                return Err(CatalogError::DuplicateFeature(feature.clone()));
            }
        }
        Ok(Self { categories })
    }

    /// Parse a catalog from its JSON representation.
    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(content)?;
        Self::new(raw.0)
    }

    /// Load the catalog file once at startup.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&content)?;
        tracing::info!(
            path = ?path,
            categories = catalog.categories.len(),
            features = catalog.feature_count(),
            "Feature catalog loaded"
        );
        Ok(catalog)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// All feature names, in category then declaration order.
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .flat_map(|c| c.features.iter().map(String::as_str))
    }

    pub fn feature_count(&self) -> usize {
        self.features().count()
    }
}

/// Deserialization helper that keeps object keys in document order.
struct RawCatalog(Vec<Category>);

impl<'de> Deserialize<'de> for RawCatalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = RawCatalog;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping category names to arrays of feature names")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut categories = Vec::new();
                while let Some((name, features)) = map.next_entry::<String, Vec<String>>()? {
                    categories.push(Category { name, features });
                }
                Ok(RawCatalog(categories))
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}
