//! Catalog listing with enablement state.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// One cataloged feature. `enabled` is `None` until a record exists.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FeatureState {
    pub name: String,
    pub enabled: Option<bool>,
}

/// Features grouped by category, in catalog order.
///
/// Serializes as a JSON object whose keys keep the catalog's category order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureOverview {
    categories: Vec<(String, Vec<FeatureState>)>,
}

impl FeatureOverview {
    pub fn new(categories: Vec<(String, Vec<FeatureState>)>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[(String, Vec<FeatureState>)] {
        &self.categories
    }

    pub fn feature_count(&self) -> usize {
        self.categories.iter().map(|(_, states)| states.len()).sum()
    }
}

impl Serialize for FeatureOverview {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (category, states) in &self.categories {
            map.serialize_entry(category, states)?;
        }
        map.end()
    }
}
