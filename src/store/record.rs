//! Feature configuration record and its type rules.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of feature a record configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Command,
    Interval,
    Event,
}

/// Name prefix rules, evaluated in order. First match wins.
pub const TYPE_PREFIXES: &[(&str, FeatureType)] = &[
    ("command", FeatureType::Command),
    ("do", FeatureType::Interval),
    ("get", FeatureType::Event),
];

impl FeatureType {
    /// Infer the type of a new feature from its name prefix.
    pub fn from_name(name: &str) -> Option<Self> {
        TYPE_PREFIXES
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix))
            .map(|(_, kind)| *kind)
    }
}

/// A persisted feature configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfigRecord {
    /// Unique feature name.
    pub name: String,

    /// Fixed at creation time.
    #[serde(rename = "type")]
    pub kind: FeatureType,

    pub enabled: bool,

    /// Feature-specific payload, passed through untouched.
    #[serde(default)]
    pub config: Value,
}

impl FeatureConfigRecord {
    /// A freshly configured feature starts disabled.
    pub fn new(name: impl Into<String>, kind: FeatureType, config: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            enabled: false,
            config,
        }
    }
}

/// Partial update applied by `ConfigStore::update_by_name`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordPatch {
    Enabled(bool),
    /// Full replacement of the config payload.
    Config(Value),
}

impl RecordPatch {
    pub fn apply(self, record: &mut FeatureConfigRecord) {
        match self {
            RecordPatch::Enabled(enabled) => record.enabled = enabled,
            RecordPatch::Config(config) => record.config = config,
        }
    }
}
