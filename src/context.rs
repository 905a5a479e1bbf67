use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;

/// Store-wide settings. Every field has a default so partial config files work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    /// Reported as the author of every mutation event.
    pub identity: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            project_id: "fake".into(),
            dataset: "fake".into(),
            api_version: "v1".into(),
            identity: "fake-user".into(),
        }
    }
}

impl StoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }
}

/// Id and timestamp shared by everything one mutation batch touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: String,
    pub timestamp: String,
}

impl Transaction {
    /// Uses `id` when given, a fresh uuid otherwise; timestamped now.
    pub fn new(id: Option<&str>) -> Self {
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            id,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn with_timestamp(id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: timestamp.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_config_uses_defaults() {
        let config = StoreConfig::from_json_str(r#"{"dataset": "production"}"#).unwrap();
        assert_eq!(config.dataset, "production");
        assert_eq!(config.project_id, "fake");
        assert_eq!(config.api_version, "v1");
    }

    #[test]
    fn transaction_generates_id() {
        let a = Transaction::new(None);
        let b = Transaction::new(None);
        assert_ne!(a.id, b.id);
        assert!(a.timestamp.ends_with('Z'));
        assert_eq!(Transaction::new(Some("tx1")).id, "tx1");
    }
}
