use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registry::RegistrySettings;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub registry: RegistrySettings,
}

impl AppConfig {
    /// Loads configuration from a JSON file. Absent fields fall back to
    /// their defaults, so a partial file is valid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{LayoutPolicy, ThreadMode};

    #[test]
    fn defaults_round_trip_through_json() {
        let config = AppConfig::default();
        let raw = serde_json::to_string(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.registry, config.registry);
    }

    #[test]
    fn partial_files_keep_defaults_for_missing_fields() {
        let raw = r#"{"registry": {"threadMode": "dual", "layoutPolicy": "focusRotate"}}"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.registry.thread_mode, ThreadMode::Dual);
        assert_eq!(config.registry.layout_policy, LayoutPolicy::FocusRotate);
        // Untouched fields keep their documented defaults.
        assert!(config.registry.site_grouping);
    }
}
