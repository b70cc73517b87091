use serde::{Deserialize, Serialize};

/// Settings supplied by the config provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Version of the library catalog the analyzer runs against
    #[serde(alias = "latest_stackzy_lib_version")]
    pub analyzer_version: String,

    /// Whether the remote result cache is consulted and written
    #[serde(alias = "should_consider_result_cache", default = "default_true")]
    pub caching_enabled: bool,
}

const fn default_true() -> bool {
    true
}

impl AnalyzerConfig {
    #[must_use]
    pub fn new(analyzer_version: impl Into<String>, caching_enabled: bool) -> Self {
        Self {
            analyzer_version: analyzer_version.into(),
            caching_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_remote_field_names() {
        let config: AnalyzerConfig = serde_json::from_str(
            r#"{"latest_stackzy_lib_version": "2.3", "should_consider_result_cache": false}"#,
        )
        .unwrap();
        assert_eq!(config, AnalyzerConfig::new("2.3", false));
    }

    #[test]
    fn test_caching_defaults_on() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{"analyzer_version": "2.3"}"#).unwrap();
        assert!(config.caching_enabled);
    }
}
