use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Tavily API key (lowest priority source, after flag, environment and `.env`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Optional custom API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// HTTP timeout in seconds, overriding the per-endpoint defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Output format used when `--format` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_format: Option<OutputFormat>,

    /// Write debug logs to a file
    #[serde(default)]
    pub debug: bool,

    /// Debug log file or directory (`~` is expanded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_rotation: Option<DebugLogRotation>,

    /// How many rotated log files to keep (0 keeps everything)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_keep: Option<usize>,
}

/// Written by `tvly config init`; the key stays commented out until the user sets it.
pub const TEMPLATE: &str = r#"# tvly configuration
#
# API key lookup order: --api-key, TAVILY_API_KEY, .env, then this file.
# api_key = "tvly-YOUR_API_KEY_HERE"

api_base = "https://api.tavily.com"
default_format = "text"

# HTTP timeout in seconds (default depends on the endpoint)
# timeout_secs = 30

# Debug log file
# debug = false
# debug_log_path = "~/.config/tvly/tvly-debug.log"
# debug_log_rotation = "daily"
# debug_log_keep = 7
"#;

/// How results are printed to stdout
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    #[default]
    Text,
}

/// Debug log file rotation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DebugLogRotation {
    /// Append to a single file
    None,
    /// One file per day
    Daily,
    /// One file per invocation
    Session,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_full_config() {
        let config: Config = toml::from_str(
            r#"
            api_key = "tvly-abc"
            api_base = "http://localhost:9000"
            timeout_secs = 12
            default_format = "json"
            debug = true
            debug_log_rotation = "daily"
            debug_log_keep = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("tvly-abc"));
        assert_eq!(config.timeout_secs, Some(12));
        assert_eq!(config.default_format, Some(OutputFormat::Json));
        assert_eq!(config.debug_log_rotation, Some(DebugLogRotation::Daily));
        assert!(config.debug);
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_template_parses_without_a_key() {
        let config: Config = toml::from_str(TEMPLATE).unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.api_base.as_deref(), Some(crate::api::DEFAULT_API_BASE));
        assert_eq!(config.default_format, Some(OutputFormat::Text));
        assert!(!config.debug);
    }
}
