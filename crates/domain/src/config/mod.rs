mod classifier;
mod llm;
mod persistence;
mod sessions;

pub use classifier::*;
pub use llm::*;
pub use persistence::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. An empty
    /// vec means everything looks good; callers should treat any `Error`
    /// severity issue as fatal at startup.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.llm.model_name.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.model_name".into(),
                message: "LLM_MODEL_NAME must not be empty".into(),
            });
        }

        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://")
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.base_url".into(),
                message: format!(
                    "base_url must start with http:// or https:// (got \"{}\")",
                    self.llm.base_url
                ),
            });
        }

        if self.llm.pricing.input_per_1m < 0.0 || self.llm.pricing.output_per_1m < 0.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.pricing".into(),
                message: "pricing per-million-token rates must be non-negative".into(),
            });
        }

        if self.llm.call_timeout_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.call_timeout_secs".into(),
                message: "LLM_CALL_TIMEOUT_SECONDS must be greater than 0".into(),
            });
        }

        if !(1..=50).contains(&self.sessions.cleaner_window_default) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.cleaner_window_default".into(),
                message: "CLEANER_WINDOW_DEFAULT must be in 1..=50".into(),
            });
        }

        if !(1..=100).contains(&self.sessions.function_window_default) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.function_window_default".into(),
                message: "FUNCTION_WINDOW_DEFAULT must be in 1..=100".into(),
            });
        }

        if self.sessions.function_window_default < self.sessions.cleaner_window_default {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.function_window_default".into(),
                message: "function_window_default must be >= cleaner_window_default".into(),
            });
        }

        if self.sessions.max_history_entries == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.max_history_entries".into(),
                message: "MAX_HISTORY_ENTRIES must be greater than 0".into(),
            });
        }

        if self.sessions.sweep_interval_seconds == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "sessions.sweep_interval_seconds".into(),
                message: "a zero sweep interval effectively disables TTL eviction".into(),
            });
        }

        if self.sessions.sweep_interval_seconds > self.sessions.ttl_seconds {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "sessions.sweep_interval_seconds".into(),
                message: "sweep interval longer than the TTL delays eviction past the TTL"
                    .into(),
            });
        }

        if self.persistence.persist_pool_size == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "persistence.persist_pool_size".into(),
                message: "PERSIST_POOL_SIZE must be greater than 0".into(),
            });
        }

        for (i, phrase) in self.classifier.acknowledgements.iter().enumerate() {
            if phrase.trim().is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("classifier.acknowledgements[{i}]"),
                    message: "acknowledgement phrases must not be blank".into(),
                });
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config::default()
    }

    fn find_issue<'a>(issues: &'a [ConfigError], field_prefix: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field.starts_with(field_prefix))
    }

    #[test]
    fn default_config_has_no_errors() {
        let issues = valid_config().validate();
        let errors: Vec<_> = issues
            .iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn empty_model_name_is_error() {
        let mut cfg = valid_config();
        cfg.llm.model_name = String::new();
        let issues = cfg.validate();
        let issue = find_issue(&issues, "llm.model_name").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn invalid_base_url_scheme_is_error() {
        let mut cfg = valid_config();
        cfg.llm.base_url = "ftp://example.com".into();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "llm.base_url").is_some());
    }

    #[test]
    fn negative_pricing_is_error() {
        let mut cfg = valid_config();
        cfg.llm.pricing.input_per_1m = -1.0;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "llm.pricing").is_some());
    }

    #[test]
    fn function_window_smaller_than_cleaner_window_is_error() {
        let mut cfg = valid_config();
        cfg.sessions.cleaner_window_default = 20;
        cfg.sessions.function_window_default = 10;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "sessions.function_window_default").is_some());
    }

    #[test]
    fn zero_persist_pool_size_is_error() {
        let mut cfg = valid_config();
        cfg.persistence.persist_pool_size = 0;
        let issues = cfg.validate();
        let issue = find_issue(&issues, "persistence.persist_pool_size").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn sweep_interval_longer_than_ttl_is_warning() {
        let mut cfg = valid_config();
        cfg.sessions.ttl_seconds = 60;
        cfg.sessions.sweep_interval_seconds = 300;
        let issues = cfg.validate();
        let issue =
            find_issue(&issues, "sessions.sweep_interval_seconds").expect("expected warning");
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn config_error_display_format() {
        let err = ConfigError {
            severity: ConfigSeverity::Error,
            field: "llm.model_name".into(),
            message: "must not be empty".into(),
        };
        assert_eq!(format!("{err}"), "[ERROR] llm.model_name: must not be empty");
    }
}
