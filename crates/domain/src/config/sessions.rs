use serde::{Deserialize, Serialize};

/// Session Manager tunables: default window sizes, TTL eviction, and the
/// in-memory history cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "d_cleaner_window")]
    pub cleaner_window_default: u32,
    #[serde(default = "d_function_window")]
    pub function_window_default: u32,
    #[serde(default = "d_ttl_secs")]
    pub ttl_seconds: u64,
    #[serde(default = "d_sweep_interval_secs")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "d_max_history")]
    pub max_history_entries: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            cleaner_window_default: d_cleaner_window(),
            function_window_default: d_function_window(),
            ttl_seconds: d_ttl_secs(),
            sweep_interval_seconds: d_sweep_interval_secs(),
            max_history_entries: d_max_history(),
        }
    }
}

fn d_cleaner_window() -> u32 {
    10
}
fn d_function_window() -> u32 {
    20
}
fn d_ttl_secs() -> u64 {
    24 * 60 * 60
}
fn d_sweep_interval_secs() -> u64 {
    5 * 60
}
fn d_max_history() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = SessionsConfig::default();
        assert_eq!(cfg.cleaner_window_default, 10);
        assert_eq!(cfg.function_window_default, 20);
        assert_eq!(cfg.ttl_seconds, 86_400);
        assert_eq!(cfg.sweep_interval_seconds, 300);
        assert_eq!(cfg.max_history_entries, 1000);
    }
}
