//! TTL-based eviction for idle Session State.
//!
//! A background sweeper evicts states whose `last_access` exceeds the
//! configured TTL and are not `running` — `stopped`/`complete` states are
//! eligible, `created`/`running` states are never evicted out from under an
//! in-flight turn.

use chrono::{DateTime, Utc};
use lumen_domain::config::SessionsConfig;
use lumen_domain::model::EvaluationStatus;

pub struct LifecycleManager {
    ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl LifecycleManager {
    pub fn new(config: &SessionsConfig) -> Self {
        Self {
            ttl_seconds: config.ttl_seconds,
            sweep_interval_seconds: config.sweep_interval_seconds,
        }
    }

    /// Whether a state with the given status and last-access time is
    /// eligible for eviction at `now`.
    pub fn should_evict(&self, status: EvaluationStatus, last_access: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if matches!(status, EvaluationStatus::Created | EvaluationStatus::Running) {
            return false;
        }
        let idle_seconds = (now - last_access).num_seconds().max(0) as u64;
        idle_seconds >= self.ttl_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn config(ttl_seconds: u64) -> SessionsConfig {
        SessionsConfig {
            ttl_seconds,
            ..SessionsConfig::default()
        }
    }

    #[test]
    fn running_state_is_never_evicted() {
        let manager = LifecycleManager::new(&config(0));
        let now = Utc::now();
        assert!(!manager.should_evict(EvaluationStatus::Running, now - Duration::days(2), now));
    }

    #[test]
    fn stopped_state_past_ttl_is_evicted() {
        let manager = LifecycleManager::new(&config(60));
        let now = Utc::now();
        let last_access = now - Duration::seconds(61);
        assert!(manager.should_evict(EvaluationStatus::Stopped, last_access, now));
    }

    #[test]
    fn stopped_state_within_ttl_is_kept() {
        let manager = LifecycleManager::new(&config(3600));
        let now = Utc::now();
        let last_access = now - Duration::seconds(10);
        assert!(!manager.should_evict(EvaluationStatus::Stopped, last_access, now));
    }
}
