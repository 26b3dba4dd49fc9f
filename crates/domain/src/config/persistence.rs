use serde::{Deserialize, Serialize};

/// Bounded worker-pool sizing for non-blocking persistence writes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "d_pool_size")]
    pub persist_pool_size: usize,
    /// Gradual-rollout flag for the batched pipeline path.
    #[serde(default = "d_use_batch_processing")]
    pub use_batch_processing: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            persist_pool_size: d_pool_size(),
            use_batch_processing: d_use_batch_processing(),
        }
    }
}

fn d_pool_size() -> usize {
    4
}
fn d_use_batch_processing() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = PersistenceConfig::default();
        assert!(cfg.persist_pool_size >= 1);
        assert!(cfg.use_batch_processing);
    }
}
