use serde::{Deserialize, Serialize};

/// Tunables for the turn classifier's skip/fast-clean heuristics. These are
/// deliberately configuration, not contractual constants — the precise
/// thresholds for "this looks like STT noise" are a tuning knob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Below this length (after trimming), a user turn is a skip candidate.
    #[serde(default = "d_min_noise_len")]
    pub min_noise_length: usize,
    /// Fraction of non-alphanumeric characters above which a turn is
    /// considered punctuation-heavy noise.
    #[serde(default = "d_punct_density")]
    pub noise_punct_density: f64,
    /// Closed set of simple acknowledgements that fast-clean without an
    /// LLM call.
    #[serde(default = "d_acknowledgements")]
    pub acknowledgements: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_noise_length: d_min_noise_len(),
            noise_punct_density: d_punct_density(),
            acknowledgements: d_acknowledgements(),
        }
    }
}

fn d_min_noise_len() -> usize {
    3
}
fn d_punct_density() -> f64 {
    0.5
}
fn d_acknowledgements() -> Vec<String> {
    [
        "yes", "yeah", "yep", "ok", "okay", "sure", "sounds good", "that's correct",
        "correct", "right", "got it", "no", "nope",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_acknowledgements_contains_yes() {
        let cfg = ClassifierConfig::default();
        assert!(cfg.acknowledgements.iter().any(|s| s == "yes"));
    }
}
