//! Turn Classifier (C5): a cheap, config-driven router that decides how
//! much of the cleaning pipeline a raw Turn actually needs.
//!
//! Every path here is a single pass over `raw_text` — no allocation beyond
//! the trimmed slice, no LLM call. The classifier only decides; constructing
//! the bypass/skip/fast-clean `CleanedTurn` envelopes is the pipeline's job,
//! since it alone knows the turn's id/evaluation_id/timing.

use lumen_domain::config::ClassifierConfig;
use lumen_domain::model::{ClassificationPath, Turn};

/// Route a raw Turn to its classification path. Checked in order:
/// bypass speaker, then noise (skip), then acknowledgement or short clean
/// utterance (fast-clean), else full processing.
pub fn classify(turn: &Turn, config: &ClassifierConfig) -> ClassificationPath {
    if turn.is_bypass_speaker() {
        return ClassificationPath::Bypass;
    }

    let trimmed = turn.raw_text.trim();
    if is_noise(trimmed, config) {
        return ClassificationPath::Skip;
    }
    if is_acknowledgement(trimmed, config) || is_short_and_clean(trimmed) {
        return ClassificationPath::FastClean;
    }
    ClassificationPath::Process
}

/// Collapse runs of whitespace and trim, for fast-clean's `normalized`
/// transform — no LLM involvement, so this is the only cleaning a fast-clean
/// turn receives.
pub fn normalize(raw_text: &str) -> String {
    raw_text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_noise(trimmed: &str, config: &ClassifierConfig) -> bool {
    if trimmed.is_empty() || trimmed.chars().count() < config.min_noise_length {
        return true;
    }
    punct_density(trimmed) > config.noise_punct_density
}

fn punct_density(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let noisy = text
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();
    noisy as f64 / total as f64
}

fn is_acknowledgement(trimmed: &str, config: &ClassifierConfig) -> bool {
    let lowered = trimmed.trim_end_matches(['.', '!']).to_ascii_lowercase();
    config.acknowledgements.iter().any(|a| a.eq_ignore_ascii_case(&lowered))
}

/// A narrow, conservative fast-clean path for utterances too short to
/// plausibly carry an STT correction worth an LLM round trip: one or two
/// ASCII tokens with no unbalanced punctuation. Anything longer falls
/// through to `process`, since surface cleanliness alone can't tell a
/// correctly-transcribed sentence from one with a homophone error inside it.
fn is_short_and_clean(trimmed: &str) -> bool {
    let word_count = trimmed.split_whitespace().count();
    if word_count == 0 || word_count > 2 {
        return false;
    }
    if !trimmed.is_ascii() {
        return false;
    }
    balanced_punctuation(trimmed)
}

fn balanced_punctuation(text: &str) -> bool {
    let quotes = text.chars().filter(|&c| c == '"').count();
    let opens = text.chars().filter(|&c| c == '(').count();
    let closes = text.chars().filter(|&c| c == ')').count();
    quotes % 2 == 0 && opens == closes
}
