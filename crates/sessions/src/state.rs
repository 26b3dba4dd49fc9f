//! Session State (C4): the mutable, in-memory, per-evaluation scratchpad.
//!
//! Persistence outlives memory; this is a cache plus scratchpad hydrated
//! from it and truncated independently of what's on disk.

use chrono::{DateTime, Utc};
use lumen_domain::model::{CalledFunction, CleanedTurn, Evaluation, MirroredCustomer};
use lumen_prompt::Template;

/// Owns the mutable in-memory view of one evaluation.
pub struct SessionState {
    pub evaluation: Evaluation,
    pub mirrored_customer: MirroredCustomer,
    /// Ordered, append-only. Truncated to `max_history_entries` in memory;
    /// persistence keeps the full history regardless.
    cleaned_history: Vec<CleanedTurn>,
    function_call_history: Vec<CalledFunction>,
    pub cleaner_template: Template,
    pub function_template: Option<Template>,
    max_history_entries: usize,
    pub last_access: DateTime<Utc>,
}

impl SessionState {
    pub fn new(
        evaluation: Evaluation,
        mirrored_customer: MirroredCustomer,
        cleaner_template: Template,
        function_template: Option<Template>,
        max_history_entries: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            evaluation,
            mirrored_customer,
            cleaned_history: Vec::new(),
            function_call_history: Vec::new(),
            cleaner_template,
            function_template,
            max_history_entries,
            last_access: now,
        }
    }

    /// Rehydrate from a full persisted history, applying the same in-memory
    /// truncation a live session would have accumulated.
    pub fn hydrate(
        evaluation: Evaluation,
        mirrored_customer: MirroredCustomer,
        cleaned_history: Vec<CleanedTurn>,
        function_call_history: Vec<CalledFunction>,
        cleaner_template: Template,
        function_template: Option<Template>,
        max_history_entries: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let mut state = Self::new(
            evaluation,
            mirrored_customer,
            cleaner_template,
            function_template,
            max_history_entries,
            now,
        );
        state.cleaned_history = cleaned_history;
        state.function_call_history = function_call_history;
        state.truncate();
        state
    }

    fn truncate(&mut self) {
        if self.cleaned_history.len() > self.max_history_entries {
            let drop = self.cleaned_history.len() - self.max_history_entries;
            self.cleaned_history.drain(0..drop);
        }
        if self.function_call_history.len() > self.max_history_entries {
            let drop = self.function_call_history.len() - self.max_history_entries;
            self.function_call_history.drain(0..drop);
        }
    }

    pub fn append_cleaned_turn(&mut self, entry: CleanedTurn) {
        self.cleaned_history.push(entry);
        self.truncate();
    }

    pub fn append_function_call(&mut self, entry: CalledFunction) {
        self.function_call_history.push(entry);
        self.truncate();
    }

    /// Last `n` cleaned turns, oldest first — the cleaner/function sliding
    /// windows are always composed of cleaned text, never raw.
    pub fn cleaned_window(&self, n: usize) -> &[CleanedTurn] {
        let len = self.cleaned_history.len();
        &self.cleaned_history[len.saturating_sub(n)..]
    }

    pub fn function_window(&self, n: usize) -> &[CalledFunction] {
        let len = self.function_call_history.len();
        &self.function_call_history[len.saturating_sub(n)..]
    }

    pub fn find_cleaned_turn(&self, turn_id: &str) -> Option<&CleanedTurn> {
        self.cleaned_history.iter().find(|ct| ct.turn_id == turn_id)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_access = now;
        self.mirrored_customer.touch(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_domain::model::{
        CleaningLevel, ConfidenceScore, EvaluationConfig, EvaluationStatus,
    };
    use lumen_domain::usage::Usage;

    fn evaluation() -> Evaluation {
        Evaluation {
            evaluation_id: "eval-1".into(),
            conversation_id: "conv-1".into(),
            config: EvaluationConfig {
                cleaner_prompt_template_ref: "cleaner/v1".into(),
                function_prompt_template_ref: None,
                cleaner_window_size: 10,
                function_window_size: 20,
                functions_enabled: true,
            },
            status: EvaluationStatus::Created,
            created_at: Utc::now(),
        }
    }

    fn cleaned_turn(turn_id: &str) -> CleanedTurn {
        CleanedTurn {
            id: format!("ct-{turn_id}"),
            turn_id: turn_id.into(),
            evaluation_id: "eval-1".into(),
            speaker: "User".into(),
            cleaned_text: "hi".into(),
            confidence_score: ConfidenceScore::High,
            cleaning_applied: true,
            cleaning_level: CleaningLevel::Light,
            ai_model_used: None,
            processing_time_ms: 1,
            corrections: Vec::new(),
            context_detected: None,
            token_usage: Usage::ZERO,
            cost_usd: 0.0,
        }
    }

    fn new_state(max_history: usize) -> SessionState {
        SessionState::new(
            evaluation(),
            MirroredCustomer::new_at(Utc::now()),
            Template::new("{raw_text}"),
            None,
            max_history,
            Utc::now(),
        )
    }

    #[test]
    fn cleaned_window_returns_last_n_oldest_first() {
        let mut state = new_state(1000);
        for i in 0..5 {
            state.append_cleaned_turn(cleaned_turn(&format!("t{i}")));
        }
        let window = state.cleaned_window(3);
        let ids: Vec<_> = window.iter().map(|ct| ct.turn_id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t3", "t4"]);
    }

    #[test]
    fn history_is_truncated_to_max_entries() {
        let mut state = new_state(3);
        for i in 0..10 {
            state.append_cleaned_turn(cleaned_turn(&format!("t{i}")));
        }
        assert_eq!(state.cleaned_window(100).len(), 3);
        let ids: Vec<_> = state
            .cleaned_window(100)
            .iter()
            .map(|ct| ct.turn_id.as_str())
            .collect();
        assert_eq!(ids, vec!["t7", "t8", "t9"]);
    }

    #[test]
    fn find_cleaned_turn_locates_by_turn_id() {
        let mut state = new_state(1000);
        state.append_cleaned_turn(cleaned_turn("t1"));
        assert!(state.find_cleaned_turn("t1").is_some());
        assert!(state.find_cleaned_turn("missing").is_none());
    }
}
