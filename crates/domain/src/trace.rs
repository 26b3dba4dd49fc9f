use serde::Serialize;

/// Structured trace events emitted across the turn lifecycle.
///
/// Distinct from the outbound event sink (one record per successfully
/// persisted turn, for downstream subscribers): these are operator-facing,
/// emitted at every milestone regardless of outcome, so a single turn's
/// processing can be reconstructed from logs alone.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    TurnClassified {
        evaluation_id: String,
        turn_id: String,
        path: String,
    },
    CleanerCallIssued {
        evaluation_id: String,
        turn_id: String,
        window_len: usize,
    },
    CleanerCallReturned {
        evaluation_id: String,
        turn_id: String,
        duration_ms: u64,
        input_tokens: u32,
        output_tokens: u32,
        fallback: bool,
    },
    FunctionCallerIssued {
        evaluation_id: String,
        turn_id: String,
        window_len: usize,
    },
    FunctionCallerReturned {
        evaluation_id: String,
        turn_id: String,
        duration_ms: u64,
        tool_calls: usize,
    },
    FunctionExecuted {
        evaluation_id: String,
        turn_id: String,
        function_name: String,
        success: bool,
        duration_ms: u64,
    },
    BatchPersisted {
        evaluation_id: String,
        turn_id: String,
        cleaned_turn_id: String,
        called_functions: usize,
    },
    TurnComplete {
        evaluation_id: String,
        turn_id: String,
        total_cost_usd: f64,
        total_processing_time_ms: u64,
    },
    SessionHydrated {
        evaluation_id: String,
        cleaned_turns: usize,
        called_functions: usize,
    },
    SessionEvicted {
        evaluation_id: String,
        reason: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "lumen_event");
    }
}
