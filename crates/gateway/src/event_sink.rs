//! Outbound event sink: one fire-and-forget record published per
//! successfully persisted turn, for downstream subscribers (analytics,
//! billing, whatever consumes `{evaluation_id, turn_id, cleaned_turn,
//! called_functions, cost, timing}` outside this process).
//!
//! Distinct from [`lumen_domain::trace::TraceEvent`]: trace events are
//! operator-facing and fire at every milestone regardless of outcome; this
//! sink fires exactly once per turn, only after `commit_turn` has already
//! succeeded, and a sink failure must never fail the turn itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lumen_domain::model::{CalledFunction, CleanedTurn};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TurnEventRecord {
    pub evaluation_id: String,
    pub turn_id: String,
    pub cleaned_turn: CleanedTurn,
    pub called_functions: Vec<CalledFunction>,
    pub total_cost_usd: f64,
    pub total_processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, record: TurnEventRecord);
}

/// Reference sink: logs the record as structured JSON and drops it. A real
/// deployment swaps this for a queue or webhook publisher without touching
/// the pipeline.
pub struct LoggingEventSink;

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn publish(&self, record: TurnEventRecord) {
        match serde_json::to_string(&record) {
            Ok(json) => tracing::info!(turn_event = %json, "lumen_turn_event"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize turn event"),
        }
    }
}

#[cfg(test)]
pub struct RecordingEventSink {
    pub records: tokio::sync::Mutex<Vec<TurnEventRecord>>,
}

#[cfg(test)]
impl RecordingEventSink {
    pub fn new() -> Self {
        Self { records: tokio::sync::Mutex::new(Vec::new()) }
    }
}

#[cfg(test)]
#[async_trait]
impl EventSink for RecordingEventSink {
    async fn publish(&self, record: TurnEventRecord) {
        self.records.lock().await.push(record);
    }
}
