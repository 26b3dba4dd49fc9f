//! The persistence port: the one seam between in-memory session state and
//! durable storage.
//!
//! Every write that spans a CleanedTurn and its CalledFunctions goes through
//! [`PersistencePort::commit_turn`] as a single transaction — on failure the
//! caller must not update its in-memory state. Methods are synchronous:
//! callers dispatch them onto a blocking worker pool rather than making
//! every implementation async.

use lumen_domain::model::{CalledFunction, CleanedTurn, Evaluation, EvaluationStatus, MirroredCustomer, Turn};
use lumen_domain::error::Result;

/// Everything needed to rehydrate a [`crate`]-external SessionState.
#[derive(Debug, Clone)]
pub struct EvaluationSnapshot {
    pub evaluation: Evaluation,
    pub mirrored_customer: MirroredCustomer,
    pub cleaned_history: Vec<CleanedTurn>,
    pub function_call_history: Vec<CalledFunction>,
}

pub trait PersistencePort: Send + Sync {
    /// Create a new evaluation record with its initial customer snapshot.
    fn create_evaluation(&self, evaluation: &Evaluation, customer: &MirroredCustomer) -> Result<()>;

    /// Load a full evaluation snapshot for hydration. `Ok(None)` means the
    /// evaluation has never been persisted.
    fn load_evaluation(&self, evaluation_id: &str) -> Result<Option<EvaluationSnapshot>>;

    /// Look up a previously-persisted CleanedTurn by turn ID, for the
    /// idempotence check before reprocessing.
    fn find_cleaned_turn(
        &self,
        evaluation_id: &str,
        turn_id: &str,
    ) -> Result<Option<(CleanedTurn, Vec<CalledFunction>)>>;

    /// Atomically persist a CleanedTurn plus all CalledFunctions produced
    /// while processing it, and the evaluation's updated customer snapshot.
    /// Either everything lands or nothing does.
    fn commit_turn(
        &self,
        evaluation_id: &str,
        cleaned_turn: &CleanedTurn,
        called_functions: &[CalledFunction],
        customer: &MirroredCustomer,
    ) -> Result<()>;

    /// Update the evaluation's status (`running` / `stopped` / `complete`).
    fn update_status(&self, evaluation_id: &str, status: EvaluationStatus) -> Result<()>;
}

/// Read access to the upstream-owned, immutable record of raw turns. Kept
/// separate from [`PersistencePort`]: a Turn is produced by ingest and never
/// mutated by the core, whereas everything in `PersistencePort` is core-owned
/// evaluation state.
pub trait TurnSource: Send + Sync {
    fn load_turn(&self, conversation_id: &str, turn_id: &str) -> Result<Option<Turn>>;
}
