//! Session Manager (C7): create, hydrate, evict, stop, and look up
//! evaluations; owns the per-evaluation lock map and delegates the actual
//! turn processing to an injected [`TurnPipeline`].
//!
//! The Manager knows nothing about LLM calls or function execution — that's
//! the Pipeline's job (C6, built on top of this crate). This seam keeps the
//! concurrency/lifecycle/hydration machinery independent of what a turn
//! actually does.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, RwLock as AsyncRwLock, Semaphore};

use lumen_domain::config::{PersistenceConfig, SessionsConfig};
use lumen_domain::error::{Error, Result};
use lumen_domain::model::{CalledFunction, CleanedTurn, Evaluation, EvaluationConfig, EvaluationStatus, MirroredCustomer, Turn};
use lumen_domain::trace::TraceEvent;
use lumen_prompt::Template;
use lumen_store::{EvaluationSnapshot, PersistencePort, TurnSource};

use crate::lifecycle::LifecycleManager;
use crate::lock::EvaluationLockMap;
use crate::state::SessionState;

/// Result envelope returned by `process_turn`, per the external-interface
/// contract: the cleaning result, the optional function-calling result, and
/// aggregate cost/timing.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub cleaned_turn: CleanedTurn,
    pub called_functions: Vec<CalledFunction>,
    pub total_cost_usd: f64,
    pub total_processing_time_ms: u64,
}

/// The seam between Session Manager (C7) and Processing Pipeline (C6).
/// Implemented by the pipeline; the manager only calls it under the
/// evaluation's exclusive lock, with a freshly hydrated `SessionState`.
#[async_trait]
pub trait TurnPipeline: Send + Sync {
    async fn process(&self, state: &mut SessionState, turn: &Turn) -> Result<TurnOutcome>;
}

/// Everything needed to construct a fresh `SessionState` for an evaluation
/// that isn't yet in memory — either brand new or rehydrated.
struct TemplateSource {
    cleaner: Template,
    function: Option<Template>,
}

fn build_templates(config: &EvaluationConfig) -> TemplateSource {
    // Template text is resolved from `*_template_ref` by whatever template
    // store backs the ambient binary; here the ref doubles as the raw
    // template body for the reference wiring used by tests and examples.
    TemplateSource {
        cleaner: Template::new(config.cleaner_prompt_template_ref.clone()),
        function: config
            .function_prompt_template_ref
            .clone()
            .map(Template::new),
    }
}

pub struct SessionManager<P, T> {
    persistence: Arc<P>,
    turns: Arc<T>,
    states: AsyncRwLock<HashMap<String, Arc<AsyncMutex<SessionState>>>>,
    locks: EvaluationLockMap,
    lifecycle: LifecycleManager,
    max_history_entries: usize,
    /// Bounds how many blocking persistence calls run concurrently, sized by
    /// `PersistenceConfig::persist_pool_size`. Every `PersistencePort` call is
    /// synchronous (file or DB I/O) and must not run directly on the async
    /// orchestration task.
    persist_pool: Arc<Semaphore>,
    /// Gradual-rollout flag: when `false`, `dispatch` falls back to calling
    /// the `PersistencePort` method inline instead of handing it to the
    /// blocking pool. Exists so the pool path can be rolled back without a
    /// redeploy if it misbehaves; does not change `commit_turn`'s
    /// single-transaction semantics either way.
    use_batch_processing: bool,
}

impl<P, T> SessionManager<P, T>
where
    P: PersistencePort + 'static,
    T: TurnSource + 'static,
{
    pub fn new(
        persistence: Arc<P>,
        turns: Arc<T>,
        sessions_config: &SessionsConfig,
        persistence_config: &PersistenceConfig,
    ) -> Self {
        Self {
            persistence,
            turns,
            states: AsyncRwLock::new(HashMap::new()),
            locks: EvaluationLockMap::new(),
            lifecycle: LifecycleManager::new(sessions_config),
            max_history_entries: sessions_config.max_history_entries,
            persist_pool: Arc::new(Semaphore::new(persistence_config.persist_pool_size.max(1))),
            use_batch_processing: persistence_config.use_batch_processing,
        }
    }

    /// Run a blocking `PersistencePort` call on the blocking thread pool,
    /// gated by `persist_pool` so at most `persist_pool_size` such calls are
    /// in flight at once. Falls back to running `f` inline when
    /// `use_batch_processing` is off.
    async fn dispatch<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        if !self.use_batch_processing {
            return f();
        }
        let _permit = self
            .persist_pool
            .acquire()
            .await
            .map_err(|e| Error::Other(e.to_string()))?;
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| Error::Other(format!("persistence task panicked: {e}")))?
    }

    /// Persist a new Evaluation and its initial MirroredCustomer snapshot.
    /// Does not hydrate an in-memory SessionState.
    pub fn create_evaluation(
        &self,
        conversation_id: &str,
        config: EvaluationConfig,
        initial_customer: MirroredCustomer,
    ) -> Result<String> {
        config
            .validate()
            .map_err(Error::Validation)?;

        let evaluation = Evaluation {
            evaluation_id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_owned(),
            config,
            status: EvaluationStatus::Created,
            created_at: Utc::now(),
        };
        self.persistence
            .create_evaluation(&evaluation, &initial_customer)?;
        Ok(evaluation.evaluation_id)
    }

    /// Process one turn through the injected pipeline, under the
    /// evaluation's exclusive lock. Hydrates SessionState on first access.
    pub async fn process_turn(
        &self,
        evaluation_id: &str,
        turn_id: &str,
        pipeline: &dyn TurnPipeline,
    ) -> Result<TurnOutcome> {
        let permit = self
            .locks
            .acquire(evaluation_id)
            .await
            .map_err(|e| Error::Other(e.to_string()))?;
        let result = self.process_turn_locked(evaluation_id, turn_id, pipeline).await;
        drop(permit);
        result
    }

    async fn process_turn_locked(
        &self,
        evaluation_id: &str,
        turn_id: &str,
        pipeline: &dyn TurnPipeline,
    ) -> Result<TurnOutcome> {
        let handle = self.resolve_state(evaluation_id).await?;

        // Idempotence: a previously persisted CleanedTurn for this turn_id
        // is returned unchanged rather than reprocessed.
        let existing = {
            let persistence = self.persistence.clone();
            let evaluation_id = evaluation_id.to_owned();
            let turn_id = turn_id.to_owned();
            self.dispatch(move || persistence.find_cleaned_turn(&evaluation_id, &turn_id))
                .await?
        };
        if let Some((cleaned, called)) = existing {
            let total_cost_usd = cleaned.cost_usd + called.iter().map(|c| c.cost_usd).sum::<f64>();
            let total_processing_time_ms =
                cleaned.processing_time_ms + called.iter().map(|c| c.processing_time_ms).sum::<u64>();
            return Ok(TurnOutcome {
                cleaned_turn: cleaned,
                called_functions: called,
                total_cost_usd,
                total_processing_time_ms,
            });
        }

        let mut state = handle.lock().await;
        if state.evaluation.status == EvaluationStatus::Stopped {
            return Err(Error::Stopped(evaluation_id.to_owned()));
        }

        let conversation_id = state.evaluation.conversation_id.clone();
        let turn = self
            .turns
            .load_turn(&conversation_id, turn_id)?
            .ok_or_else(|| Error::NotFound(format!("turn {turn_id}")))?;

        let outcome = pipeline.process(&mut state, &turn).await?;

        {
            let persistence = self.persistence.clone();
            let eval_id = evaluation_id.to_owned();
            let cleaned_turn = outcome.cleaned_turn.clone();
            let called_functions = outcome.called_functions.clone();
            let customer = state.mirrored_customer.clone();
            self.dispatch(move || persistence.commit_turn(&eval_id, &cleaned_turn, &called_functions, &customer))
                .await?;
        }
        TraceEvent::BatchPersisted {
            evaluation_id: evaluation_id.to_owned(),
            turn_id: turn_id.to_owned(),
            cleaned_turn_id: outcome.cleaned_turn.id.clone(),
            called_functions: outcome.called_functions.len(),
        }
        .emit();

        state.append_cleaned_turn(outcome.cleaned_turn.clone());
        for called in &outcome.called_functions {
            state.append_function_call(called.clone());
        }
        state.touch(Utc::now());

        Ok(outcome)
    }

    /// Mark the evaluation stopped: subsequent `process_turn` calls reject
    /// immediately, in-flight turns are allowed to drain (they already hold
    /// the lock this call waits on).
    pub async fn stop_evaluation(&self, evaluation_id: &str) -> Result<()> {
        let permit = self
            .locks
            .acquire(evaluation_id)
            .await
            .map_err(|e| Error::Other(e.to_string()))?;

        {
            let persistence = self.persistence.clone();
            let eval_id = evaluation_id.to_owned();
            self.dispatch(move || persistence.update_status(&eval_id, EvaluationStatus::Stopped))
                .await?;
        }
        if let Some(handle) = self.states.read().await.get(evaluation_id) {
            handle.lock().await.evaluation.status = EvaluationStatus::Stopped;
        }
        drop(permit);
        Ok(())
    }

    /// Read-only snapshot for observers: history counts, last-access,
    /// stopped flag.
    pub async fn get_state(&self, evaluation_id: &str) -> Option<StateSnapshot> {
        let states = self.states.read().await;
        let handle = states.get(evaluation_id)?;
        let state = handle.lock().await;
        Some(StateSnapshot {
            evaluation_id: evaluation_id.to_owned(),
            status: state.evaluation.status,
            cleaned_turn_count: state.cleaned_window(usize::MAX).len(),
            function_call_count: state.function_window(usize::MAX).len(),
            last_access: state.last_access,
        })
    }

    /// Evict evaluations idle past TTL and not running. Call on an interval
    /// timer (`LifecycleManager::sweep_interval_seconds`). An evaluation
    /// whose state is in use (lock contended) is skipped this round rather
    /// than waited on.
    pub async fn sweep(&self) {
        let now = Utc::now();
        let mut states = self.states.write().await;
        let mut kept = HashMap::new();
        for (id, handle) in states.drain() {
            let evict = match handle.try_lock() {
                Ok(state) => {
                    self.lifecycle
                        .should_evict(state.evaluation.status, state.last_access, now)
                }
                Err(_) => false,
            };
            if evict {
                TraceEvent::SessionEvicted {
                    evaluation_id: id,
                    reason: "idle past ttl".to_owned(),
                }
                .emit();
            } else {
                kept.insert(id, handle);
            }
        }
        *states = kept;
        self.locks.prune_idle();
    }

    async fn resolve_state(&self, evaluation_id: &str) -> Result<Arc<AsyncMutex<SessionState>>> {
        if let Some(handle) = self.states.read().await.get(evaluation_id) {
            return Ok(handle.clone());
        }

        let mut states = self.states.write().await;
        if let Some(handle) = states.get(evaluation_id) {
            return Ok(handle.clone());
        }

        let snapshot = {
            let persistence = self.persistence.clone();
            let eval_id = evaluation_id.to_owned();
            self.dispatch(move || persistence.load_evaluation(&eval_id))
                .await?
        }
        .ok_or_else(|| Error::NotFound(format!("evaluation {evaluation_id}")))?;
        let state = self.hydrate(snapshot);
        let handle = Arc::new(AsyncMutex::new(state));
        states.insert(evaluation_id.to_owned(), handle.clone());
        Ok(handle)
    }

    fn hydrate(&self, snapshot: EvaluationSnapshot) -> SessionState {
        TraceEvent::SessionHydrated {
            evaluation_id: snapshot.evaluation.evaluation_id.clone(),
            cleaned_turns: snapshot.cleaned_history.len(),
            called_functions: snapshot.function_call_history.len(),
        }
        .emit();
        let templates = build_templates(&snapshot.evaluation.config);
        SessionState::hydrate(
            snapshot.evaluation,
            snapshot.mirrored_customer,
            snapshot.cleaned_history,
            snapshot.function_call_history,
            templates.cleaner,
            templates.function,
            self.max_history_entries,
            Utc::now(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub evaluation_id: String,
    pub status: EvaluationStatus,
    pub cleaned_turn_count: usize,
    pub function_call_count: usize,
    pub last_access: chrono::DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_domain::model::{CleaningLevel, ConfidenceScore};
    use lumen_domain::usage::Usage;
    use lumen_store::FileStore;

    struct EchoPipeline;

    #[async_trait]
    impl TurnPipeline for EchoPipeline {
        async fn process(&self, state: &mut SessionState, turn: &Turn) -> Result<TurnOutcome> {
            let cleaned_turn = CleanedTurn {
                id: format!("ct-{}", turn.turn_id),
                turn_id: turn.turn_id.clone(),
                evaluation_id: state.evaluation.evaluation_id.clone(),
                speaker: turn.speaker.clone(),
                cleaned_text: turn.raw_text.clone(),
                confidence_score: ConfidenceScore::High,
                cleaning_applied: true,
                cleaning_level: CleaningLevel::Light,
                ai_model_used: None,
                processing_time_ms: 1,
                corrections: Vec::new(),
                context_detected: None,
                token_usage: Usage::ZERO,
                cost_usd: 0.0,
            };
            Ok(TurnOutcome {
                cleaned_turn,
                called_functions: Vec::new(),
                total_cost_usd: 0.0,
                total_processing_time_ms: 1,
            })
        }
    }

    fn sessions_config() -> SessionsConfig {
        SessionsConfig::default()
    }

    fn persistence_config() -> PersistenceConfig {
        PersistenceConfig::default()
    }

    fn sample_turn(turn_id: &str, conversation_id: &str, sequence: u64) -> Turn {
        Turn {
            turn_id: turn_id.into(),
            conversation_id: conversation_id.into(),
            speaker: "User".into(),
            raw_text: format!("hello {turn_id}"),
            sequence,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn process_turn_hydrates_commits_and_updates_in_memory_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        let manager = SessionManager::new(store.clone(), store.clone(), &sessions_config(), &persistence_config());

        let evaluation_id = manager
            .create_evaluation(
                "conv-1",
                EvaluationConfig {
                    cleaner_prompt_template_ref: "{raw_text}".into(),
                    function_prompt_template_ref: None,
                    cleaner_window_size: 10,
                    function_window_size: 20,
                    functions_enabled: false,
                },
                MirroredCustomer::new_at(Utc::now()),
            )
            .unwrap();

        store.ingest_turn(&sample_turn("t1", "conv-1", 1)).unwrap();

        let outcome = manager
            .process_turn(&evaluation_id, "t1", &EchoPipeline)
            .await
            .unwrap();
        assert_eq!(outcome.cleaned_turn.cleaned_text, "hello t1");

        let snapshot = manager.get_state(&evaluation_id).await.unwrap();
        assert_eq!(snapshot.cleaned_turn_count, 1);
    }

    #[tokio::test]
    async fn process_turn_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        let manager = SessionManager::new(store.clone(), store.clone(), &sessions_config(), &persistence_config());

        let evaluation_id = manager
            .create_evaluation(
                "conv-1",
                EvaluationConfig {
                    cleaner_prompt_template_ref: "{raw_text}".into(),
                    function_prompt_template_ref: None,
                    cleaner_window_size: 10,
                    function_window_size: 20,
                    functions_enabled: false,
                },
                MirroredCustomer::new_at(Utc::now()),
            )
            .unwrap();
        store.ingest_turn(&sample_turn("t1", "conv-1", 1)).unwrap();

        manager
            .process_turn(&evaluation_id, "t1", &EchoPipeline)
            .await
            .unwrap();
        manager
            .process_turn(&evaluation_id, "t1", &EchoPipeline)
            .await
            .unwrap();

        let snapshot = manager.get_state(&evaluation_id).await.unwrap();
        assert_eq!(snapshot.cleaned_turn_count, 1);
    }

    #[tokio::test]
    async fn process_turn_rejects_after_stop() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        let manager = SessionManager::new(store.clone(), store.clone(), &sessions_config(), &persistence_config());

        let evaluation_id = manager
            .create_evaluation(
                "conv-1",
                EvaluationConfig {
                    cleaner_prompt_template_ref: "{raw_text}".into(),
                    function_prompt_template_ref: None,
                    cleaner_window_size: 10,
                    function_window_size: 20,
                    functions_enabled: false,
                },
                MirroredCustomer::new_at(Utc::now()),
            )
            .unwrap();
        store.ingest_turn(&sample_turn("t1", "conv-1", 1)).unwrap();

        manager
            .process_turn(&evaluation_id, "t1", &EchoPipeline)
            .await
            .unwrap();
        manager.stop_evaluation(&evaluation_id).await.unwrap();

        store.ingest_turn(&sample_turn("t2", "conv-1", 2)).unwrap();
        let result = manager.process_turn(&evaluation_id, "t2", &EchoPipeline).await;
        assert!(matches!(result, Err(Error::Stopped(_))));
    }
}
