//! Reference [`PersistencePort`] implementation: one JSON file per
//! evaluation under a configured base directory, with an in-memory cache for
//! fast reads and idempotence checks.
//!
//! Writes go to a `.tmp` sibling file, then `rename` over the real path —
//! the rename is atomic on the same filesystem, so a crash mid-write never
//! leaves a half-written snapshot behind.

use crate::port::{EvaluationSnapshot, PersistencePort, TurnSource};
use lumen_domain::error::{Error, Result};
use lumen_domain::model::{CalledFunction, CleanedTurn, Evaluation, EvaluationStatus, MirroredCustomer, Turn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EvaluationRecord {
    evaluation: Evaluation,
    mirrored_customer: MirroredCustomer,
    cleaned_history: Vec<CleanedTurn>,
    function_call_history: Vec<CalledFunction>,
}

pub struct FileStore {
    base_dir: PathBuf,
    cache: RwLock<HashMap<String, EvaluationRecord>>,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir).map_err(Error::Io)?;
        Ok(Self {
            base_dir,
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn path_for(&self, evaluation_id: &str) -> PathBuf {
        self.base_dir.join(format!("{evaluation_id}.json"))
    }

    fn turns_path(&self, conversation_id: &str) -> PathBuf {
        self.base_dir
            .join("turns")
            .join(format!("{conversation_id}.jsonl"))
    }

    /// Append a raw Turn to its conversation's ingest log. Exposed for test
    /// harnesses and ambient ingress adapters to seed turns that
    /// [`TurnSource::load_turn`] can later resolve.
    pub fn ingest_turn(&self, turn: &Turn) -> Result<()> {
        let path = self.turns_path(&turn.conversation_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }
        let json = serde_json::to_string(turn)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(Error::Io)?;
        writeln!(file, "{json}").map_err(Error::Io)?;
        Ok(())
    }

    fn write_record(&self, evaluation_id: &str, record: &EvaluationRecord) -> Result<()> {
        let path = self.path_for(evaluation_id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(record)?;
        {
            let mut f = std::fs::File::create(&tmp).map_err(Error::Io)?;
            f.write_all(json.as_bytes()).map_err(Error::Io)?;
        }
        std::fs::rename(&tmp, &path).map_err(Error::Io)?;
        Ok(())
    }

    fn load_from_disk(&self, evaluation_id: &str) -> Result<Option<EvaluationRecord>> {
        let path = self.path_for(evaluation_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
        let record: EvaluationRecord = serde_json::from_str(&raw)?;
        Ok(Some(record))
    }
}

impl PersistencePort for FileStore {
    fn create_evaluation(&self, evaluation: &Evaluation, customer: &MirroredCustomer) -> Result<()> {
        let record = EvaluationRecord {
            evaluation: evaluation.clone(),
            mirrored_customer: customer.clone(),
            cleaned_history: Vec::new(),
            function_call_history: Vec::new(),
        };
        self.write_record(&evaluation.evaluation_id, &record)?;
        self.cache
            .write()
            .insert(evaluation.evaluation_id.clone(), record);
        Ok(())
    }

    fn load_evaluation(&self, evaluation_id: &str) -> Result<Option<EvaluationSnapshot>> {
        if let Some(record) = self.cache.read().get(evaluation_id).cloned() {
            return Ok(Some(to_snapshot(record)));
        }
        match self.load_from_disk(evaluation_id)? {
            Some(record) => {
                self.cache
                    .write()
                    .insert(evaluation_id.to_string(), record.clone());
                Ok(Some(to_snapshot(record)))
            }
            None => Ok(None),
        }
    }

    fn find_cleaned_turn(
        &self,
        evaluation_id: &str,
        turn_id: &str,
    ) -> Result<Option<(CleanedTurn, Vec<CalledFunction>)>> {
        let Some(snapshot) = self.load_evaluation(evaluation_id)? else {
            return Ok(None);
        };
        let Some(cleaned) = snapshot
            .cleaned_history
            .into_iter()
            .find(|ct| ct.turn_id == turn_id)
        else {
            return Ok(None);
        };
        let calls = snapshot
            .function_call_history
            .into_iter()
            .filter(|cf| cf.cleaned_turn_id == cleaned.id)
            .collect();
        Ok(Some((cleaned, calls)))
    }

    fn commit_turn(
        &self,
        evaluation_id: &str,
        cleaned_turn: &CleanedTurn,
        called_functions: &[CalledFunction],
        customer: &MirroredCustomer,
    ) -> Result<()> {
        let mut cache = self.cache.write();
        let record = cache
            .get(evaluation_id)
            .cloned()
            .or_else(|| self.load_from_disk(evaluation_id).ok().flatten())
            .ok_or_else(|| {
                Error::NotFound(format!("evaluation {evaluation_id} not persisted"))
            })?;

        let mut next = record.clone();
        next.cleaned_history.push(cleaned_turn.clone());
        next.function_call_history
            .extend(called_functions.iter().cloned());
        next.mirrored_customer = customer.clone();

        // Write to disk before updating the cache — on write failure the
        // cache (and therefore the caller's in-memory state) is untouched.
        self.write_record(evaluation_id, &next)?;
        cache.insert(evaluation_id.to_string(), next);
        Ok(())
    }

    fn update_status(&self, evaluation_id: &str, status: EvaluationStatus) -> Result<()> {
        let mut cache = self.cache.write();
        let record = cache
            .get(evaluation_id)
            .cloned()
            .or_else(|| self.load_from_disk(evaluation_id).ok().flatten())
            .ok_or_else(|| {
                Error::NotFound(format!("evaluation {evaluation_id} not persisted"))
            })?;

        let mut next = record.clone();
        next.evaluation.status = status;
        self.write_record(evaluation_id, &next)?;
        cache.insert(evaluation_id.to_string(), next);
        Ok(())
    }
}

impl TurnSource for FileStore {
    fn load_turn(&self, conversation_id: &str, turn_id: &str) -> Result<Option<Turn>> {
        let path = self.turns_path(conversation_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let turn: Turn = serde_json::from_str(line)?;
            if turn.turn_id == turn_id {
                return Ok(Some(turn));
            }
        }
        Ok(None)
    }
}

fn to_snapshot(record: EvaluationRecord) -> EvaluationSnapshot {
    EvaluationSnapshot {
        evaluation: record.evaluation,
        mirrored_customer: record.mirrored_customer,
        cleaned_history: record.cleaned_history,
        function_call_history: record.function_call_history,
    }
}
