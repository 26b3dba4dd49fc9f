//! The persistence port and its file-backed reference adapter.

pub mod file_store;
pub mod port;

pub use file_store::FileStore;
pub use port::{EvaluationSnapshot, PersistencePort, TurnSource};
