//! The orchestrator: batched, checkpointed traversal of every current
//! statute, running the detector over each article and writing the
//! resulting citations into a graph store.

mod checkpoint;
mod run;

pub use checkpoint::{Checkpoint, CheckpointStore, Counters};
pub use run::{run, OrchestratorConfig, RunSummary, DEFAULT_BATCH_SIZE, DEFAULT_SUB_BATCH_SIZE};
