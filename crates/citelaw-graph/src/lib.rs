//! The citation graph: an in-memory store keyed on statute ids, plus the
//! bounded-BFS amendment-impact analyzer built on top of it.

mod impact;
mod store;

pub use impact::{analyze, ImpactResult};
pub use store::{InMemoryGraphStore, DEFAULT_BATCH_SIZE};
