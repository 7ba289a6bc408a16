//! Durable checkpoint files: one JSON file per batch, written via
//! write-temp-then-rename so a crash mid-write never leaves a corrupt
//! checkpoint for the next run to load.

use std::fs;
use std::path::PathBuf;

use citelaw_core::{CiteError, LawId};
use serde::{Deserialize, Serialize};

/// Cumulative counters carried forward across batches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    pub statutes_completed: u64,
    pub statutes_skipped: u64,
    pub citations_detected: u64,
    pub edges_inserted: u64,
}

/// One checkpoint: the batch just completed, the law ids it covered, and
/// the running totals so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub batch_index: u64,
    pub completed_law_ids: Vec<LawId>,
    pub counters: Counters,
}

impl Checkpoint {
    pub fn initial() -> Self {
        Self {
            batch_index: 0,
            completed_law_ids: Vec::new(),
            counters: Counters::default(),
        }
    }
}

/// Reads and writes checkpoint files under a single directory.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(batch_index: u64) -> String {
        format!("checkpoint-{batch_index:010}.json")
    }

    /// The most recently completed batch's checkpoint, or `None` if the
    /// directory has no checkpoint files yet (a fresh run).
    pub fn load_latest(&self) -> Result<Option<Checkpoint>, CiteError> {
        if !self.dir.exists() {
            return Ok(None);
        }
        let mut latest: Option<(u64, PathBuf)> = None;
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| CiteError::Fatal(format!("cannot read checkpoint dir: {e}")))?;
        for entry in entries {
            let entry = entry.map_err(|e| CiteError::Fatal(format!("cannot read checkpoint dir entry: {e}")))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            let Some(digits) = name.strip_prefix("checkpoint-").and_then(|s| s.strip_suffix(".json")) else {
                continue;
            };
            let Ok(index) = digits.parse::<u64>() else { continue };
            if latest.as_ref().is_none_or(|(best, _)| index > *best) {
                latest = Some((index, path));
            }
        }
        let Some((_, path)) = latest else { return Ok(None) };
        let content = fs::read_to_string(&path)
            .map_err(|e| CiteError::Fatal(format!("cannot read checkpoint file: {e}")))?;
        let checkpoint = serde_json::from_str(&content)
            .map_err(|e| CiteError::Fatal(format!("cannot parse checkpoint file: {e}")))?;
        Ok(Some(checkpoint))
    }

    /// Writes `checkpoint` durably: serialize to a temp file in the same
    /// directory, then rename over the final path. The rename is atomic on
    /// the same filesystem, so readers never observe a half-written file.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CiteError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| CiteError::Fatal(format!("cannot create checkpoint dir: {e}")))?;
        let final_path = self.dir.join(Self::file_name(checkpoint.batch_index));
        let tmp_path = self.dir.join(format!("{}.tmp-{}", Self::file_name(checkpoint.batch_index), std::process::id()));
        let content = serde_json::to_string_pretty(checkpoint)
            .map_err(|e| CiteError::Fatal(format!("cannot serialize checkpoint: {e}")))?;
        fs::write(&tmp_path, content)
            .map_err(|e| CiteError::Fatal(format!("cannot write checkpoint temp file: {e}")))?;
        fs::rename(&tmp_path, &final_path)
            .map_err(|e| CiteError::Fatal(format!("cannot rename checkpoint temp file: {e}")))?;
        Ok(())
    }

    /// Removes every checkpoint file, for a `--fresh` run.
    pub fn clear(&self) -> Result<(), CiteError> {
        if !self.dir.exists() {
            return Ok(());
        }
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| CiteError::Fatal(format!("cannot read checkpoint dir: {e}")))?;
        for entry in entries {
            let entry = entry.map_err(|e| CiteError::Fatal(format!("cannot read checkpoint dir entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json")
                || path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.contains(".tmp-"))
            {
                let _ = fs::remove_file(&path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fresh_directory_has_no_checkpoint() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert!(store.load_latest().unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let mut checkpoint = Checkpoint::initial();
        checkpoint.completed_law_ids.push(LawId::new("129AC0000000089"));
        checkpoint.counters.statutes_completed = 1;
        store.save(&checkpoint).unwrap();

        let loaded = store.load_latest().unwrap().unwrap();
        assert_eq!(loaded, checkpoint);
    }

    #[test]
    fn load_latest_picks_highest_batch_index() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let mut first = Checkpoint::initial();
        first.batch_index = 0;
        store.save(&first).unwrap();

        let mut second = Checkpoint::initial();
        second.batch_index = 1;
        second.counters.statutes_completed = 100;
        store.save(&second).unwrap();

        let loaded = store.load_latest().unwrap().unwrap();
        assert_eq!(loaded.batch_index, 1);
        assert_eq!(loaded.counters.statutes_completed, 100);
    }

    #[test]
    fn clear_removes_all_checkpoints() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save(&Checkpoint::initial()).unwrap();
        store.clear().unwrap();
        assert!(store.load_latest().unwrap().is_none());
    }
}
