//! Batched, checkpointed traversal of every current statute: fetch each
//! statute's articles, run the detector over them, and push the resulting
//! citations into the graph store as edges.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use citelaw_context::DocumentContext;
use citelaw_core::numeral::ArticleLabel;
use citelaw_core::ports::{ArticleSource, GraphStore};
use citelaw_core::{CiteError, Citation, CitationEdge, LawId};
use citelaw_detect::Detector;
use citelaw_dict::LawDictionary;
use rayon::prelude::*;

use crate::checkpoint::{Checkpoint, CheckpointStore, Counters};

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_SUB_BATCH_SIZE: usize = 50;
const TRANSIENT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Tunables for one orchestrator run.
pub struct OrchestratorConfig {
    /// How many statutes make up one checkpointed batch.
    pub batch_size: usize,
    /// How many articles are held in memory at once within a statute.
    pub sub_batch_size: usize,
    /// Worker pool size; defaults to `num_cpus::get()`.
    pub workers: usize,
    /// Ignore any existing checkpoint and reprocess every statute.
    pub fresh: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            sub_batch_size: DEFAULT_SUB_BATCH_SIZE,
            workers: num_cpus::get(),
            fresh: false,
        }
    }
}

/// Totals for a completed (or cancelled) run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub counters: Counters,
    pub batches_completed: u64,
    pub cancelled: bool,
}

/// Runs detection-and-graph-population over every statute `source` knows
/// about, in ascending id order, checkpointing to `checkpoint_dir` every
/// `config.batch_size` statutes.
///
/// `cancelled` is polled between articles; once it returns `true` the
/// current article finishes, the in-flight statute's edges are still
/// written, and the run stops at the next batch boundary.
/// `on_statute_done` fires once per completed (or skipped) statute, letting
/// a caller drive a progress bar without this crate depending on a UI.
pub fn run<S, D>(
    source: &S,
    dict: &LawDictionary,
    detector: &Detector,
    store: &Mutex<D>,
    checkpoint_dir: &std::path::Path,
    config: &OrchestratorConfig,
    cancelled: &(dyn Fn() -> bool + Sync),
    on_statute_done: &(dyn Fn(&LawId) + Sync),
) -> Result<RunSummary, CiteError>
where
    S: ArticleSource + Sync,
    D: GraphStore + Send,
{
    let checkpoints = CheckpointStore::new(checkpoint_dir);
    if config.fresh {
        checkpoints.clear()?;
    }

    let mut checkpoint = checkpoints.load_latest()?.unwrap_or_else(Checkpoint::initial);
    let already_done: HashSet<LawId> = checkpoint.completed_law_ids.iter().cloned().collect();

    let mut ids = source.list_current_statutes()?;
    ids.sort();
    let pending: Vec<LawId> = ids.into_iter().filter(|id| !already_done.contains(id)).collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()
        .map_err(|e| CiteError::Fatal(format!("cannot build worker pool: {e}")))?;

    let mut summary = RunSummary { counters: checkpoint.counters.clone(), ..Default::default() };

    for batch in pending.chunks(config.batch_size.max(1)) {
        if cancelled() {
            summary.cancelled = true;
            break;
        }

        let results: Vec<StatuteOutcome> = pool.install(|| {
            batch
                .par_iter()
                .map(|id| process_statute(id, source, dict, detector, store, config, cancelled))
                .collect()
        });

        for outcome in &results {
            on_statute_done(&outcome.law_id);
            match &outcome.result {
                Ok(stats) => {
                    summary.counters.statutes_completed += 1;
                    summary.counters.citations_detected += stats.citations_detected;
                    summary.counters.edges_inserted += stats.edges_inserted;
                    checkpoint.completed_law_ids.push(outcome.law_id.clone());
                }
                Err(err) => {
                    tracing::warn!(law_id = %outcome.law_id, error = %err, "skipping statute");
                    summary.counters.statutes_skipped += 1;
                }
            }
        }

        checkpoint.batch_index += 1;
        checkpoint.counters = summary.counters.clone();
        checkpoints.save(&checkpoint)?;
        summary.batches_completed += 1;
    }

    Ok(summary)
}

struct StatuteStats {
    citations_detected: u64,
    edges_inserted: u64,
}

struct StatuteOutcome {
    law_id: LawId,
    result: Result<StatuteStats, CiteError>,
}

fn process_statute<S, D>(
    law_id: &LawId,
    source: &S,
    dict: &LawDictionary,
    detector: &Detector,
    store: &Mutex<D>,
    config: &OrchestratorConfig,
    cancelled: &(dyn Fn() -> bool + Sync),
) -> StatuteOutcome
where
    S: ArticleSource + Sync,
    D: GraphStore + Send,
{
    let result = process_statute_inner(law_id, source, dict, detector, store, config, cancelled);
    StatuteOutcome { law_id: law_id.clone(), result }
}

fn process_statute_inner<S, D>(
    law_id: &LawId,
    source: &S,
    dict: &LawDictionary,
    detector: &Detector,
    store: &Mutex<D>,
    config: &OrchestratorConfig,
    cancelled: &(dyn Fn() -> bool + Sync),
) -> Result<StatuteStats, CiteError>
where
    S: ArticleSource + Sync,
    D: GraphStore + Send,
{
    let statute = source.get_statute(law_id)?;
    let mut ctx = DocumentContext::new();
    ctx.enter_document(law_id.clone(), statute.title.clone());

    {
        let mut locked = store.lock().expect("graph store mutex poisoned");
        let article_count = statute.articles.iter().filter(|a| !a.is_deleted).count();
        locked.upsert_law_node(law_id, &statute.title, statute.kind, article_count)?;
    }

    let mut citations_detected = 0u64;
    let mut edges_inserted = 0u64;

    for sub_batch in statute.articles.chunks(config.sub_batch_size.max(1)) {
        for article in sub_batch {
            if cancelled() {
                break;
            }
            if article.is_deleted {
                continue;
            }

            let Some(label) = ArticleLabel::parse_kanji(&article.label) else {
                tracing::warn!(law_id = %law_id, article = %article.label, "unparseable article label, skipping article");
                continue;
            };
            ctx.enter_article(label);
            let citations = detector.detect(&article.text, dict, &mut ctx);
            citations_detected += citations.len() as u64;

            let edges: Vec<CitationEdge> = citations
                .iter()
                .filter_map(|c| citation_to_edge(law_id, &article.label, c))
                .collect();

            if edges.is_empty() {
                continue;
            }

            edges_inserted += insert_with_retry(store, &edges)?;
        }
    }

    Ok(StatuteStats { citations_detected, edges_inserted })
}

/// Translates a resolved citation into a graph edge. Citations with no
/// resolved target (e.g. an unresolved contextual reference) contribute no
/// edge; they still count toward `citations_detected`.
fn citation_to_edge(source_law_id: &LawId, source_article: &str, citation: &Citation) -> Option<CitationEdge> {
    let target_law_id = citation
        .target_law_id
        .clone()
        .unwrap_or_else(|| source_law_id.clone());
    let is_external = citation.target_law_id.as_ref().is_some_and(|id| id != source_law_id);

    Some(CitationEdge::new(
        source_law_id.clone(),
        target_law_id,
        citation.kind,
        source_article,
        citation.target_article_number.clone(),
        &citation.source_text,
        citation.confidence,
        is_external,
    ))
}

/// Inserts `edges`; on a transient graph-store failure, retries once after
/// a short delay, then abandons the batch (logged, not propagated) so one
/// bad statute never aborts the run.
fn insert_with_retry<D: GraphStore>(store: &Mutex<D>, edges: &[CitationEdge]) -> Result<u64, CiteError> {
    let attempt = {
        let mut locked = store.lock().expect("graph store mutex poisoned");
        locked.insert_edges(edges)
    };

    match attempt {
        Ok(n) => Ok(n as u64),
        Err(CiteError::Transient(msg)) => {
            tracing::warn!(error = %msg, "transient graph-store failure, retrying once");
            std::thread::sleep(TRANSIENT_RETRY_DELAY);
            let mut locked = store.lock().expect("graph store mutex poisoned");
            match locked.insert_edges(edges) {
                Ok(n) => Ok(n as u64),
                Err(e) => {
                    tracing::error!(error = %e, "abandoning edge batch after retry");
                    Ok(0)
                }
            }
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citelaw_core::{ArticleRecord, LawKind, StatuteRecord};
    use citelaw_detect::DetectorConfig;
    use citelaw_graph::InMemoryGraphStore;
    use tempfile::tempdir;

    struct FixedSource {
        statutes: Vec<(LawId, StatuteRecord)>,
    }

    impl ArticleSource for FixedSource {
        fn list_current_statutes(&self) -> Result<Vec<LawId>, CiteError> {
            Ok(self.statutes.iter().map(|(id, _)| id.clone()).collect())
        }

        fn get_statute(&self, id: &LawId) -> Result<StatuteRecord, CiteError> {
            self.statutes
                .iter()
                .find(|(i, _)| i == id)
                .map(|(_, s)| s.clone())
                .ok_or_else(|| CiteError::NotFound(id.to_string()))
        }
    }

    fn sample_source() -> FixedSource {
        FixedSource {
            statutes: vec![(
                LawId::new("129AC0000000089"),
                StatuteRecord {
                    title: "民法".into(),
                    law_number: "明治二十九年法律第八十九号".into(),
                    kind: LawKind::Act,
                    articles: vec![ArticleRecord {
                        label: "第一条".into(),
                        text: "私権の享有は、出生に始まる。前条の規定を準用する。".into(),
                        sort_order: 1,
                        is_deleted: false,
                    }],
                },
            )],
        }
    }

    #[test]
    fn run_processes_pending_statutes_and_checkpoints() {
        let source = sample_source();
        let dict = LawDictionary::new();
        let detector = Detector::new(DetectorConfig::default());
        let store = Mutex::new(InMemoryGraphStore::new());
        let dir = tempdir().unwrap();

        let summary = run(
            &source,
            &dict,
            &detector,
            &store,
            dir.path(),
            &OrchestratorConfig::default(),
            &|| false,
            &|_| {},
        )
        .unwrap();

        assert_eq!(summary.counters.statutes_completed, 1);
        assert!(!summary.cancelled);

        let checkpoints = CheckpointStore::new(dir.path());
        let checkpoint = checkpoints.load_latest().unwrap().unwrap();
        assert_eq!(checkpoint.completed_law_ids, vec![LawId::new("129AC0000000089")]);
    }

    #[test]
    fn resume_skips_already_completed_statutes() {
        let source = sample_source();
        let dict = LawDictionary::new();
        let detector = Detector::new(DetectorConfig::default());
        let store = Mutex::new(InMemoryGraphStore::new());
        let dir = tempdir().unwrap();
        let config = OrchestratorConfig::default();

        run(&source, &dict, &detector, &store, dir.path(), &config, &|| false, &|_| {}).unwrap();
        let second = run(&source, &dict, &detector, &store, dir.path(), &config, &|| false, &|_| {}).unwrap();

        assert_eq!(second.counters.statutes_completed, 0);
        assert_eq!(second.batches_completed, 0);
    }

    #[test]
    fn fresh_flag_reprocesses_everything() {
        let source = sample_source();
        let dict = LawDictionary::new();
        let detector = Detector::new(DetectorConfig::default());
        let store = Mutex::new(InMemoryGraphStore::new());
        let dir = tempdir().unwrap();
        let mut config = OrchestratorConfig::default();

        run(&source, &dict, &detector, &store, dir.path(), &config, &|| false, &|_| {}).unwrap();
        config.fresh = true;
        let second = run(&source, &dict, &detector, &store, dir.path(), &config, &|| false, &|_| {}).unwrap();

        assert_eq!(second.counters.statutes_completed, 1);
    }

    #[test]
    fn cancellation_stops_before_the_next_batch() {
        let source = sample_source();
        let dict = LawDictionary::new();
        let detector = Detector::new(DetectorConfig::default());
        let store = Mutex::new(InMemoryGraphStore::new());
        let dir = tempdir().unwrap();

        let summary = run(
            &source,
            &dict,
            &detector,
            &store,
            dir.path(),
            &OrchestratorConfig::default(),
            &|| true,
            &|_| {},
        )
        .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.counters.statutes_completed, 0);
    }
}
