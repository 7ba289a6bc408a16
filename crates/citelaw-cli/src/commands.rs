//! Command implementations. Each `handle_*` function does the work for
//! one subcommand and owns its own output formatting.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use citelaw_context::DocumentContext;
use citelaw_core::numeral::ArticleLabel;
use citelaw_core::ports::ArticleSource;
use citelaw_core::{ArticleKey, CiteError, Citation, LawId};
use citelaw_detect::{Detector, DetectorConfig};
use citelaw_dict::LawDictionary;
use citelaw_graph::InMemoryGraphStore;
use citelaw_orchestrator::{OrchestratorConfig, RunSummary};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::OutputFormat;
use crate::source::FileArticleSource;

pub fn handle_detect(
    text: Option<&str>,
    article_path: Option<&str>,
    dictionary_path: &str,
    law_id: Option<&str>,
    law_name: Option<&str>,
    article_label: Option<&str>,
    format: OutputFormat,
) -> Result<(), CiteError> {
    let text = match (text, article_path) {
        (Some(t), _) => t.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .map_err(|e| CiteError::Fatal(format!("cannot read article file {path}: {e}")))?,
        (None, None) => {
            return Err(CiteError::InvalidInput("detect requires either --text or --article".to_string()))
        }
    };
    let dict = LawDictionary::load_csv(dictionary_path)?;

    let mut ctx = DocumentContext::new();
    if let (Some(id), Some(name)) = (law_id, law_name) {
        ctx.enter_document(LawId::new(id), name);
    }
    if let Some(label) = article_label {
        let label = ArticleLabel::parse_kanji(label)
            .ok_or_else(|| CiteError::InvalidInput(format!("not a bare kanji article label: {label}")))?;
        ctx.enter_article(label);
    }

    let detector = Detector::new(DetectorConfig::default());
    let citations = detector.detect(&text, &dict, &mut ctx);

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&citations)
                .map_err(|e| CiteError::Fatal(format!("cannot serialize citations: {e}")))?;
            println!("{json}");
        }
        OutputFormat::Table => print_citation_table(&citations),
    }
    Ok(())
}

fn print_citation_table(citations: &[Citation]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["text", "kind", "target law", "target article", "confidence", "method"]);
    for c in citations {
        table.add_row(vec![
            Cell::new(&c.source_text),
            Cell::new(format!("{:?}", c.kind)),
            Cell::new(c.target_law_name.as_deref().or(c.target_law_id.as_ref().map(|id| id.as_str())).unwrap_or("-")),
            Cell::new(c.target_article_number.as_deref().unwrap_or("-")),
            Cell::new(format!("{:.2}", c.confidence)),
            Cell::new(format!("{:?}", c.resolution_method)),
        ]);
    }
    println!("{table}");
}

pub fn handle_build_dictionary(source: &str, output: &str, format: OutputFormat) -> Result<(), CiteError> {
    let dict = LawDictionary::load_csv(source)?;

    let artifact_json = serde_json::to_string_pretty(&dict.to_artifact())
        .map_err(|e| CiteError::Fatal(format!("cannot serialize dictionary artifact: {e}")))?;
    fs::write(output, artifact_json)
        .map_err(|e| CiteError::Fatal(format!("cannot write dictionary artifact to {output}: {e}")))?;

    let stats = dict.stats();
    let conflicts = dict.diagnostics();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "read": stats.read,
                "skipped": stats.skipped,
                "registered": stats.registered,
                "conflicts": conflicts.iter().map(|c| serde_json::json!({
                    "abbreviation": c.abbreviation,
                    "existing_law_id": c.existing_law_id.as_str(),
                    "conflicting_law_id": c.conflicting_law_id.as_str(),
                    "conflicting_title": c.conflicting_title,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&json).expect("json value always serializes"));
        }
        OutputFormat::Table => {
            println!("read: {}, registered: {}, skipped: {}", stats.read, stats.registered, stats.skipped);
            if !conflicts.is_empty() {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["abbreviation", "existing", "conflicting", "conflicting title"]);
                for c in conflicts {
                    table.add_row(vec![
                        c.abbreviation.as_str(),
                        c.existing_law_id.as_str(),
                        c.conflicting_law_id.as_str(),
                        c.conflicting_title.as_str(),
                    ]);
                }
                println!("{table}");
            }
        }
    }
    Ok(())
}

/// Shared setup for `build-graph` and `impact`: a file-backed statute
/// source, a loaded dictionary, and an indicatif bar driven by the
/// orchestrator's `on_statute_done` callback.
fn run_orchestrator(
    statutes_dir: &str,
    dictionary_path: &str,
    checkpoint_dir: PathBuf,
    config: OrchestratorConfig,
    quiet: bool,
) -> Result<(Mutex<InMemoryGraphStore>, RunSummary), CiteError> {
    let source = FileArticleSource::new(statutes_dir);
    let dict = LawDictionary::load_csv(dictionary_path)?;
    let detector = Detector::new(DetectorConfig::default());
    let store = Mutex::new(InMemoryGraphStore::new());

    let total = source.list_current_statutes()?.len() as u64;
    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} statutes ({eta})")
                .expect("static progress template is valid"),
        );
        bar
    };

    let summary = citelaw_orchestrator::run(
        &source,
        &dict,
        &detector,
        &store,
        &checkpoint_dir,
        &config,
        &|| false,
        &|_law_id| bar.inc(1),
    )?;
    bar.finish_and_clear();

    Ok((store, summary))
}

pub fn handle_build_graph(
    statutes_dir: &str,
    dictionary_path: &str,
    checkpoint_dir: PathBuf,
    fresh: bool,
    batch_size: Option<usize>,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), CiteError> {
    let mut config = OrchestratorConfig::default();
    config.fresh = fresh;
    if let Some(size) = batch_size {
        config.batch_size = size;
    }

    let (store, summary) = run_orchestrator(statutes_dir, dictionary_path, checkpoint_dir, config, quiet)?;
    let locked = store.lock().expect("graph store mutex poisoned");

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "batches_completed": summary.batches_completed,
                "cancelled": summary.cancelled,
                "statutes_completed": summary.counters.statutes_completed,
                "statutes_skipped": summary.counters.statutes_skipped,
                "citations_detected": summary.counters.citations_detected,
                "edges_inserted": summary.counters.edges_inserted,
                "graph_nodes": locked.node_count(),
                "graph_edges": locked.edge_count(),
            });
            println!("{}", serde_json::to_string_pretty(&json).expect("json value always serializes"));
        }
        OutputFormat::Table => {
            println!(
                "statutes: {} completed, {} skipped\ncitations detected: {}\nedges inserted: {}\ngraph: {} nodes, {} edges\nbatches: {}{}",
                summary.counters.statutes_completed,
                summary.counters.statutes_skipped,
                summary.counters.citations_detected,
                summary.counters.edges_inserted,
                locked.node_count(),
                locked.edge_count(),
                summary.batches_completed,
                if summary.cancelled { " (cancelled)" } else { "" },
            );
        }
    }
    Ok(())
}

pub fn handle_impact(
    statutes_dir: &str,
    dictionary_path: &str,
    law_id: &str,
    article_label: &str,
    depth: u8,
    min_confidence: f64,
    include_indirect: bool,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), CiteError> {
    // The graph is rebuilt from scratch for each invocation: the in-memory
    // store has no cross-process persistence, so impact analysis needs the
    // full corpus scanned fresh into a throwaway checkpoint directory.
    let scratch_dir = std::env::temp_dir().join(format!("citelaw-impact-{}", std::process::id()));
    let mut config = OrchestratorConfig::default();
    config.fresh = true;

    let (store, _summary) = run_orchestrator(statutes_dir, dictionary_path, scratch_dir.clone(), config, quiet)?;
    let _ = fs::remove_dir_all(&scratch_dir);

    let locked = store.lock().expect("graph store mutex poisoned");
    let origin = ArticleKey::new(LawId::new(law_id), article_label);
    let results = citelaw_graph::analyze(&*locked, &origin, depth, min_confidence, include_indirect)?;

    match format {
        OutputFormat::Json => {
            let json: Vec<_> = results
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "law_id": r.node.node_id.as_str(),
                        "kind": format!("{:?}", r.node.node_kind),
                        "distance": r.node.min_distance,
                        "path_count": r.node.path_count,
                        "confidence": r.node.confidence,
                        "score": r.score,
                        "bucket": format!("{:?}", r.bucket),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json).expect("json value always serializes"));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["law id", "distance", "path count", "confidence", "score", "bucket"]);
            for r in &results {
                table.add_row(vec![
                    Cell::new(r.node.node_id.as_str()),
                    Cell::new(r.node.min_distance),
                    Cell::new(r.node.path_count),
                    Cell::new(format!("{:.2}", r.node.confidence)),
                    Cell::new(format!("{:.2}", r.score)),
                    Cell::new(format!("{:?}", r.bucket)),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
