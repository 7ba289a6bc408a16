//! The clap-derive command surface: `detect`, `build-graph`, `impact`,
//! `build-dictionary`, plus shell-completion generation.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "citelaw", author, version, about = "Citation detection and impact analysis for Japanese statutes")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all but error-level logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format for command results
    #[arg(long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect citations in a single article's text and print them.
    Detect {
        /// The article text to scan, given inline.
        #[arg(long, conflicts_with = "article")]
        text: Option<String>,
        /// Path to a UTF-8 text file holding one article's body, as an
        /// alternative to `--text` for longer inputs.
        #[arg(long, conflicts_with = "text")]
        article: Option<String>,
        /// Path to the dictionary source CSV.
        #[arg(long)]
        dictionary: String,
        /// Statute id the text belongs to, for relative-citation resolution.
        /// Omit to detect with no surrounding-law context.
        #[arg(long)]
        law_id: Option<String>,
        /// Statute title, for same-law mention tracking. Omit to detect with
        /// no surrounding-law context.
        #[arg(long)]
        law_name: Option<String>,
        /// Bare kanji article label, e.g. `一` or `十二の三`. Omit to detect
        /// with no current-article context.
        #[arg(long)]
        article_label: Option<String>,
    },
    /// Run citation detection over a corpus of statute JSON files and
    /// populate the citation graph, checkpointing progress as it goes.
    BuildGraph {
        /// Directory of `<law_id>.json` statute files.
        #[arg(long)]
        statutes: String,
        /// Path to the dictionary source CSV.
        #[arg(long)]
        dictionary: String,
        /// Checkpoint directory; defaults to `CITELAW_CHECKPOINT_DIR` or `.citelaw/checkpoints`.
        #[arg(long)]
        checkpoint_dir: Option<String>,
        /// Ignore any existing checkpoint and reprocess every statute.
        #[arg(long)]
        fresh: bool,
        /// Number of statutes processed per checkpointed batch.
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Rebuild the citation graph from a corpus and report the statutes
    /// whose articles would be affected by amending one article.
    Impact {
        /// Directory of `<law_id>.json` statute files.
        #[arg(long)]
        statutes: String,
        /// Path to the dictionary source CSV.
        #[arg(long)]
        dictionary: String,
        /// The statute id of the amended article.
        #[arg(long)]
        law_id: String,
        /// The amended article's bare kanji label.
        #[arg(long)]
        article_label: String,
        /// Maximum traversal depth (1-5).
        #[arg(long, default_value_t = 3)]
        depth: u8,
        /// Minimum edge confidence to follow during traversal.
        #[arg(long, default_value_t = 0.5)]
        min_confidence: f64,
        /// Expand beyond direct dependents to transitive ones.
        #[arg(long)]
        include_indirect: bool,
    },
    /// Build the dictionary index from a source CSV, report load statistics
    /// and any abbreviation conflicts, and write the built index to a
    /// read-only JSON artifact.
    BuildDictionary {
        /// Path to the dictionary source CSV.
        #[arg(long)]
        source: String,
        /// Path the built index is written to.
        #[arg(long, default_value = "dictionary.json")]
        output: String,
    },
    /// Print shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
