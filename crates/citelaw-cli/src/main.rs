use std::path::PathBuf;

use citelaw_cli::cli::Commands;
use citelaw_cli::{Cli, Config};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();
    let config = Config::load();
    init_logging(&cli);

    if let Some(endpoint) = &config.helper_endpoint {
        tracing::warn!(
            endpoint,
            "CITELAW_HELPER_ENDPOINT is set but no enrichment backend is compiled in; \
             residual phrases will be left unresolved"
        );
    }

    let result = match &cli.command {
        Commands::Detect { text, article, dictionary, law_id, law_name, article_label } => {
            citelaw_cli::commands::handle_detect(
                text.as_deref(),
                article.as_deref(),
                dictionary,
                law_id.as_deref(),
                law_name.as_deref(),
                article_label.as_deref(),
                cli.format,
            )
        }
        Commands::BuildDictionary { source, output } => {
            citelaw_cli::commands::handle_build_dictionary(source, output, cli.format)
        }
        Commands::BuildGraph { statutes, dictionary, checkpoint_dir, fresh, batch_size } => {
            let dir = checkpoint_dir.clone().unwrap_or_else(|| config.checkpoint_dir_or_default());
            citelaw_cli::commands::handle_build_graph(
                statutes,
                dictionary,
                PathBuf::from(dir),
                *fresh,
                *batch_size,
                cli.format,
                cli.quiet,
            )
        }
        Commands::Impact { statutes, dictionary, law_id, article_label, depth, min_confidence, include_indirect } => {
            citelaw_cli::commands::handle_impact(
                statutes,
                dictionary,
                law_id,
                article_label,
                *depth,
                *min_confidence,
                *include_indirect,
                cli.format,
                cli.quiet,
            )
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::new(level))
        .init();
}
