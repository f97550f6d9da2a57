use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use patchpad_config::EngineConfig;
use patchpad_core::Engine;

use crate::review::Selection;

mod review;

/// Stage, review and apply proposed edits to a text document.
#[derive(Parser, Debug)]
#[command(name = "patchpad", version, about)]
struct Cli {
    /// Document to patch.
    document: PathBuf,

    /// JSON proposal message: `{ "operations": [...] }`.
    proposals: PathBuf,

    /// Accept the pending diff with this id (repeatable). Ids count from 0
    /// in message order, skipping rejected elements. Accepted diffs commit
    /// together and every other diff is rejected.
    #[arg(long = "accept", value_name = "ID")]
    accept: Vec<u64>,

    /// Accept every pending diff in a single commit.
    #[arg(long, conflicts_with = "accept")]
    accept_all: bool,

    /// Print the pending diffs and exit without applying anything.
    #[arg(long)]
    list: bool,

    /// Where to write the patched document. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file. Defaults to `patchpad.json` next to the executable.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(EngineConfig::config_path);
    let config = EngineConfig::load_or_create(&config_path);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .init();

    tracing::info!("Starting patchpad");

    let text = std::fs::read_to_string(&cli.document)
        .with_context(|| format!("Failed to read document {}", cli.document.display()))?;
    let message = std::fs::read_to_string(&cli.proposals)
        .with_context(|| format!("Failed to read proposals {}", cli.proposals.display()))?;

    let mut engine = Engine::new(&text, &config);
    let intake = engine
        .receive_proposal_json(&message)
        .context("Failed to parse proposal message")?;
    for rejected in &intake.rejected {
        tracing::warn!("Operation #{} rejected: {}", rejected.index, rejected.error);
    }
    if let Some(applied) = &intake.applied {
        tracing::info!(
            "Auto-committed {} operations ({} conflicts)",
            applied.applied.len(),
            applied.conflict_count()
        );
    }

    if cli.list {
        for diff in engine.overlay().pending() {
            let op = &diff.operation;
            println!(
                "{}\t{}\t{}..{}\t{:?}",
                diff.id.0, op.op_type, op.start, op.end, op.text
            );
        }
        return Ok(());
    }

    let selection = Selection::from_flags(cli.accept_all, &cli.accept);
    let decisions = review::apply(&mut engine, &selection);
    for id in &decisions.unknown {
        tracing::warn!("No pending diff {id}");
    }
    for id in decisions.accepted.conflicted_ids() {
        tracing::warn!("{id} skipped: document changed under it");
    }
    if !decisions.rejected.is_empty() {
        tracing::info!("Rejected {} diffs", decisions.rejected.len());
    }

    let result = engine.text();
    match &cli.output {
        Some(path) => std::fs::write(path, &result)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{result}"),
    }

    Ok(())
}
