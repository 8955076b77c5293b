//! Generate command - write dummy rows for every table.

use super::input;
use crate::engine::{Engine, GenerationStats, RunOptions};
use crate::generator::GenerationContext;
use crate::logging;
use crate::output::{create_sink, OutputFormat};
use anyhow::Result;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

#[allow(clippy::too_many_arguments)]
pub fn run(
    schema: Option<PathBuf>,
    config: Option<PathBuf>,
    numrows: usize,
    seed: Option<u64>,
    format: String,
    tables: Vec<String>,
    output: Option<PathBuf>,
    no_summary: bool,
    verbose: bool,
) -> Result<()> {
    logging::init(verbose);

    let format: OutputFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let mut loaded = input::load(schema.as_deref(), config.as_deref())?;

    let seed = seed.unwrap_or_else(rand::random);
    info!("seed: {}", seed);

    let options = RunOptions {
        default_rows: numrows,
        table_filter: tables,
    };
    let mut engine = Engine::new(GenerationContext::new(seed), options);

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = create_sink(format, writer);

    let stats = engine.run(&mut loaded.tables, sink.as_mut())?;

    if !no_summary {
        print_summary(&stats, seed);
    }
    Ok(())
}

fn print_summary(stats: &GenerationStats, seed: u64) {
    eprintln!();
    eprintln!("Generation summary (seed {}):", seed);
    for table in &stats.tables {
        let mut notes = Vec::new();
        if table.failed > 0 {
            notes.push(format!("{} failed", table.failed));
        }
        if table.aborted {
            notes.push("stopped early".to_string());
        }
        if !table.emitted {
            notes.push("not emitted".to_string());
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", notes.join(", "))
        };
        eprintln!(
            "  {:<30} {:>8} / {:<8}{}",
            table.name, table.committed, table.requested, notes
        );
    }
    eprintln!(
        "  {} rows emitted, {} rows failed",
        stats.rows_emitted(),
        stats.rows_failed()
    );
    if !stats.skipped_columns.is_empty() {
        eprintln!("  Skipped columns:");
        for skipped in &stats.skipped_columns {
            eprintln!("    {}", skipped);
        }
    }
}
