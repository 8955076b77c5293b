//! Order command - print the table generation order.

use super::input;
use crate::generator::resolve;
use crate::logging;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(schema: Option<PathBuf>, config: Option<PathBuf>, verbose: bool) -> Result<()> {
    logging::init(verbose);

    let mut loaded = input::load(schema.as_deref(), config.as_deref())?;
    if loaded.tables.is_empty() {
        eprintln!("No tables found.");
        return Ok(());
    }

    let resolution = resolve(&mut loaded.tables)?;
    let order = resolution.graph.safe_order()?;

    for idx in order {
        let table = &loaded.tables[idx];
        let deps: Vec<&str> = resolution
            .graph
            .dependencies(idx)
            .iter()
            .filter_map(|&d| resolution.graph.table_name(d))
            .collect();
        if deps.is_empty() || !verbose {
            println!("{}", table.qualified_name());
        } else {
            println!("{}  <- {}", table.qualified_name(), deps.join(", "));
        }
    }
    Ok(())
}
