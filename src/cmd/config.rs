//! Config command - write the effective generator configuration.

use super::input;
use crate::config::OverrideConfig;
use crate::logging;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(
    schema: Option<PathBuf>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    stdout: bool,
    verbose: bool,
) -> Result<()> {
    logging::init(verbose);

    let loaded = input::load(schema.as_deref(), config.as_deref())?;
    let snapshot = OverrideConfig::from_tables(&loaded.tables, loaded.overrides.as_ref());

    let target = if stdout { None } else { output.or(config) };
    snapshot.store(target.as_deref())?;

    if let Some(path) = &target {
        eprintln!(
            "Wrote configuration for {} tables to {}",
            snapshot.tables.len(),
            path.display()
        );
    }
    Ok(())
}
