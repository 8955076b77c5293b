//! Schema and config loading shared by the subcommands.

use crate::config::OverrideConfig;
use crate::generator::apply_defaults;
use crate::schema::{read_schema, TableSpec};
use anyhow::{bail, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Tables with defaults and overrides applied, plus the overrides as loaded
pub struct LoadedInput {
    pub tables: Vec<TableSpec>,
    pub overrides: Option<OverrideConfig>,
}

/// Read the schema and merge the override file.
///
/// Only a missing schema *and* config is an error. An unreadable or
/// unparsable schema is logged and yields no tables; a config path that
/// does not exist is logged and ignored.
pub fn load(schema: Option<&Path>, config: Option<&Path>) -> Result<LoadedInput> {
    if schema.is_none() && config.is_none() {
        bail!("need to specify either a schema (--schema) or a config file (--config)");
    }

    let mut tables = match schema {
        Some(path) => read_tables(path),
        None => Vec::new(),
    };
    info!("{} tables read from schema", tables.len());

    apply_defaults(&mut tables);

    let overrides = match config {
        Some(path) if path.exists() => Some(OverrideConfig::load(path)?),
        Some(path) => {
            warn!("config file not found: {}", path.display());
            None
        }
        None => None,
    };

    if let Some(overrides) = &overrides {
        overrides.merge_into(&mut tables);
    }

    Ok(LoadedInput { tables, overrides })
}

fn read_tables(path: &Path) -> Vec<TableSpec> {
    let sql = match fs::read_to_string(path) {
        Ok(sql) => sql,
        Err(e) => {
            error!("unable to read schema {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    match read_schema(&sql) {
        Ok(tables) => tables,
        Err(e) => {
            error!("{}: {}", path.display(), e);
            Vec::new()
        }
    }
}
