//! Error types for resolution and generation.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors: any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("foreign generator on {table}.{column} has no `key` option")]
    MissingForeignKey { table: String, column: String },

    #[error("invalid foreign key spec [{key}] on {table}.{column}: expected table.column")]
    MalformedForeignKey {
        table: String,
        column: String,
        key: String,
    },

    #[error("invalid foreign key spec [{key}]: no such column")]
    UnknownForeignTarget { key: String },

    #[error("circular foreign keys detected starting at {table}.{column}: {}", chain.join(" -> "))]
    CircularForeignKeys {
        table: String,
        column: String,
        chain: Vec<String>,
    },

    #[error("circular dependency between tables: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("topological sort produced {ordered} entries for {expected} tables")]
    OrderMismatch { ordered: usize, expected: usize },

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Non-fatal failure of a single generator invocation.
///
/// `UniqueExhausted` is retryable at the row level, `NoValue` is retryable
/// only once the referenced table has published values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("could not find unique value within {attempts} tries")]
    UniqueExhausted { attempts: usize },

    #[error("no value available for foreign key {key}")]
    NoValue { key: String },
}
