//! Output sinks for generated rows.
//!
//! The engine drives a sink with `begin_table`, `row` (once per committed
//! row) and `end_table`. Sinks own the formatting; the engine never writes
//! text itself.

mod dump;
mod insert;

pub use dump::DumpSink;
pub use insert::InsertSink;

use crate::value::Value;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Receiver of generated tables and rows
pub trait RowSink {
    fn begin_table(&mut self, table: &str, columns: &[String]) -> io::Result<()>;
    fn row(&mut self, values: &[Value]) -> io::Result<()>;
    fn end_table(&mut self, table: &str) -> io::Result<()>;

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Discards everything; used for tables outside the output filter
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RowSink for NullSink {
    fn begin_table(&mut self, _table: &str, _columns: &[String]) -> io::Result<()> {
        Ok(())
    }

    fn row(&mut self, _values: &[Value]) -> io::Result<()> {
        Ok(())
    }

    fn end_table(&mut self, _table: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One INSERT statement per row
    Insert,
    /// COPY blocks, as written by pg_dump
    #[default]
    Dump,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "insert" | "sql" => Ok(OutputFormat::Insert),
            "dump" | "copy" => Ok(OutputFormat::Dump),
            _ => Err(format!(
                "Unknown output format: {}. Valid options: insert, dump",
                s
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Insert => write!(f, "insert"),
            OutputFormat::Dump => write!(f, "dump"),
        }
    }
}

/// Create the sink for `format` writing to `writer`
pub fn create_sink<'a, W: Write + 'a>(format: OutputFormat, writer: W) -> Box<dyn RowSink + 'a> {
    match format {
        OutputFormat::Insert => Box::new(InsertSink::new(writer)),
        OutputFormat::Dump => Box::new(DumpSink::new(writer)),
    }
}

/// Write the three-line `-- data for [table]` banner
fn write_banner<W: Write>(writer: &mut W, table: &str) -> io::Result<()> {
    writeln!(writer, "--")?;
    writeln!(writer, "-- data for [{}]", table)?;
    writeln!(writer, "--")
}
