//! One INSERT statement per row.

use super::{write_banner, RowSink};
use crate::value::Value;
use std::io::{self, BufWriter, Write};

pub struct InsertSink<W: Write> {
    writer: BufWriter<W>,
    /// `INSERT INTO t (a,b) VALUES (` for the current table
    prefix: String,
}

impl<W: Write> InsertSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            prefix: String::new(),
        }
    }

    /// Flush and return the inner writer
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write> RowSink for InsertSink<W> {
    fn begin_table(&mut self, table: &str, columns: &[String]) -> io::Result<()> {
        self.prefix = format!("INSERT INTO {} ({}) VALUES (", table, columns.join(","));
        write_banner(&mut self.writer, table)
    }

    fn row(&mut self, values: &[Value]) -> io::Result<()> {
        let literals: Vec<String> = values.iter().map(Value::to_sql_literal).collect();
        writeln!(self.writer, "{}{});", self.prefix, literals.join(","))
    }

    fn end_table(&mut self, _table: &str) -> io::Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
