//! pg_dump-style COPY output.

use super::{write_banner, RowSink};
use crate::value::Value;
use std::io::{self, BufWriter, Write};

/// Session settings written once before the first COPY block
const DUMP_HEADER: &str = "\
SET statement_timeout = 0;
SET lock_timeout = 0;
SET idle_in_transaction_session_timeout = 0;
SET client_encoding = 'UTF8';
SET standard_conforming_strings = on;
SELECT pg_catalog.set_config('search_path', '', false);
SET check_function_bodies = false;
SET client_min_messages = warning;
SET row_security = off;
";

pub struct DumpSink<W: Write> {
    writer: BufWriter<W>,
    header_written: bool,
    line: String,
}

impl<W: Write> DumpSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            header_written: false,
            line: String::new(),
        }
    }

    /// Flush and return the inner writer
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write> RowSink for DumpSink<W> {
    fn begin_table(&mut self, table: &str, columns: &[String]) -> io::Result<()> {
        if !self.header_written {
            self.header_written = true;
            writeln!(self.writer, "{}", DUMP_HEADER)?;
        }
        write_banner(&mut self.writer, table)?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "COPY {} ({}) FROM stdin;",
            table,
            columns.join(",")
        )
    }

    fn row(&mut self, values: &[Value]) -> io::Result<()> {
        self.line.clear();
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.line.push('\t');
            }
            self.line.push_str(&value.to_copy_field());
        }
        self.line.push('\n');
        self.writer.write_all(self.line.as_bytes())
    }

    fn end_table(&mut self, _table: &str) -> io::Result<()> {
        writeln!(self.writer, "\\.")?;
        writeln!(self.writer)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_block() {
        let mut sink = DumpSink::new(Vec::new());
        sink.begin_table("users", &["id".into(), "name".into()]).unwrap();
        sink.row(&[Value::Int(1), Value::from("a\tb")]).unwrap();
        sink.row(&[Value::Int(2), Value::Null]).unwrap();
        sink.end_table("users").unwrap();
        sink.finish().unwrap();

        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert!(out.starts_with("SET statement_timeout = 0;\n"));
        assert!(out.contains("SELECT pg_catalog.set_config('search_path', '', false);\n"));
        assert!(out.contains(
            "-- data for [users]\n--\n\nCOPY users (id,name) FROM stdin;\n1\ta\\tb\n2\t\\N\n\\.\n\n"
        ));
    }

    #[test]
    fn test_header_written_once() {
        let mut sink = DumpSink::new(Vec::new());
        for table in ["a", "b"] {
            sink.begin_table(table, &["x".into()]).unwrap();
            sink.end_table(table).unwrap();
        }
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(out.matches("SET row_security = off;").count(), 1);
        assert_eq!(out.matches("FROM stdin;").count(), 2);
    }
}
