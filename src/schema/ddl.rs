//! PostgreSQL DDL reading for schema extraction.
//!
//! Reads CREATE TABLE, ALTER TABLE and CREATE UNIQUE INDEX statements to extract:
//! - Column definitions with declared types and modifiers
//! - Nullability and DEFAULT markers
//! - Primary key and unique constraints (as unique groups)
//! - Foreign key constraints

use super::{ColumnSpec, ForeignKeySpec, TableSpec};
use ahash::AHashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Identifier, optionally double-quoted
const IDENT: &str = r#"(?:"[^"]+"|[A-Za-z_][\w$]*)"#;

/// Regex to extract the (possibly schema-qualified) table name from CREATE TABLE
static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*CREATE\s+(?:(?:GLOBAL|LOCAL)\s+)?(?:(?:TEMP|TEMPORARY|UNLOGGED)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?({id}(?:\s*\.\s*{id})?)",
        id = IDENT
    ))
    .unwrap()
});

/// Regex to extract the table name from ALTER TABLE
static ALTER_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?({id}(?:\s*\.\s*{id})?)",
        id = IDENT
    ))
    .unwrap()
});

/// Regex for CREATE UNIQUE INDEX
static CREATE_UNIQUE_INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*CREATE\s+UNIQUE\s+INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?(?:{id}\s+)?ON\s+(?:ONLY\s+)?({id}(?:\s*\.\s*{id})?)\s*(?:USING\s+\w+\s*)?\(([^)]*)\)",
        id = IDENT
    ))
    .unwrap()
});

/// Regex for CREATE INDEX without UNIQUE (ignored, logged)
static CREATE_INDEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*CREATE\s+INDEX\b").unwrap());

/// Regex for a table-level PRIMARY KEY constraint
static PRIMARY_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)PRIMARY\s+KEY\s*\(([^)]+)\)").unwrap());

/// Regex for a table-level UNIQUE constraint
static UNIQUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bUNIQUE\s*(?:NULLS\s+(?:NOT\s+)?DISTINCT\s*)?\(([^)]+)\)").unwrap()
});

/// Regex for a table-level FOREIGN KEY constraint
static FOREIGN_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)FOREIGN\s+KEY\s*\(([^)]+)\)\s*REFERENCES\s+({id}(?:\s*\.\s*{id})?)\s*(?:\(([^)]+)\))?",
        id = IDENT
    ))
    .unwrap()
});

/// Regex for an inline REFERENCES clause on a column
static INLINE_REFERENCES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\bREFERENCES\s+({id}(?:\s*\.\s*{id})?)\s*(?:\(\s*({id})\s*\))?",
        id = IDENT
    ))
    .unwrap()
});

/// Regex for column name followed by its type
static COLUMN_DEF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*({id})\s+((?:{id}\s*\.\s*)?[A-Za-z_]\w*(?:\s+(?:varying|precision))?)\s*(?:\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\))?\s*(\[\s*\d*\s*\])?\s*(with(?:out)?\s+time\s+zone)?",
        id = IDENT
    ))
    .unwrap()
});

static NOT_NULL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b").unwrap());

static DEFAULT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bDEFAULT\b").unwrap());

static INLINE_PRIMARY_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").unwrap());

static INLINE_UNIQUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bUNIQUE\b").unwrap());

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Error reading the schema, with a best-effort source location
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error parsing schema at line {line}: {message}\n>>> {source_line}")]
pub struct SchemaParseError {
    /// 1-based line number
    pub line: usize,
    /// The text of that line
    pub source_line: String,
    pub message: String,
}

impl SchemaParseError {
    fn at(sql: &str, offset: usize, message: impl Into<String>) -> Self {
        let mut offset = offset.min(sql.len());
        while !sql.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = sql[..offset].matches('\n').count() + 1;
        let start = sql[..offset].rfind('\n').map(|p| p + 1).unwrap_or(0);
        let end = sql[offset..]
            .find('\n')
            .map(|p| p + offset)
            .unwrap_or(sql.len());
        Self {
            line,
            source_line: sql[start..end].trim().to_string(),
            message: message.into(),
        }
    }
}

/// Accumulates tables while statements are read
#[derive(Debug, Default)]
pub struct SchemaReader {
    tables: Vec<TableSpec>,
    primary_keys: AHashMap<String, Vec<String>>,
}

impl SchemaReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every statement of `sql`
    pub fn read(&mut self, sql: &str) -> Result<(), SchemaParseError> {
        for (offset, stmt) in split_statements(sql) {
            self.read_statement(sql, offset, &stmt)?;
        }
        Ok(())
    }

    fn read_statement(
        &mut self,
        sql: &str,
        offset: usize,
        stmt: &str,
    ) -> Result<(), SchemaParseError> {
        if let Some(caps) = CREATE_TABLE_RE.captures(stmt) {
            let (schema, name) = split_qualified(&caps[1]);
            let body = extract_table_body(stmt)
                .ok_or_else(|| SchemaParseError::at(sql, offset, "missing table body"))?;
            let mut table = TableSpec::new(name);
            table.schema = schema;
            let body_offset = offset + stmt.find(body.as_str()).unwrap_or(0);
            self.read_table_body(sql, body_offset, &body, &mut table)?;
            debug!(table = %table.qualified_name(), columns = table.columns.len(), "read table");
            self.tables.push(table);
        } else if let Some(caps) = ALTER_TABLE_RE.captures(stmt) {
            let (_, name) = split_qualified(&caps[1]);
            let rest = &stmt[caps.get(0).map(|m| m.end()).unwrap_or(0)..];
            match self.tables.iter_mut().find(|t| t.name == name) {
                Some(table) => {
                    if let Some(pk) = read_constraint(rest, table) {
                        self.primary_keys.insert(name, pk);
                    }
                }
                None => debug!(table = %name, "ALTER TABLE for unknown table, skipping"),
            }
        } else if let Some(caps) = CREATE_UNIQUE_INDEX_RE.captures(stmt) {
            let (_, name) = split_qualified(&caps[1]);
            if caps[2].contains('(') {
                debug!(table = %name, "expression index, skipping");
                return Ok(());
            }
            let columns = parse_column_list(&caps[2]);
            match self.tables.iter_mut().find(|t| t.name == name) {
                Some(table) => {
                    table.add_unique_group(columns);
                }
                None => debug!(table = %name, "unique index on unknown table, skipping"),
            }
        } else if CREATE_INDEX_RE.is_match(stmt) {
            debug!("not a unique index, skipping over");
        } else {
            debug!(statement = %first_words(stmt), "not processing");
        }
        Ok(())
    }

    fn read_table_body(
        &mut self,
        sql: &str,
        body_offset: usize,
        body: &str,
        table: &mut TableSpec,
    ) -> Result<(), SchemaParseError> {
        let mut cursor = 0;
        for part in split_table_body(body) {
            if part.is_empty() {
                continue;
            }
            let part_at = body[cursor..]
                .find(part.as_str())
                .map(|p| cursor + p)
                .unwrap_or(cursor);
            cursor = (part_at + part.len()).min(body.len());
            if is_constraint(&part) {
                if let Some(pk) = read_constraint(&part, table) {
                    self.primary_keys.insert(table.name.clone(), pk);
                }
                continue;
            }
            let column = parse_column_def(&part).ok_or_else(|| {
                let offset = body_offset + part_at;
                SchemaParseError::at(sql, offset, "cannot read column definition")
            })?;

            if INLINE_PRIMARY_KEY_RE.is_match(&part) {
                self.primary_keys
                    .insert(table.name.clone(), vec![column.name.clone()]);
                table.add_unique_group(vec![column.name.clone()]);
            } else if INLINE_UNIQUE_RE.is_match(&part) {
                table.add_unique_group(vec![column.name.clone()]);
            }
            if let Some(caps) = INLINE_REFERENCES_RE.captures(&part) {
                let (_, ref_table) = split_qualified(&caps[1]);
                table.foreign_keys.push(ForeignKeySpec {
                    columns: vec![column.name.clone()],
                    referenced_table: ref_table,
                    referenced_columns: caps
                        .get(2)
                        .map(|m| vec![ident(m.as_str())])
                        .unwrap_or_default(),
                });
            }
            table.columns.push(column);
        }
        Ok(())
    }

    /// Finish reading: foreign keys without explicit referenced columns
    /// point at the referenced table's primary key.
    pub fn finish(mut self) -> Vec<TableSpec> {
        for table in &mut self.tables {
            for fk in &mut table.foreign_keys {
                if fk.referenced_columns.is_empty() {
                    if let Some(pk) = self.primary_keys.get(&fk.referenced_table) {
                        fk.referenced_columns = pk.clone();
                    }
                }
            }
        }
        self.tables
    }
}

/// Read all tables from a DDL script
pub fn read_schema(sql: &str) -> Result<Vec<TableSpec>, SchemaParseError> {
    let mut reader = SchemaReader::new();
    reader.read(sql)?;
    Ok(reader.finish())
}

/// Apply one constraint clause (table-level or from ALTER TABLE).
///
/// Returns the primary key columns if the clause declares one.
fn read_constraint(clause: &str, table: &mut TableSpec) -> Option<Vec<String>> {
    let mut primary_key = None;
    if let Some(caps) = PRIMARY_KEY_RE.captures(clause) {
        let cols = parse_column_list(&caps[1]);
        table.add_unique_group(cols.clone());
        primary_key = Some(cols);
    }
    if let Some(caps) = UNIQUE_RE.captures(clause) {
        table.add_unique_group(parse_column_list(&caps[1]));
    }
    for caps in FOREIGN_KEY_RE.captures_iter(clause) {
        let (_, ref_table) = split_qualified(&caps[2]);
        table.foreign_keys.push(ForeignKeySpec {
            columns: parse_column_list(&caps[1]),
            referenced_table: ref_table,
            referenced_columns: caps
                .get(3)
                .map(|m| parse_column_list(m.as_str()))
                .unwrap_or_default(),
        });
    }
    primary_key
}

fn is_constraint(part: &str) -> bool {
    let upper = part.trim_start().to_uppercase();
    ["CONSTRAINT", "PRIMARY KEY", "FOREIGN KEY", "UNIQUE", "CHECK", "EXCLUDE", "LIKE"]
        .iter()
        .any(|kw| {
            upper.starts_with(kw)
                && !upper[kw.len()..].starts_with(|c: char| c.is_alphanumeric() || c == '_')
        })
}

/// Parse a column definition
fn parse_column_def(def: &str) -> Option<ColumnSpec> {
    let caps = COLUMN_DEF_RE.captures(def)?;
    let name = ident(caps.get(1)?.as_str());

    let mut type_name = WHITESPACE_RE
        .replace_all(caps.get(2)?.as_str(), " ")
        .to_lowercase();
    if let Some(stripped) = type_name.strip_prefix("pg_catalog.") {
        type_name = stripped.to_string();
    }
    type_name = type_name.replace('"', "");
    if let Some(zone) = caps.get(6) {
        type_name.push(' ');
        type_name.push_str(&WHITESPACE_RE.replace_all(zone.as_str(), " ").to_lowercase());
    }
    if caps.get(5).is_some() {
        type_name.push_str("[]");
    }

    let mut column = ColumnSpec::new(name, type_name);
    column.length = caps.get(3).and_then(|m| m.as_str().parse().ok());
    column.scale = caps.get(4).and_then(|m| m.as_str().parse().ok());
    column.nullable = !NOT_NULL_RE.is_match(def) && !INLINE_PRIMARY_KEY_RE.is_match(def);
    column.has_default = DEFAULT_RE.is_match(def);
    Some(column)
}

/// Split `schema.table` into its parts, unquoting each
fn split_qualified(raw: &str) -> (Option<String>, String) {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in raw.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                current.push(ch);
            }
            '.' if !quoted => parts.push(std::mem::take(&mut current)),
            c if c.is_whitespace() && !quoted => {}
            c => current.push(c),
        }
    }
    parts.push(current);

    let name = ident(parts.pop().as_deref().unwrap_or_default());
    let schema = parts.pop().map(|s| ident(&s));
    (schema, name)
}

/// Unquote a double-quoted identifier, or fold an unquoted one to lowercase
fn ident(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        raw[1..raw.len() - 1].to_string()
    } else {
        raw.to_lowercase()
    }
}

/// Parse a comma-separated column list
pub fn parse_column_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|c| {
            // drop ordering / opclass suffixes in index column lists
            let c = c.trim();
            let end = if c.starts_with('"') {
                c[1..].find('"').map(|p| p + 2).unwrap_or(c.len())
            } else {
                c.find(char::is_whitespace).unwrap_or(c.len())
            };
            ident(&c[..end])
        })
        .filter(|c| !c.is_empty())
        .collect()
}

/// Extract the body of a CREATE TABLE statement (between first ( and matching ))
fn extract_table_body(stmt: &str) -> Option<String> {
    let mut depth = 0;
    let mut start = None;
    let mut in_string = false;

    for (i, b) in stmt.bytes().enumerate() {
        if b == b'\'' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }

        if b == b'(' {
            if depth == 0 {
                start = Some(i + 1);
            }
            depth += 1;
        } else if b == b')' {
            depth -= 1;
            if depth == 0 {
                if let Some(s) = start {
                    return Some(stmt[s..i].to_string());
                }
            }
        }
    }

    None
}

/// Split table body by commas, respecting nested parentheses and strings
pub fn split_table_body(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let mut in_string = false;

    for ch in body.chars() {
        if ch == '\'' {
            in_string = !in_string;
            current.push(ch);
            continue;
        }

        if in_string {
            current.push(ch);
            continue;
        }

        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}

/// Split a script into statements, blanking out comments.
///
/// Returns each statement with the byte offset where it starts in `sql`.
/// Comments become the same number of spaces (newlines kept), so a byte
/// position in a statement maps straight back into `sql`.
/// Single-quoted strings, quoted identifiers and dollar-quoted bodies are
/// kept intact.
pub fn split_statements(sql: &str) -> Vec<(usize, String)> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        if b == b'-' && next == Some(b'-') {
            let end = sql[i..].find('\n').map(|p| i + p).unwrap_or(bytes.len());
            blank_out(&mut current, &bytes[i..end]);
            i = end;
            continue;
        }
        if b == b'/' && next == Some(b'*') {
            let end = sql[i + 2..].find("*/").map(|p| i + 2 + p + 2).unwrap_or(bytes.len());
            blank_out(&mut current, &bytes[i..end]);
            i = end;
            continue;
        }

        if start.is_none() && !b.is_ascii_whitespace() && b != b';' {
            start = Some(i);
        }

        let quoted_end = match b {
            b'\'' => sql[i + 1..].find('\'').map(|p| i + 1 + p + 1),
            b'"' => sql[i + 1..].find('"').map(|p| i + 1 + p + 1),
            b'$' => dollar_tag(&sql[i..])
                .and_then(|tag| sql[i + tag.len()..].find(tag).map(|p| i + tag.len() + p + tag.len())),
            _ => None,
        };
        if let Some(end) = quoted_end {
            current.push_str(&sql[i..end]);
            i = end;
            continue;
        }

        if b == b';' {
            if let Some(s) = start.take() {
                statements.push((s, trim_statement(&current)));
            }
            current.clear();
            i += 1;
            continue;
        }

        let ch_len = sql[i..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        current.push_str(&sql[i..i + ch_len]);
        i += ch_len;
    }

    if let Some(s) = start {
        if !current.trim().is_empty() {
            statements.push((s, trim_statement(&current)));
        }
    }

    statements
}

/// Replace comment bytes with spaces, keeping line breaks
fn blank_out(current: &mut String, comment: &[u8]) {
    current.extend(comment.iter().map(|&b| if b == b'\n' { '\n' } else { ' ' }));
}

/// Trim a statement so it begins exactly at its recorded start offset
fn trim_statement(current: &str) -> String {
    current
        .trim_start_matches(|c: char| c.is_ascii_whitespace())
        .trim_end()
        .to_string()
}

/// Match a dollar-quote opening tag (`$$` or `$name$`) at the start of `s`
fn dollar_tag(s: &str) -> Option<&str> {
    let rest = s.get(1..)?;
    let end = rest.find('$')?;
    let tag = &rest[..end];
    if tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !tag.starts_with(|c: char| c.is_ascii_digit())
    {
        Some(&s[..end + 2])
    } else {
        None
    }
}

fn first_words(stmt: &str) -> String {
    stmt.split_whitespace().take(3).collect::<Vec<_>>().join(" ")
}
