//! Schema model consumed by the generator.
//!
//! This module provides:
//! - Table and column records with their generator configuration
//! - A PostgreSQL DDL reader producing those records
//! - The table dependency graph and its emission order

mod ddl;
mod graph;

pub use ddl::*;
pub use graph::*;

use std::collections::BTreeMap;

/// Generator option bag for one column: `generator`, kind parameters and
/// decoration keys, exactly as they appear in the override file.
pub type GeneratorOptions = BTreeMap<String, serde_yaml_ng::Value>;

/// Column definition plus its generator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Column name
    pub name: String,
    /// Declared type, lowercased, without modifiers (e.g. `character varying`)
    pub type_name: String,
    /// First type modifier: length or numeric precision
    pub length: Option<u32>,
    /// Second type modifier: numeric scale
    pub scale: Option<u32>,
    /// Whether NULL is allowed
    pub nullable: bool,
    /// Whether the column declares a DEFAULT
    pub has_default: bool,
    /// Generator kind name (may be unknown until resolution)
    pub generator: Option<String>,
    /// Kind parameters and decorations
    pub options: GeneratorOptions,
    /// Set during resolution when another column draws values from this one
    pub is_foreign_key: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into().to_lowercase(),
            length: None,
            scale: None,
            nullable: true,
            has_default: false,
            generator: None,
            options: GeneratorOptions::new(),
            is_foreign_key: false,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the generator kind
    pub fn generator(mut self, kind: impl Into<String>) -> Self {
        self.generator = Some(kind.into());
        self
    }

    /// Set one option value
    pub fn option(mut self, key: &str, value: impl Into<serde_yaml_ng::Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }
}

/// Foreign key constraint as declared in the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeySpec {
    /// Referencing columns in this table
    pub columns: Vec<String>,
    /// Referenced table name
    pub referenced_table: String,
    /// Referenced columns, positionally matching `columns`
    pub referenced_columns: Vec<String>,
}

/// Table definition plus generation settings
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    /// Table name
    pub name: String,
    /// Optional schema (namespace)
    pub schema: Option<String>,
    /// Column definitions in declaration order
    pub columns: Vec<ColumnSpec>,
    /// Column groups whose combined values must not repeat
    pub unique_groups: Vec<Vec<String>>,
    /// Declared foreign key constraints
    pub foreign_keys: Vec<ForeignKeySpec>,
    /// Row count override from config
    pub row_count: Option<usize>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
            unique_groups: Vec::new(),
            foreign_keys: Vec::new(),
            row_count: None,
        }
    }

    pub fn column(mut self, col: ColumnSpec) -> Self {
        self.columns.push(col);
        self
    }

    pub fn unique<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.add_unique_group(columns.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    pub fn rows(mut self, count: usize) -> Self {
        self.row_count = Some(count);
        self
    }

    /// Name including the schema prefix, if any
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// Whether `name` refers to this table (bare or schema-qualified)
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.qualified_name() == name
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut ColumnSpec> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Add a unique group unless an equivalent group (same columns in any
    /// order) is already present. Returns whether it was added.
    pub fn add_unique_group(&mut self, group: Vec<String>) -> bool {
        if group.is_empty() {
            return false;
        }
        let mut sorted = group.clone();
        sorted.sort();
        let exists = self.unique_groups.iter().any(|g| {
            let mut existing = g.clone();
            existing.sort();
            existing == sorted
        });
        if exists {
            return false;
        }
        self.unique_groups.push(group);
        true
    }
}

/// Find a table by bare or qualified name
pub fn find_table(tables: &[TableSpec], name: &str) -> Option<usize> {
    tables.iter().position(|t| t.is_named(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        let mut table = TableSpec::new("users");
        assert_eq!(table.qualified_name(), "users");
        table.schema = Some("public".to_string());
        assert_eq!(table.qualified_name(), "public.users");
        assert!(table.is_named("users"));
        assert!(table.is_named("public.users"));
        assert!(!table.is_named("other.users"));
    }

    #[test]
    fn test_unique_groups_are_order_insensitive() {
        let mut table = TableSpec::new("t");
        assert!(table.add_unique_group(vec!["a".into(), "b".into()]));
        assert!(!table.add_unique_group(vec!["b".into(), "a".into()]));
        assert!(table.add_unique_group(vec!["a".into()]));
        assert!(!table.add_unique_group(vec![]));
        assert_eq!(table.unique_groups.len(), 2);
    }
}
