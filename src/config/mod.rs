//! YAML override file for generator configuration.
//!
//! Layout:
//!
//! ```yaml
//! tables:
//!   users:
//!     __numrows: 20
//!     __unique:
//!       - email
//!       - first_name, last_name
//!     email:
//!       generator: email
//!       unique: true
//!     org_id:
//!       generator: foreign
//!       key: orgs.id
//! ```

use crate::error::GenerateError;
use crate::generator::GENERATOR_KEY;
use crate::schema::{GeneratorOptions, TableSpec};
use serde::{Deserialize, Serialize};
use serde_yaml_ng::{Mapping, Value as YamlValue};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Table-level key: row count
pub const NUMROWS_KEY: &str = "__numrows";
/// Table-level key: extra unique groups
pub const UNIQUE_GROUPS_KEY: &str = "__unique";
/// Column keys that describe the schema and are never taken from the file
pub const RESERVED_COLUMN_KEYS: &[&str] = &["type", "name", "has_default", "is_null"];

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawConfig {
    #[serde(default)]
    tables: Mapping,
}

/// Overrides for one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableOverride {
    pub name: String,
    pub numrows: Option<usize>,
    pub unique: Vec<Vec<String>>,
    /// Column name and its option bag, in file order
    pub columns: Vec<(String, GeneratorOptions)>,
}

/// Parsed override file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideConfig {
    pub tables: Vec<TableOverride>,
}

impl OverrideConfig {
    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self, GenerateError> {
        let content = fs::read_to_string(path).map_err(|source| GenerateError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content).map_err(|source| GenerateError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse from a YAML string. Entries of the wrong shape are logged and
    /// skipped.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml_ng::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig = serde_yaml_ng::from_str(content)?;

        let mut tables = Vec::with_capacity(raw.tables.len());
        for (name, body) in &raw.tables {
            let Some(name) = yaml_key(name) else {
                warn!("ignoring table entry with non-string name: {:?}", name);
                continue;
            };
            match body {
                YamlValue::Mapping(body) => tables.push(parse_table(name, body)),
                YamlValue::Null => tables.push(TableOverride {
                    name,
                    ..Default::default()
                }),
                other => warn!("ignoring table {}: expected a mapping, got {:?}", name, other),
            }
        }
        Ok(Self { tables })
    }

    pub fn get_table(&self, name: &str) -> Option<&TableOverride> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Apply the overrides to `tables`.
    ///
    /// A column entry naming the generator the column already has augments
    /// its options; a different generator replaces them. Unique groups are
    /// added only when not already present, so merging twice is a no-op.
    pub fn merge_into(&self, tables: &mut [TableSpec]) {
        for table_override in &self.tables {
            let Some(table) = tables.iter_mut().find(|t| t.is_named(&table_override.name)) else {
                warn!("config names unknown table {}", table_override.name);
                continue;
            };

            if let Some(n) = table_override.numrows {
                table.row_count = Some(n);
            }

            for (column_name, options) in &table_override.columns {
                let Some(column) = table.get_column_mut(column_name) else {
                    warn!(
                        "config names unknown column {}.{}",
                        table_override.name, column_name
                    );
                    continue;
                };

                if let Some(generator) = options.get(GENERATOR_KEY).and_then(|v| v.as_str()) {
                    if column.generator.as_deref() != Some(generator) {
                        column.options.clear();
                        column.generator = Some(generator.to_string());
                    }
                }
                for (key, value) in options {
                    if key != GENERATOR_KEY {
                        column.options.insert(key.clone(), value.clone());
                    }
                }
            }

            for group in &table_override.unique {
                if table.add_unique_group(group.clone()) {
                    debug!("added unique group ({}) to {}", group.join(", "), table.name);
                }
            }
        }
    }

    /// Snapshot the effective configuration of `tables`, carrying over
    /// extra unique groups from `previous`
    pub fn from_tables(tables: &[TableSpec], previous: Option<&OverrideConfig>) -> Self {
        let tables = tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .filter_map(|c| {
                        let generator = c.generator.as_ref()?;
                        let mut options = c.options.clone();
                        options.insert(GENERATOR_KEY.to_string(), YamlValue::from(generator.as_str()));
                        Some((c.name.clone(), options))
                    })
                    .collect();
                let unique = previous
                    .and_then(|p| p.get_table(&table.name))
                    .map(|t| t.unique.clone())
                    .unwrap_or_default();
                TableOverride {
                    name: table.name.clone(),
                    numrows: table.row_count,
                    unique,
                    columns,
                }
            })
            .collect();
        Self { tables }
    }

    /// Render as YAML. Within a column, `generator` comes first.
    pub fn to_yaml_string(&self) -> Result<String, serde_yaml_ng::Error> {
        let mut tables = Mapping::new();
        for table in &self.tables {
            let mut body = Mapping::new();
            if let Some(n) = table.numrows {
                body.insert(NUMROWS_KEY.into(), YamlValue::from(n as u64));
            }
            if !table.unique.is_empty() {
                let groups = table
                    .unique
                    .iter()
                    .map(|g| YamlValue::from(g.join(", ")))
                    .collect();
                body.insert(UNIQUE_GROUPS_KEY.into(), YamlValue::Sequence(groups));
            }
            for (name, options) in &table.columns {
                let mut column = Mapping::new();
                if let Some(generator) = options.get(GENERATOR_KEY) {
                    column.insert(GENERATOR_KEY.into(), generator.clone());
                }
                for (key, value) in options {
                    if key != GENERATOR_KEY {
                        column.insert(key.as_str().into(), value.clone());
                    }
                }
                body.insert(name.as_str().into(), YamlValue::Mapping(column));
            }
            tables.insert(table.name.as_str().into(), YamlValue::Mapping(body));
        }
        serde_yaml_ng::to_string(&RawConfig { tables })
    }

    /// Write to `path`, or to stdout when no path is given
    pub fn store(&self, path: Option<&Path>) -> anyhow::Result<()> {
        let out = self.to_yaml_string()?;
        match path {
            Some(path) => fs::write(path, out)?,
            None => print!("{}", out),
        }
        Ok(())
    }
}

fn yaml_key(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_table(name: String, body: &Mapping) -> TableOverride {
    let mut table = TableOverride {
        name,
        ..Default::default()
    };

    for (key, value) in body {
        let Some(key) = yaml_key(key) else {
            warn!("ignoring non-string key in table {}: {:?}", table.name, key);
            continue;
        };
        match key.as_str() {
            NUMROWS_KEY => match value.as_u64() {
                Some(n) => table.numrows = Some(n as usize),
                None => warn!("{}.{} must be a non-negative integer", table.name, NUMROWS_KEY),
            },
            UNIQUE_GROUPS_KEY => table.unique = parse_unique_groups(&table.name, value),
            _ => match value {
                YamlValue::Mapping(column) => {
                    let options = column
                        .iter()
                        .filter_map(|(k, v)| yaml_key(k).map(|k| (k, v.clone())))
                        .filter(|(k, _)| !RESERVED_COLUMN_KEYS.contains(&k.as_str()))
                        .collect();
                    table.columns.push((key, options));
                }
                other => warn!(
                    "ignoring column {}.{}: expected a mapping, got {:?}",
                    table.name, key, other
                ),
            },
        }
    }
    table
}

/// Groups are either `"a, b"` strings or `[a, b]` lists
fn parse_unique_groups(table: &str, value: &YamlValue) -> Vec<Vec<String>> {
    let Some(items) = value.as_sequence() else {
        warn!("{}.{} must be a list", table, UNIQUE_GROUPS_KEY);
        return Vec::new();
    };

    let mut groups = Vec::new();
    for item in items {
        let group: Vec<String> = match item {
            YamlValue::String(s) => s
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            YamlValue::Sequence(cols) => cols.iter().filter_map(yaml_key).collect(),
            other => {
                warn!("ignoring unique group in {}: {:?}", table, other);
                continue;
            }
        };
        if !group.is_empty() {
            groups.push(group);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;

    const SAMPLE: &str = r#"
tables:
  users:
    __numrows: 20
    __unique:
      - email
      - first_name, last_name
      - [org_id, slug]
    email:
      generator: email
      unique: true
      type: text
    age:
      min: 18
"#;

    #[test]
    fn test_parse() {
        let config = OverrideConfig::from_yaml_str(SAMPLE).unwrap();
        let users = config.get_table("users").unwrap();
        assert_eq!(users.numrows, Some(20));
        assert_eq!(
            users.unique,
            vec![
                vec!["email".to_string()],
                vec!["first_name".to_string(), "last_name".to_string()],
                vec!["org_id".to_string(), "slug".to_string()],
            ]
        );
        let (name, email) = &users.columns[0];
        assert_eq!(name, "email");
        assert!(email.get("type").is_none());
        assert_eq!(email.get("unique"), Some(&YamlValue::Bool(true)));
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(OverrideConfig::from_yaml_str("").unwrap(), OverrideConfig::default());
        assert_eq!(
            OverrideConfig::from_yaml_str("other: 1").unwrap(),
            OverrideConfig::default()
        );
    }

    #[test]
    fn test_merge_same_kind_augments_other_kind_replaces() {
        let mut tables = vec![TableSpec::new("users")
            .column(
                ColumnSpec::new("age", "int")
                    .generator("integer")
                    .option("max", 99),
            )
            .column(
                ColumnSpec::new("nick", "text")
                    .generator("string")
                    .option("max", 32),
            )];
        let config = OverrideConfig::from_yaml_str(
            "tables:\n  users:\n    age:\n      generator: integer\n      min: 18\n    nick:\n      generator: username\n",
        )
        .unwrap();
        config.merge_into(&mut tables);

        let age = tables[0].get_column("age").unwrap();
        assert_eq!(age.options.get("min"), Some(&YamlValue::from(18)));
        assert_eq!(age.options.get("max"), Some(&YamlValue::from(99)));

        let nick = tables[0].get_column("nick").unwrap();
        assert_eq!(nick.generator.as_deref(), Some("username"));
        assert!(nick.options.is_empty());
    }

    #[test]
    fn test_round_trip_through_yaml() {
        let config = OverrideConfig::from_yaml_str(SAMPLE).unwrap();
        let text = config.to_yaml_string().unwrap();
        assert_eq!(OverrideConfig::from_yaml_str(&text).unwrap().tables[0].unique, config.tables[0].unique);
        assert!(text.contains("__numrows: 20"));
    }
}
