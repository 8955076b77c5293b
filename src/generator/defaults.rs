//! Default generator inference from declared column types.

use super::kinds::{GeneratorKind, FOREIGN_KEY_PARAM};
use crate::schema::{find_table, ColumnSpec, GeneratorOptions, TableSpec};
use serde_yaml_ng::Value as YamlValue;
use tracing::{debug, warn};

fn options(pairs: &[(&str, YamlValue)]) -> GeneratorOptions {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn int_range(max: i64) -> GeneratorOptions {
    options(&[("min", 0.into()), ("max", max.into())])
}

/// Default generator for a column's declared type, if the type is supported
pub fn infer_default(column: &ColumnSpec) -> Option<(GeneratorKind, GeneratorOptions)> {
    let type_name = column.type_name.as_str();
    if type_name.ends_with("[]") {
        return None;
    }

    let inferred = match type_name {
        "smallserial" | "serial" | "bigserial" | "serial2" | "serial4" | "serial8" => (
            GeneratorKind::Sequence,
            options(&[("start", 1.into()), ("step", 1.into())]),
        ),
        "smallint" | "int2" => (GeneratorKind::Integer, int_range(i16::MAX as i64)),
        "integer" | "int" | "int4" => (GeneratorKind::Integer, int_range(i32::MAX as i64)),
        "bigint" | "int8" => (GeneratorKind::Integer, int_range(i64::MAX)),
        "numeric" | "decimal" => match column.length {
            Some(digits) => (
                GeneratorKind::Decimal,
                options(&[
                    ("maxdigits", digits.into()),
                    ("precision", column.scale.unwrap_or(0).into()),
                ]),
            ),
            None => (GeneratorKind::Decimal, GeneratorOptions::new()),
        },
        "real" | "float4" | "double precision" | "float8" | "float" => {
            (GeneratorKind::Decimal, GeneratorOptions::new())
        }
        "money" => (GeneratorKind::Decimal, options(&[("precision", 2.into())])),
        "varchar" | "character varying" => {
            let max = column.length.unwrap_or(16);
            (
                GeneratorKind::String,
                options(&[("min", 1.into()), ("max", max.into())]),
            )
        }
        "char" | "character" | "bpchar" => {
            let len = column.length.unwrap_or(1);
            (
                GeneratorKind::String,
                options(&[("min", len.into()), ("max", len.into())]),
            )
        }
        "text" | "citext" | "name" => (
            GeneratorKind::String,
            options(&[("min", 1.into()), ("max", 32.into())]),
        ),
        "timestamp"
        | "timestamptz"
        | "timestamp with time zone"
        | "timestamp without time zone" => (GeneratorKind::Timestamp, GeneratorOptions::new()),
        "date" => (
            GeneratorKind::Timestamp,
            options(&[("format", "%Y-%m-%d".into())]),
        ),
        "time" | "timetz" | "time with time zone" | "time without time zone" => (
            GeneratorKind::Timestamp,
            options(&[("format", "%H:%M:%S".into())]),
        ),
        "boolean" | "bool" => (GeneratorKind::Boolean, GeneratorOptions::new()),
        "uuid" => (GeneratorKind::Uuid, GeneratorOptions::new()),
        "inet" | "cidr" => (GeneratorKind::Ipv4, GeneratorOptions::new()),
        "bytea" => (GeneratorKind::Binary, GeneratorOptions::new()),
        _ => return None,
    };
    Some(inferred)
}

/// Local column of a declared foreign key and the column it references
struct DeclaredReference {
    local: String,
    key: String,
    /// Whether the referenced table and column are part of the schema
    present: bool,
}

fn declared_references(tables: &[TableSpec], table: &TableSpec) -> Vec<DeclaredReference> {
    let mut references = Vec::new();
    for fk in &table.foreign_keys {
        let target = find_table(tables, &fk.referenced_table).map(|i| &tables[i]);
        for (local, referenced) in fk.columns.iter().zip(&fk.referenced_columns) {
            references.push(DeclaredReference {
                local: local.clone(),
                key: format!("{}.{}", fk.referenced_table, referenced),
                present: target.is_some_and(|t| t.get_column(referenced).is_some()),
            });
        }
    }
    references
}

/// Fill in generators for columns that have none.
///
/// Local columns of a declared foreign key become `foreign` generators on
/// the referenced column; everything else falls back to the type default.
/// A declared foreign key whose target is not in `tables` also gets the
/// type default, with a warning. Columns with an explicit generator are
/// left alone.
pub fn apply_defaults(tables: &mut [TableSpec]) {
    let references: Vec<Vec<DeclaredReference>> = tables
        .iter()
        .map(|table| declared_references(tables, table))
        .collect();

    for (table, references) in tables.iter_mut().zip(references) {
        apply_table_defaults(table, &references);
    }
}

fn apply_table_defaults(table: &mut TableSpec, references: &[DeclaredReference]) {
    for column in &mut table.columns {
        if column.generator.is_some() {
            continue;
        }

        if let Some(reference) = references.iter().find(|r| r.local == column.name) {
            if reference.present {
                column.generator = Some(GeneratorKind::Foreign.name().to_string());
                column.options.insert(
                    FOREIGN_KEY_PARAM.to_string(),
                    YamlValue::from(reference.key.as_str()),
                );
                continue;
            }
            warn!(
                "{}.{} references {}, which is not in the schema; using the type default",
                table.name, column.name, reference.key
            );
        }

        match infer_default(column) {
            Some((kind, defaults)) => {
                column.generator = Some(kind.name().to_string());
                for (key, value) in defaults {
                    column.options.entry(key).or_insert(value);
                }
            }
            None => debug!(
                "no default generator for {}.{} ({})",
                table.name, column.name, column.type_name
            ),
        }
    }
}
