//! Column resolution: turns every column's generator configuration into a
//! callable binding and derives the table dependency graph.
//!
//! Problems with individual columns (unknown kind, bad parameters,
//! unsupported type) are collected and the column is skipped. Broken
//! `foreign` references and foreign-key loops are fatal.

use super::builtin::build_builtin;
use super::decorate::{DistinctGenerator, ForeignGenerator, SequenceGenerator, UniqueGenerator};
use super::defaults::apply_defaults;
use super::kinds::{GeneratorKind, Params, DISTINCT_KEY, FOREIGN_KEY_PARAM, UNIQUE_KEY};
use super::{Binding, BindingSpec, ValueGenerator};
use crate::cache::cache_key;
use crate::error::GenerateError;
use crate::schema::{find_table, ColumnSpec, DependencyGraph, TableSpec};
use ahash::AHashSet;
use serde_yaml_ng::Value as YamlValue;
use std::fmt;
use tracing::{debug, warn};

/// A column left out of generation, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedColumn {
    pub table: String,
    pub column: String,
    pub reason: String,
}

impl fmt::Display for SkippedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.table, self.column, self.reason)
    }
}

/// A generated column of a table
#[derive(Debug)]
pub struct ColumnPlan {
    pub name: String,
    pub nullable: bool,
    /// Whether committed values go into the value cache
    pub publish: bool,
    pub binding: Binding,
}

/// Generated columns of one table, in declaration order
#[derive(Debug, Default)]
pub struct TablePlan {
    pub columns: Vec<ColumnPlan>,
}

impl TablePlan {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }
}

/// Outcome of resolving a schema
#[derive(Debug)]
pub struct Resolution {
    /// One plan per table, indexed like the input tables
    pub plans: Vec<TablePlan>,
    pub skipped: Vec<SkippedColumn>,
    pub graph: DependencyGraph,
}

/// Target of a `foreign` generator: table index and column name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ForeignTarget {
    table: usize,
    column: String,
}

/// Resolve all tables.
///
/// Fills default generators, validates `foreign` references, marks
/// referenced columns as published, rejects foreign-key loops and builds a
/// binding for every resolvable column.
pub fn resolve(tables: &mut [TableSpec]) -> Result<Resolution, GenerateError> {
    apply_defaults(tables);
    for table in tables.iter_mut() {
        for column in &mut table.columns {
            column.is_foreign_key = false;
        }
    }

    // Validate every foreign reference before anything else
    let mut targets: Vec<Vec<Option<ForeignTarget>>> = Vec::with_capacity(tables.len());
    for table in tables.iter() {
        let mut row = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            row.push(if is_foreign(column) {
                Some(foreign_target(tables, table, column)?)
            } else {
                None
            });
        }
        targets.push(row);
    }

    for target in targets.iter().flatten().flatten() {
        if let Some(column) = tables[target.table].get_column_mut(&target.column) {
            column.is_foreign_key = true;
        }
    }

    check_foreign_chains(tables, &targets)?;

    let mut graph = DependencyGraph::new(tables.iter().map(|t| t.name.clone()).collect());
    let mut plans = Vec::with_capacity(tables.len());
    let mut skipped = Vec::new();

    for (t_idx, table) in tables.iter().enumerate() {
        let mut plan = TablePlan::default();
        for (c_idx, column) in table.columns.iter().enumerate() {
            let target = targets[t_idx][c_idx].as_ref();
            if let Some(target) = target {
                graph.add_edge(t_idx, target.table);
            }
            let canonical =
                target.map(|t| cache_key(&tables[t.table].qualified_name(), &t.column));

            match bind_column(column, canonical) {
                Ok(binding) => {
                    debug!("{}.{} -> {:?}", table.name, column.name, binding.spec());
                    plan.columns.push(ColumnPlan {
                        name: column.name.clone(),
                        nullable: column.nullable,
                        publish: column.is_foreign_key,
                        binding,
                    });
                }
                Err(reason) => {
                    warn!("skipping {}.{}: {}", table.name, column.name, reason);
                    skipped.push(SkippedColumn {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        reason,
                    });
                }
            }
        }
        plans.push(plan);
    }

    Ok(Resolution {
        plans,
        skipped,
        graph,
    })
}

fn is_foreign(column: &ColumnSpec) -> bool {
    column.generator.as_deref() == Some(GeneratorKind::Foreign.name())
}

/// Parse and look up the `key` option of a `foreign` column
fn foreign_target(
    tables: &[TableSpec],
    owner: &TableSpec,
    column: &ColumnSpec,
) -> Result<ForeignTarget, GenerateError> {
    let key = match column.options.get(FOREIGN_KEY_PARAM) {
        Some(YamlValue::String(key)) => key.trim().to_string(),
        Some(other) => {
            return Err(GenerateError::MalformedForeignKey {
                table: owner.name.clone(),
                column: column.name.clone(),
                key: format!("{:?}", other),
            })
        }
        None => {
            return Err(GenerateError::MissingForeignKey {
                table: owner.name.clone(),
                column: column.name.clone(),
            })
        }
    };

    let (table_name, column_name) = match key.rsplit_once('.') {
        Some((t, c)) if !t.is_empty() && !c.is_empty() => (t, c),
        _ => {
            return Err(GenerateError::MalformedForeignKey {
                table: owner.name.clone(),
                column: column.name.clone(),
                key: key.clone(),
            })
        }
    };

    let table = find_table(tables, table_name)
        .filter(|&idx| tables[idx].get_column(column_name).is_some())
        .ok_or_else(|| GenerateError::UnknownForeignTarget { key: key.clone() })?;

    Ok(ForeignTarget {
        table,
        column: column_name.to_string(),
    })
}

/// Follow each `foreign` column through the columns it references. A chain
/// that re-enters a table already on it can never be satisfied.
///
/// The starting table is not part of the chain, so a column referencing
/// another column of its own table passes.
fn check_foreign_chains(
    tables: &[TableSpec],
    targets: &[Vec<Option<ForeignTarget>>],
) -> Result<(), GenerateError> {
    for (t_idx, row) in targets.iter().enumerate() {
        for (c_idx, target) in row.iter().enumerate() {
            let Some(mut current) = target.clone() else {
                continue;
            };
            let mut visited: AHashSet<usize> = AHashSet::new();
            let mut chain = vec![cache_key(
                &tables[t_idx].qualified_name(),
                &tables[t_idx].columns[c_idx].name,
            )];

            loop {
                chain.push(cache_key(&tables[current.table].qualified_name(), &current.column));
                if !visited.insert(current.table) {
                    return Err(GenerateError::CircularForeignKeys {
                        table: tables[t_idx].name.clone(),
                        column: tables[t_idx].columns[c_idx].name.clone(),
                        chain,
                    });
                }
                let next_col = tables[current.table]
                    .columns
                    .iter()
                    .position(|c| c.name == current.column);
                match next_col.and_then(|idx| targets[current.table][idx].clone()) {
                    Some(next) => current = next,
                    None => break,
                }
            }
        }
    }
    Ok(())
}

/// Build the binding for one column, or explain why it cannot be generated
fn bind_column(column: &ColumnSpec, foreign_key: Option<String>) -> Result<Binding, String> {
    let name = match &column.generator {
        Some(name) => name,
        None => return Err(format!("no valid info for ({})", column.type_name)),
    };
    let kind: GeneratorKind = name.parse()?;
    let params = Params::bind(kind, &column.options);

    let base: Box<dyn ValueGenerator> = match kind {
        GeneratorKind::Sequence => Box::new(SequenceGenerator::new(
            params.i64_or("start", 1)?,
            params.i64_or("step", 1)?,
        )),
        GeneratorKind::Foreign => {
            let key = foreign_key.clone().ok_or("foreign generator without key")?;
            Box::new(ForeignGenerator::new(key))
        }
        _ => build_builtin(kind, &params)?,
    };

    let (distinct, unique) = if kind.is_decoratable() {
        decorations(column)?
    } else {
        (None, false)
    };

    let mut generator = base;
    if let Some(limit) = distinct {
        generator = Box::new(DistinctGenerator::new(generator, limit));
    }
    if unique {
        generator = Box::new(UniqueGenerator::new(generator));
    }

    let spec = BindingSpec {
        kind,
        params: params.values().clone(),
        distinct,
        unique,
        foreign_key,
    };
    Ok(Binding::new(spec, generator))
}

fn decorations(column: &ColumnSpec) -> Result<(Option<usize>, bool), String> {
    let distinct = match column.options.get(DISTINCT_KEY) {
        None | Some(YamlValue::Null) => None,
        Some(v) => match v.as_u64() {
            Some(n) if n > 0 => Some(n as usize),
            _ => return Err(format!("`{}` must be a positive integer, got {:?}", DISTINCT_KEY, v)),
        },
    };
    let unique = match column.options.get(UNIQUE_KEY) {
        None | Some(YamlValue::Null) => false,
        Some(YamlValue::Bool(b)) => *b,
        Some(v) => return Err(format!("`{}` must be true or false, got {:?}", UNIQUE_KEY, v)),
    };
    Ok((distinct, unique))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;

    fn users() -> TableSpec {
        TableSpec::new("users")
            .column(ColumnSpec::new("id", "serial").not_null())
            .column(ColumnSpec::new("email", "text"))
    }

    fn posts() -> TableSpec {
        TableSpec::new("posts")
            .column(ColumnSpec::new("id", "serial"))
            .column(
                ColumnSpec::new("user_id", "integer")
                    .generator("foreign")
                    .option("key", "users.id"),
            )
    }

    #[test]
    fn test_foreign_marks_target() {
        let mut tables = vec![posts(), users()];
        let resolution = resolve(&mut tables).unwrap();
        assert!(tables[1].get_column("id").unwrap().is_foreign_key);
        assert!(!tables[1].get_column("email").unwrap().is_foreign_key);
        assert!(resolution.plans[1].columns[0].publish);
        assert_eq!(resolution.graph.dependencies(0), &[1]);
    }

    #[test]
    fn test_foreign_key_canonicalised() {
        let mut users = users();
        users.schema = Some("public".into());
        let mut posts = posts();
        posts_key(&mut posts, "public.users.id");
        let mut tables = vec![users, posts];
        let resolution = resolve(&mut tables).unwrap();
        let spec = resolution.plans[1].columns[1].binding.spec();
        assert_eq!(spec.foreign_key.as_deref(), Some("public.users.id"));

        // a bare key resolves to the same qualified pool
        posts_key(&mut tables[1], "users.id");
        let resolution = resolve(&mut tables).unwrap();
        let spec = resolution.plans[1].columns[1].binding.spec();
        assert_eq!(spec.foreign_key.as_deref(), Some("public.users.id"));
    }

    fn posts_key(posts: &mut TableSpec, key: &str) {
        posts.columns[1].options.insert("key".into(), key.into());
    }

    #[test]
    fn test_same_name_in_two_schemas_kept_apart() {
        let mut a = users();
        a.schema = Some("a".into());
        let mut b = users();
        b.schema = Some("b".into());
        let orders = TableSpec::new("orders")
            .column(ColumnSpec::new("id", "serial"))
            .column(
                ColumnSpec::new("a_user", "int")
                    .generator("foreign")
                    .option("key", "a.users.id"),
            )
            .column(
                ColumnSpec::new("b_user", "int")
                    .generator("foreign")
                    .option("key", "b.users.id"),
            );
        let mut tables = vec![a, b, orders];
        let resolution = resolve(&mut tables).unwrap();
        let keys: Vec<Option<String>> = resolution.plans[2].columns[1..]
            .iter()
            .map(|c| c.binding.spec().foreign_key.clone())
            .collect();
        assert_eq!(
            keys,
            vec![Some("a.users.id".to_string()), Some("b.users.id".to_string())]
        );
        assert_eq!(resolution.graph.dependencies(2), &[0, 1]);
    }

    #[test]
    fn test_non_finite_decimal_range_skips_column() {
        let mut tables = vec![TableSpec::new("t")
            .column(ColumnSpec::new("id", "serial"))
            .column(
                ColumnSpec::new("amount", "numeric")
                    .generator("decimal")
                    .option("min", -1e308)
                    .option("max", 1e308),
            )];
        let resolution = resolve(&mut tables).unwrap();
        assert_eq!(resolution.plans[0].column_names(), vec!["id"]);
        assert_eq!(resolution.skipped.len(), 1);
        assert_eq!(resolution.skipped[0].column, "amount");
    }

    #[test]
    fn test_missing_and_malformed_keys() {
        let mut tables = vec![TableSpec::new("t").column(ColumnSpec::new("c", "int").generator("foreign"))];
        assert!(matches!(
            resolve(&mut tables),
            Err(GenerateError::MissingForeignKey { .. })
        ));

        let mut tables = vec![TableSpec::new("t")
            .column(ColumnSpec::new("c", "int").generator("foreign").option("key", "nodot"))];
        assert!(matches!(
            resolve(&mut tables),
            Err(GenerateError::MalformedForeignKey { .. })
        ));

        let mut tables = vec![TableSpec::new("t")
            .column(ColumnSpec::new("c", "int").generator("foreign").option("key", "nope.id"))];
        assert!(matches!(
            resolve(&mut tables),
            Err(GenerateError::UnknownForeignTarget { .. })
        ));
    }

    #[test]
    fn test_unknown_generator_skips_column() {
        let mut tables = vec![TableSpec::new("t")
            .column(ColumnSpec::new("a", "int"))
            .column(ColumnSpec::new("b", "int").generator("telepathy"))
            .column(ColumnSpec::new("c", "jsonb"))];
        let resolution = resolve(&mut tables).unwrap();
        assert_eq!(resolution.plans[0].column_names(), vec!["a"]);
        let skipped: Vec<&str> = resolution.skipped.iter().map(|s| s.column.as_str()).collect();
        assert_eq!(skipped, vec!["b", "c"]);
    }

    #[test]
    fn test_bad_parameter_skips_column() {
        let mut tables = vec![TableSpec::new("t")
            .column(ColumnSpec::new("a", "int").generator("integer").option("min", "abc"))];
        let resolution = resolve(&mut tables).unwrap();
        assert!(resolution.plans[0].columns.is_empty());
        assert_eq!(resolution.skipped.len(), 1);
    }

    #[test]
    fn test_foreign_chain_loop_is_fatal() {
        let a = TableSpec::new("a")
            .column(ColumnSpec::new("x", "int").generator("foreign").option("key", "b.y"));
        let b = TableSpec::new("b")
            .column(ColumnSpec::new("y", "int").generator("foreign").option("key", "a.x"));
        let mut tables = vec![a, b];
        assert!(matches!(
            resolve(&mut tables),
            Err(GenerateError::CircularForeignKeys { .. })
        ));
    }

    #[test]
    fn test_self_reference_allowed() {
        let mut tables = vec![TableSpec::new("employees")
            .column(ColumnSpec::new("id", "serial"))
            .column(
                ColumnSpec::new("manager_id", "int")
                    .generator("foreign")
                    .option("key", "employees.id"),
            )];
        let resolution = resolve(&mut tables).unwrap();
        assert!(resolution.graph.dependencies(0).is_empty());
        assert!(tables[0].columns[0].is_foreign_key);
    }

    #[test]
    fn test_decorations_not_applied_to_sequence() {
        let mut tables = vec![TableSpec::new("t").column(
            ColumnSpec::new("id", "serial")
                .option("distinct", 2)
                .option("unique", true),
        )];
        let resolution = resolve(&mut tables).unwrap();
        let spec = resolution.plans[0].columns[0].binding.spec();
        assert_eq!(spec.kind, GeneratorKind::Sequence);
        assert_eq!(spec.distinct, None);
        assert!(!spec.unique);
    }
}
