//! Row generation engine.
//!
//! Resolves the schema, orders tables by their foreign dependencies and
//! generates rows table by table:
//! - each row is built column by column in declaration order, then checked
//!   against the table's unique groups as a whole
//! - a rejected row is redrawn from scratch, up to `MAX_ROW_ATTEMPTS` times
//! - a table stops early after more than `MAX_CONSECUTIVE_FAILURES` failed
//!   rows in a row
//! - only committed rows reach the sink and the value cache

mod unique;

pub use unique::{GroupKey, UniqueConstraintState};

use crate::error::{DrawError, GenerateError};
use crate::generator::{resolve, GenerationContext, SkippedColumn, TablePlan};
use crate::output::{NullSink, RowSink};
use crate::schema::TableSpec;
use crate::value::Value;
use std::fmt;
use tracing::{debug, info, warn};

/// Draws per row before the row counts as failed
pub const MAX_ROW_ATTEMPTS: usize = 1000;
/// Failed rows in a row a table tolerates before it is abandoned
pub const MAX_CONSECUTIVE_FAILURES: usize = 10;

/// Why a row could not be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFailure {
    /// A column generator gave up
    Draw { column: String, error: DrawError },
    /// Every attempt collided with a committed unique tuple
    ConstraintExhausted { attempts: usize },
}

impl fmt::Display for RowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowFailure::Draw { column, error } => write!(f, "column {}: {}", column, error),
            RowFailure::ConstraintExhausted { attempts } => write!(
                f,
                "unique constraints still violated after {} attempts",
                attempts
            ),
        }
    }
}

/// Result of generating one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Committed(Vec<Value>),
    Failed(RowFailure),
}

/// Per-run settings
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Rows per table unless the table sets its own count
    pub default_rows: usize,
    /// Tables to emit; empty means all. Other tables are still generated
    /// so their values can be referenced.
    pub table_filter: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            default_rows: 5,
            table_filter: Vec::new(),
        }
    }
}

/// Per-table result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    pub name: String,
    pub requested: usize,
    pub committed: usize,
    pub failed: usize,
    /// Stopped after too many consecutive failures
    pub aborted: bool,
    /// Written to the real sink (not filtered out)
    pub emitted: bool,
}

/// Result of a whole run
#[derive(Debug, Clone, Default)]
pub struct GenerationStats {
    /// Tables in generation order
    pub tables: Vec<TableStats>,
    pub skipped_columns: Vec<SkippedColumn>,
}

impl GenerationStats {
    pub fn rows_emitted(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| t.emitted)
            .map(|t| t.committed)
            .sum()
    }

    pub fn rows_failed(&self) -> usize {
        self.tables.iter().map(|t| t.failed).sum()
    }

    pub fn table(&self, name: &str) -> Option<&TableStats> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Unique group bound to column positions in a table plan
#[derive(Debug)]
struct BoundGroup {
    key: GroupKey,
    positions: Vec<usize>,
}

/// Drives generation for one run
pub struct Engine {
    ctx: GenerationContext,
    uniques: UniqueConstraintState,
    options: RunOptions,
}

impl Engine {
    pub fn new(ctx: GenerationContext, options: RunOptions) -> Self {
        Self {
            ctx,
            uniques: UniqueConstraintState::new(),
            options,
        }
    }

    pub fn context(&self) -> &GenerationContext {
        &self.ctx
    }

    pub fn unique_state(&self) -> &UniqueConstraintState {
        &self.uniques
    }

    /// Resolve, order and generate every table into `sink`
    pub fn run(
        &mut self,
        tables: &mut [TableSpec],
        sink: &mut dyn RowSink,
    ) -> Result<GenerationStats, GenerateError> {
        let mut resolution = resolve(tables)?;
        let order = resolution.graph.safe_order()?;

        let names: Vec<&str> = order.iter().map(|&i| tables[i].name.as_str()).collect();
        info!("generation order: {}", names.join(", "));

        for filter in &self.options.table_filter {
            if !tables.iter().any(|t| t.is_named(filter)) {
                warn!("table filter {} matches no table", filter);
            }
        }

        let mut stats = GenerationStats {
            tables: Vec::with_capacity(order.len()),
            skipped_columns: resolution.skipped.clone(),
        };

        for idx in order {
            let table = &tables[idx];
            let plan = &mut resolution.plans[idx];
            let rows = table.row_count.unwrap_or(self.options.default_rows);

            let emitted = self.is_emitted(table);
            let mut null_sink = NullSink;
            let target: &mut dyn RowSink = if emitted {
                &mut *sink
            } else {
                debug!("{} is filtered out, generating without output", table.name);
                &mut null_sink
            };

            let mut table_stats = self.generate_table(table, plan, rows, target)?;
            table_stats.emitted = emitted;
            stats.tables.push(table_stats);
        }

        sink.finish()?;
        Ok(stats)
    }

    fn is_emitted(&self, table: &TableSpec) -> bool {
        self.options.table_filter.is_empty()
            || self.options.table_filter.iter().any(|f| table.is_named(f))
    }

    /// Generate `rows` rows of one table into `sink`
    pub fn generate_table(
        &mut self,
        table: &TableSpec,
        plan: &mut TablePlan,
        rows: usize,
        sink: &mut dyn RowSink,
    ) -> Result<TableStats, GenerateError> {
        let qualified = table.qualified_name();
        let mut stats = TableStats {
            name: qualified.clone(),
            requested: rows,
            committed: 0,
            failed: 0,
            aborted: false,
            emitted: true,
        };

        if plan.columns.is_empty() {
            warn!("{} has no generated columns, skipping", table.name);
            return Ok(stats);
        }

        let groups = bind_groups(table, plan);
        sink.begin_table(&qualified, &plan.column_names())?;

        let mut consecutive = 0usize;
        for _ in 0..rows {
            match self.generate_row(&qualified, plan, &groups) {
                RowOutcome::Committed(values) => {
                    sink.row(&values)?;
                    stats.committed += 1;
                    consecutive = 0;
                }
                RowOutcome::Failed(reason) => {
                    debug!("row for {} failed: {}", table.name, reason);
                    stats.failed += 1;
                    consecutive += 1;
                    if consecutive > MAX_CONSECUTIVE_FAILURES {
                        warn!(
                            "{}: {} consecutive failed rows ({}), stopping after {} of {} rows",
                            table.name, consecutive, reason, stats.committed, rows
                        );
                        stats.aborted = true;
                        break;
                    }
                }
            }
        }

        sink.end_table(&qualified)?;
        Ok(stats)
    }

    /// Draw one row, retrying whole rows that collide with a unique group.
    /// Committed values of published columns go to the cache under
    /// `table_name`.
    fn generate_row(
        &mut self,
        table_name: &str,
        plan: &mut TablePlan,
        groups: &[BoundGroup],
    ) -> RowOutcome {
        for _ in 0..MAX_ROW_ATTEMPTS {
            let mut values = Vec::with_capacity(plan.columns.len());
            for column in plan.columns.iter_mut() {
                match column.binding.next_value(&mut self.ctx) {
                    Ok(value) => values.push(value),
                    Err(DrawError::NoValue { .. }) if column.nullable => values.push(Value::Null),
                    Err(error) => {
                        return RowOutcome::Failed(RowFailure::Draw {
                            column: column.name.clone(),
                            error,
                        })
                    }
                }
            }

            let tuples: Vec<Option<Vec<Value>>> =
                groups.iter().map(|g| group_tuple(g, &values)).collect();
            let collides = groups
                .iter()
                .zip(&tuples)
                .any(|(g, t)| t.as_ref().is_some_and(|t| self.uniques.contains(&g.key, t)));
            if collides {
                continue;
            }

            for (group, tuple) in groups.iter().zip(tuples) {
                if let Some(tuple) = tuple {
                    self.uniques.record(&group.key, tuple);
                }
            }
            for (column, value) in plan.columns.iter().zip(&values) {
                if column.publish && !value.is_null() {
                    self.ctx.cache.publish(table_name, &column.name, value.clone());
                }
            }
            return RowOutcome::Committed(values);
        }

        RowOutcome::Failed(RowFailure::ConstraintExhausted {
            attempts: MAX_ROW_ATTEMPTS,
        })
    }
}

/// Values of a group's columns, or `None` when one of them is NULL (NULLs
/// never collide)
fn group_tuple(group: &BoundGroup, values: &[Value]) -> Option<Vec<Value>> {
    let tuple: Vec<Value> = group.positions.iter().map(|&p| values[p].clone()).collect();
    if tuple.iter().any(Value::is_null) {
        None
    } else {
        Some(tuple)
    }
}

/// Map each unique group of `table` to positions in `plan`. Groups naming a
/// column that is not generated cannot be enforced and are dropped.
fn bind_groups(table: &TableSpec, plan: &TablePlan) -> Vec<BoundGroup> {
    let mut bound = Vec::new();
    for group in &table.unique_groups {
        let key = GroupKey::new(&table.qualified_name(), group);
        let positions: Option<Vec<usize>> =
            key.columns().iter().map(|c| plan.position(c)).collect();
        match positions {
            Some(positions) => bound.push(BoundGroup { key, positions }),
            None => warn!(
                "ignoring unique group ({}) on {}: column not generated",
                group.join(", "),
                table.name
            ),
        }
    }
    bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;

    #[test]
    fn test_group_tuple_skips_nulls() {
        let group = BoundGroup {
            key: GroupKey::new("t", &["a", "b"]),
            positions: vec![0, 1],
        };
        assert_eq!(
            group_tuple(&group, &[Value::Int(1), Value::Int(2)]),
            Some(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(group_tuple(&group, &[Value::Int(1), Value::Null]), None);
    }

    #[test]
    fn test_bind_groups_drops_ungenerated_columns() {
        let mut tables = vec![TableSpec::new("t")
            .column(ColumnSpec::new("a", "int"))
            .column(ColumnSpec::new("b", "jsonb"))
            .unique(&["a"])
            .unique(&["a", "b"])];
        let resolution = resolve(&mut tables).unwrap();
        let groups = bind_groups(&tables[0], &resolution.plans[0]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].positions, vec![0]);
    }

    #[test]
    fn test_row_failure_display() {
        let failure = RowFailure::ConstraintExhausted { attempts: 1000 };
        assert!(failure.to_string().contains("1000"));
    }
}
