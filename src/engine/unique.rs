//! Committed tuples per unique-constraint group.

use crate::value::Value;
use ahash::{AHashMap, AHashSet};

/// Identity of a unique group: schema-qualified table plus its sorted column names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    table: String,
    columns: Vec<String>,
}

impl GroupKey {
    pub fn new<S: AsRef<str>>(table: &str, columns: &[S]) -> Self {
        let mut columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        columns.sort();
        Self {
            table: table.to_string(),
            columns,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Tuples already committed for each unique group.
///
/// Tuples are checked before a row is committed and recorded only after,
/// so a rejected row leaves no trace.
#[derive(Debug, Default)]
pub struct UniqueConstraintState {
    groups: AHashMap<GroupKey, AHashSet<Vec<Value>>>,
}

impl UniqueConstraintState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &GroupKey, tuple: &[Value]) -> bool {
        self.groups
            .get(key)
            .map(|seen| seen.contains(tuple))
            .unwrap_or(false)
    }

    pub fn record(&mut self, key: &GroupKey, tuple: Vec<Value>) {
        match self.groups.get_mut(key) {
            Some(seen) => {
                seen.insert(tuple);
            }
            None => {
                let mut seen = AHashSet::new();
                seen.insert(tuple);
                self.groups.insert(key.clone(), seen);
            }
        }
    }

    /// Number of committed tuples for a group
    pub fn len_of(&self, key: &GroupKey) -> usize {
        self.groups.get(key).map(|s| s.len()).unwrap_or(0)
    }
}
