//! Table dependency graph for FK-aware generation.
//!
//! Provides:
//! - Dependency graph construction from resolved `foreign` generators
//! - Emission ordering (referenced tables before referencing tables)
//! - Cycle detection, reported as a fatal error

use crate::error::GenerateError;

/// Traversal state for one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Directed graph over table indices.
///
/// An edge `a -> b` means table `a` draws foreign values from table `b`, so
/// `b` has to be generated first. Self edges are not stored: a table that
/// references itself only needs its own earlier rows.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    dependencies: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Create a graph with one node per table name and no edges
    pub fn new(names: Vec<String>) -> Self {
        let n = names.len();
        Self {
            names,
            dependencies: vec![Vec::new(); n],
        }
    }

    /// Record that `from` depends on `to`. Duplicates and self edges are ignored.
    pub fn add_edge(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let deps = &mut self.dependencies[from];
        if !deps.contains(&to) {
            deps.push(to);
        }
    }

    /// Get the number of tables in the graph
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn table_name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(|s| s.as_str())
    }

    /// Tables that `idx` draws values from
    pub fn dependencies(&self, idx: usize) -> &[usize] {
        &self.dependencies[idx]
    }

    /// Compute an emission order in which every table follows all tables it
    /// depends on.
    ///
    /// Uses an iterative depth-first search with an explicit path stack, so
    /// deep dependency chains cannot overflow the call stack. Tables are
    /// appended to the order when all their dependencies are finished
    /// (postorder), which places dependencies first. Roots are visited in
    /// declaration order, keeping the result deterministic.
    pub fn safe_order(&self) -> Result<Vec<usize>, GenerateError> {
        let n = self.len();
        let mut marks = vec![Mark::Unvisited; n];
        let mut order = Vec::with_capacity(n);

        for root in 0..n {
            if marks[root] != Mark::Unvisited {
                continue;
            }

            // (table, index of the next dependency to look at)
            let mut path: Vec<(usize, usize)> = vec![(root, 0)];
            marks[root] = Mark::OnPath;

            while let Some(frame) = path.last_mut() {
                let node = frame.0;
                if let Some(&dep) = self.dependencies[node].get(frame.1) {
                    frame.1 += 1;
                    match marks[dep] {
                        Mark::Unvisited => {
                            marks[dep] = Mark::OnPath;
                            path.push((dep, 0));
                        }
                        Mark::OnPath => return Err(self.cycle_error(&path, dep)),
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    order.push(node);
                    path.pop();
                }
            }
        }

        if order.len() != n {
            return Err(GenerateError::OrderMismatch {
                ordered: order.len(),
                expected: n,
            });
        }

        Ok(order)
    }

    /// Build the error for a back edge to `dep`, naming the tables on the cycle
    fn cycle_error(&self, path: &[(usize, usize)], dep: usize) -> GenerateError {
        let start = path.iter().position(|&(t, _)| t == dep).unwrap_or(0);
        let mut cycle: Vec<String> = path[start..]
            .iter()
            .map(|&(t, _)| self.names[t].clone())
            .collect();
        cycle.push(self.names[dep].clone());
        GenerateError::CircularDependency { cycle }
    }
}
