//! Column value generators.
//!
//! This module provides:
//! - The catalogue of generator kinds and their parameter schemas
//! - Built-in value generators and the `distinct`/`unique` decorations
//! - Default generator inference from declared column types
//! - Resolution of every column into a ready-to-call binding

mod builtin;
mod decorate;
mod defaults;
mod kinds;
mod resolve;
mod timestamp;

pub use builtin::*;
pub use decorate::*;
pub use defaults::*;
pub use kinds::*;
pub use resolve::*;
pub use timestamp::TimeBound;

use crate::cache::ValueCache;
use crate::error::DrawError;
use crate::value::Value;
use chrono::{NaiveDateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fmt;

/// Attempts a `unique` generator makes before giving up on a draw
pub const MAX_UNIQUE_TRIES: usize = 1000;

/// Shared state threaded through every generator call in a run
pub struct GenerationContext {
    /// Single source of randomness; a fixed seed makes the run reproducible
    pub rng: ChaCha8Rng,
    /// Values committed so far, consumed by `foreign` generators
    pub cache: ValueCache,
    /// "now" for relative timestamp bounds, captured once per run
    pub anchor: NaiveDateTime,
}

impl GenerationContext {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            cache: ValueCache::new(),
            anchor: Utc::now().naive_utc(),
        }
    }

    /// Pin the timestamp anchor (tests and reproducible runs)
    pub fn with_anchor(mut self, anchor: NaiveDateTime) -> Self {
        self.anchor = anchor;
        self
    }
}

/// A value source for one column
pub trait ValueGenerator: Send {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError>;
}

/// Comparable description of what a binding does.
///
/// Two resolutions of the same configuration yield equal specs.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingSpec {
    pub kind: GeneratorKind,
    pub params: BTreeMap<String, serde_yaml_ng::Value>,
    pub distinct: Option<usize>,
    pub unique: bool,
    /// Canonical `schema.table.column` (or `table.column` without a schema) for `foreign` bindings
    pub foreign_key: Option<String>,
}

/// A resolved, stateful generator for one column
pub struct Binding {
    spec: BindingSpec,
    generator: Box<dyn ValueGenerator>,
}

impl Binding {
    pub fn new(spec: BindingSpec, generator: Box<dyn ValueGenerator>) -> Self {
        Self { spec, generator }
    }

    pub fn spec(&self) -> &BindingSpec {
        &self.spec
    }

    pub fn kind(&self) -> GeneratorKind {
        self.spec.kind
    }

    pub fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        self.generator.next_value(ctx)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").field("spec", &self.spec).finish()
    }
}
