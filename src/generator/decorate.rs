//! Stateful generators: sequences, foreign lookups and the `distinct` /
//! `unique` wrappers.

use super::{GenerationContext, ValueGenerator, MAX_UNIQUE_TRIES};
use crate::error::DrawError;
use crate::value::Value;
use ahash::AHashSet;
use rand::Rng;

/// `start, start + step, ...`; never touches the RNG
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    next: i64,
    step: i64,
}

impl SequenceGenerator {
    pub fn new(start: i64, step: i64) -> Self {
        Self { next: start, step }
    }
}

impl ValueGenerator for SequenceGenerator {
    fn next_value(&mut self, _ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        let current = self.next;
        self.next = self.next.wrapping_add(self.step);
        Ok(Value::Int(current))
    }
}

/// Samples a value previously published for a canonical `table.column` key
#[derive(Debug, Clone)]
pub struct ForeignGenerator {
    key: String,
}

impl ForeignGenerator {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl ValueGenerator for ForeignGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        ctx.cache
            .sample_key(&self.key, &mut ctx.rng)
            .ok_or_else(|| DrawError::NoValue {
                key: self.key.clone(),
            })
    }
}

/// Produces at most `limit` distinct values, then recycles earlier ones.
///
/// While under the limit each call asks the inner generator for a value not
/// seen yet. If none turns up within the retry budget the inner generator is
/// treated as exhausted and the limit shrinks to what was collected.
pub struct DistinctGenerator {
    inner: Box<dyn ValueGenerator>,
    limit: usize,
    seen: AHashSet<Value>,
    ordered: Vec<Value>,
}

impl DistinctGenerator {
    pub fn new(inner: Box<dyn ValueGenerator>, limit: usize) -> Self {
        Self {
            inner,
            limit,
            seen: AHashSet::new(),
            ordered: Vec::new(),
        }
    }

    fn recycle(&self, ctx: &mut GenerationContext) -> Value {
        let idx = ctx.rng.random_range(0..self.ordered.len());
        self.ordered[idx].clone()
    }
}

impl ValueGenerator for DistinctGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        if self.ordered.len() < self.limit {
            for _ in 0..MAX_UNIQUE_TRIES {
                let value = self.inner.next_value(ctx)?;
                if self.seen.insert(value.clone()) {
                    self.ordered.push(value.clone());
                    return Ok(value);
                }
            }
            self.limit = self.ordered.len();
        }
        if self.ordered.is_empty() {
            return self.inner.next_value(ctx);
        }
        Ok(self.recycle(ctx))
    }
}

/// Never returns the same value twice within a run
pub struct UniqueGenerator {
    inner: Box<dyn ValueGenerator>,
    seen: AHashSet<Value>,
}

impl UniqueGenerator {
    pub fn new(inner: Box<dyn ValueGenerator>) -> Self {
        Self {
            inner,
            seen: AHashSet::new(),
        }
    }
}

impl ValueGenerator for UniqueGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        for _ in 0..MAX_UNIQUE_TRIES {
            let value = self.inner.next_value(ctx)?;
            if self.seen.insert(value.clone()) {
                return Ok(value);
            }
        }
        Err(DrawError::UniqueExhausted {
            attempts: MAX_UNIQUE_TRIES,
        })
    }
}
