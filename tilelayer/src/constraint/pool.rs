//! Deduplicating pool for immutable time constraints.
//!
//! Constraints are compared by value. The first instance created for a given
//! value is kept for the life of the pool and handed back to every later
//! request for an equal value, so downstream consumers can use
//! [`Arc::ptr_eq`] as a fast equality check.
//!
//! The pool is meant to be created once per process and shared through an
//! `Arc<ConstraintPool>` handle.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::time_constraint::TimeConstraint;

/// Process-scoped interning pool for [`TimeConstraint`]s.
#[derive(Debug, Default)]
pub struct ConstraintPool {
    entries: Mutex<HashSet<Arc<TimeConstraint>>>,
}

impl ConstraintPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty pool behind a shared handle.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Return the pooled instance equal to `constraint`, inserting it if this
    /// is the first time the value has been seen.
    pub fn get_or_create(&self, constraint: TimeConstraint) -> Arc<TimeConstraint> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&constraint) {
            return Arc::clone(existing);
        }
        let pooled = Arc::new(constraint);
        entries.insert(Arc::clone(&pooled));
        trace!(pool_size = entries.len(), "Pooled new time constraint");
        pooled
    }

    /// Number of distinct constraints in the pool.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
