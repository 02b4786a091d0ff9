//! Time constraints.
//!
//! A [`TimeConstraint`] carries the shared base fields once (key, time range,
//! negation, most-recent flag) and a [`TimeConstraintKind`] tag for the
//! variant-specific behaviour. Constraints are immutable and are only handed
//! out through a [`ConstraintPool`] so structurally-equal constraints share a
//! single allocation.

use std::sync::Arc;

use crate::timespan::{TimeSpan, UNBOUNDED_END, UNBOUNDED_START};

use super::pool::ConstraintPool;
use super::ConstraintError;

/// Variant-specific data for a time constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimeConstraintKind {
    /// Passes when a span overlaps the range.
    Basic,
    /// Like `Basic`, but the span's duration must be in
    /// `(min_duration_s, max_duration_s]`.
    Bounded {
        min_duration_s: u64,
        max_duration_s: u64,
    },
    /// Passes when a span lies entirely inside the range.
    Strict,
    /// Carries child constraints. The constraint itself checks like `Basic`;
    /// callers decide how the children combine.
    Multi { children: Vec<Arc<TimeConstraint>> },
}

/// Immutable time predicate over `[min_ms, max_ms)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeConstraint {
    key: Option<String>,
    min_ms: i64,
    max_ms: i64,
    negate: bool,
    most_recent: bool,
    kind: TimeConstraintKind,
}

impl TimeConstraint {
    /// Start building a constraint over `[min_ms, max_ms)`.
    pub fn builder(min_ms: i64, max_ms: i64) -> TimeConstraintBuilder {
        TimeConstraintBuilder {
            key: None,
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
            negate: false,
            most_recent: false,
        }
    }

    /// Start building a constraint over the extent of `span`.
    ///
    /// A timeless span yields an unbounded range.
    pub fn builder_for_span(span: &TimeSpan) -> TimeConstraintBuilder {
        match span.bounds_ms() {
            Some((start, end)) => Self::builder(start, end),
            None => Self::builder(UNBOUNDED_START, UNBOUNDED_END),
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn min_ms(&self) -> i64 {
        self.min_ms
    }

    pub fn max_ms(&self) -> i64 {
        self.max_ms
    }

    pub fn is_negated(&self) -> bool {
        self.negate
    }

    pub fn is_most_recent(&self) -> bool {
        self.most_recent
    }

    pub fn kind(&self) -> &TimeConstraintKind {
        &self.kind
    }

    /// The constrained range as a span.
    pub fn range(&self) -> TimeSpan {
        TimeSpan::new(self.min_ms, self.max_ms)
    }

    /// Check a single span.
    ///
    /// Timeless spans always pass, even for negated constraints.
    pub fn check(&self, span: &TimeSpan) -> bool {
        match &self.kind {
            TimeConstraintKind::Basic | TimeConstraintKind::Multi { .. } => {
                self.check_overlap(span)
            }
            TimeConstraintKind::Bounded {
                min_duration_s,
                max_duration_s,
            } => {
                if !span.is_timeless() {
                    let within = span.duration_ceil_secs().is_some_and(|secs| {
                        secs > *min_duration_s as i64 && secs <= *max_duration_s as i64
                    });
                    if !within {
                        return false;
                    }
                }
                self.check_overlap(span)
            }
            TimeConstraintKind::Strict => {
                if span.is_timeless() {
                    return true;
                }
                self.negate ^ span.within_range(self.min_ms, self.max_ms)
            }
        }
    }

    /// Check a set of candidate spans.
    ///
    /// A negated constraint requires every span to pass; a plain constraint
    /// passes if any span passes.
    pub fn check_all(&self, spans: &[TimeSpan]) -> bool {
        if self.negate {
            spans.iter().all(|span| self.check(span))
        } else {
            spans.iter().any(|span| self.check(span))
        }
    }

    /// Returns true if every child of a `Multi` constraint passes.
    ///
    /// Non-multi constraints have no children and return true.
    pub fn children_pass(&self, span: &TimeSpan) -> bool {
        match &self.kind {
            TimeConstraintKind::Multi { children } => children.iter().all(|c| c.check(span)),
            _ => true,
        }
    }

    fn check_overlap(&self, span: &TimeSpan) -> bool {
        if span.is_timeless() {
            return true;
        }
        self.negate ^ span.overlaps_range(self.min_ms, self.max_ms)
    }
}

/// Builder for pooled [`TimeConstraint`]s.
///
/// The terminal methods intern the constraint in the supplied pool and return
/// the shared instance.
#[derive(Debug, Clone)]
pub struct TimeConstraintBuilder {
    key: Option<String>,
    min_ms: i64,
    max_ms: i64,
    negate: bool,
    most_recent: bool,
}

impl TimeConstraintBuilder {
    /// Attach an opaque key identifying what the constraint applies to.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Invert the constraint.
    pub fn negated(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    /// Mark the constraint as selecting only the most recent data.
    pub fn most_recent(mut self, most_recent: bool) -> Self {
        self.most_recent = most_recent;
        self
    }

    /// Intern a basic overlap constraint.
    pub fn basic(self, pool: &ConstraintPool) -> Arc<TimeConstraint> {
        pool.get_or_create(self.finish(TimeConstraintKind::Basic))
    }

    /// Intern a duration-bounded constraint.
    ///
    /// # Errors
    ///
    /// [`ConstraintError::InvalidDuration`] if `min_duration_s >= max_duration_s`.
    pub fn bounded(
        self,
        min_duration_s: u64,
        max_duration_s: u64,
        pool: &ConstraintPool,
    ) -> Result<Arc<TimeConstraint>, ConstraintError> {
        if min_duration_s >= max_duration_s {
            return Err(ConstraintError::InvalidDuration {
                min_duration_s,
                max_duration_s,
            });
        }
        Ok(pool.get_or_create(self.finish(TimeConstraintKind::Bounded {
            min_duration_s,
            max_duration_s,
        })))
    }

    /// Intern a strict (containment) constraint.
    pub fn strict(self, pool: &ConstraintPool) -> Arc<TimeConstraint> {
        pool.get_or_create(self.finish(TimeConstraintKind::Strict))
    }

    /// Intern a constraint carrying child constraints.
    pub fn multi(
        self,
        children: Vec<Arc<TimeConstraint>>,
        pool: &ConstraintPool,
    ) -> Arc<TimeConstraint> {
        pool.get_or_create(self.finish(TimeConstraintKind::Multi { children }))
    }

    fn finish(self, kind: TimeConstraintKind) -> TimeConstraint {
        TimeConstraint {
            key: self.key,
            min_ms: self.min_ms,
            max_ms: self.max_ms,
            negate: self.negate,
            most_recent: self.most_recent,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: i64 = 1_000;

    fn pool() -> ConstraintPool {
        ConstraintPool::new()
    }

    #[test]
    fn test_basic_overlap() {
        let pool = pool();
        let c = TimeConstraint::builder(100, 200).basic(&pool);
        assert!(c.check(&TimeSpan::new(150, 250)));
        assert!(!c.check(&TimeSpan::new(200, 300)));
        assert!(!c.check(&TimeSpan::new(0, 100)));
    }

    #[test]
    fn test_negated_overlap() {
        let pool = pool();
        let c = TimeConstraint::builder(100, 200).negated(true).basic(&pool);
        assert!(!c.check(&TimeSpan::new(150, 250)));
        assert!(c.check(&TimeSpan::new(300, 400)));
    }

    #[test]
    fn test_timeless_always_passes() {
        let pool = pool();
        let plain = TimeConstraint::builder(100, 200).basic(&pool);
        let negated = TimeConstraint::builder(100, 200).negated(true).basic(&pool);
        assert!(plain.check(&TimeSpan::Timeless));
        assert!(negated.check(&TimeSpan::Timeless));
    }

    #[test]
    fn test_unbounded_spans() {
        let pool = pool();
        let c = TimeConstraint::builder(100, 200).basic(&pool);
        assert!(c.check(&TimeSpan::up_to(150)));
        assert!(c.check(&TimeSpan::starting_at(0)));
        assert!(!c.check(&TimeSpan::starting_at(200)));
    }

    #[test]
    fn test_negative_composite_check() {
        let pool = pool();
        let c = TimeConstraint::builder(100, 200).negated(true).basic(&pool);
        let overlapping = TimeSpan::new(150, 160);
        let clear_a = TimeSpan::new(0, 50);
        let clear_b = TimeSpan::new(300, 400);

        assert!(!c.check_all(&[overlapping, clear_b]));
        assert!(c.check_all(&[clear_a, clear_b]));
    }

    #[test]
    fn test_positive_composite_check_is_any() {
        let pool = pool();
        let c = TimeConstraint::builder(100, 200).basic(&pool);
        assert!(c.check_all(&[TimeSpan::new(0, 50), TimeSpan::new(150, 160)]));
        assert!(!c.check_all(&[TimeSpan::new(0, 50), TimeSpan::new(300, 400)]));
        assert!(!c.check_all(&[]));
    }

    #[test]
    fn test_bounded_duration_boundaries() {
        let pool = pool();
        let c = TimeConstraint::builder(0, 1_000 * SECOND)
            .bounded(10, 60, &pool)
            .unwrap();

        assert!(c.check(&TimeSpan::new(0, 60 * SECOND)), "max is inclusive");
        assert!(
            !c.check(&TimeSpan::new(0, 60 * SECOND + 1)),
            "one millisecond past max"
        );
        assert!(!c.check(&TimeSpan::new(0, 10 * SECOND)), "min is exclusive");
        assert!(c.check(&TimeSpan::new(0, 10 * SECOND + 1)));
    }

    #[test]
    fn test_bounded_rejects_unbounded_span() {
        let pool = pool();
        let c = TimeConstraint::builder(0, 1_000 * SECOND)
            .bounded(10, 60, &pool)
            .unwrap();
        assert!(!c.check(&TimeSpan::starting_at(0)));
    }

    #[test]
    fn test_bounded_invalid_durations() {
        let pool = pool();
        let err = TimeConstraint::builder(0, 100).bounded(60, 60, &pool);
        assert!(matches!(err, Err(ConstraintError::InvalidDuration { .. })));
        let err = TimeConstraint::builder(0, 100).bounded(61, 60, &pool);
        assert!(err.is_err());
        assert_eq!(pool.len(), 0, "failed constructions are not pooled");
    }

    #[test]
    fn test_strict_containment() {
        let pool = pool();
        let c = TimeConstraint::builder(100, 200).strict(&pool);
        assert!(c.check(&TimeSpan::new(120, 180)));
        assert!(!c.check(&TimeSpan::new(150, 250)));
    }

    #[test]
    fn test_multi_children_are_informational() {
        let pool = pool();
        let child = TimeConstraint::builder(0, 10).basic(&pool);
        let multi = TimeConstraint::builder(0, 1_000).multi(vec![child], &pool);

        let span = TimeSpan::new(500, 600);
        assert!(multi.check(&span), "own range overlaps");
        assert!(!multi.children_pass(&span), "child does not");
    }

    #[test]
    fn test_builder_for_timeless_span_is_unbounded() {
        let pool = pool();
        let c = TimeConstraint::builder_for_span(&TimeSpan::Timeless).basic(&pool);
        assert_eq!(c.min_ms(), UNBOUNDED_START);
        assert_eq!(c.max_ms(), UNBOUNDED_END);
        assert!(c.check(&TimeSpan::new(-5, 5)));
    }
}
