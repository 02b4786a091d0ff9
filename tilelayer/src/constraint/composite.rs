//! Composite constraints attached to a layer or geometry.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use crate::geo::{LatLonAlt, ModelPosition};
use crate::timespan::TimeSpan;

use super::time_constraint::TimeConstraint;
use super::viewer::{MapProjection, ViewerPositionConstraint};

/// Channel capacity for change notifications.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// The set of constraints gating one renderable.
///
/// Absent constraints always pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub time: Option<Arc<TimeConstraint>>,
    pub viewer_position: Option<ViewerPositionConstraint>,
    pub location: Option<LatLonAlt>,
}

impl Constraints {
    /// Constraints with only a time component.
    pub fn with_time(time: Arc<TimeConstraint>) -> Self {
        Self {
            time: Some(time),
            ..Default::default()
        }
    }

    /// Check a span against the time constraint.
    pub fn check_time(&self, span: &TimeSpan) -> bool {
        self.time.as_ref().map_or(true, |c| c.check(span))
    }

    /// Check a set of spans against the time constraint.
    pub fn check_times(&self, spans: &[TimeSpan]) -> bool {
        self.time.as_ref().map_or(true, |c| c.check_all(spans))
    }

    /// Check the viewer position constraint.
    pub fn check_viewer(&self, viewer: &ModelPosition, projection: &dyn MapProjection) -> bool {
        self.viewer_position
            .as_ref()
            .map_or(true, |c| c.check(viewer, projection))
    }
}

/// Which part of a [`MutableConstraints`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintsChanged {
    Time,
    ViewerPosition,
    Location,
}

/// Constraints that can be edited after creation.
///
/// Subscribers receive a [`ConstraintsChanged`] message whenever a value
/// actually changes. Dropping a receiver unsubscribes it. The time constraint
/// passed at construction is remembered so [`MutableConstraints::reset_time`]
/// can restore it.
#[derive(Debug)]
pub struct MutableConstraints {
    current: RwLock<Constraints>,
    original_time: Option<Arc<TimeConstraint>>,
    changes: broadcast::Sender<ConstraintsChanged>,
}

impl MutableConstraints {
    pub fn new(initial: Constraints) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            original_time: initial.time.clone(),
            current: RwLock::new(initial),
            changes,
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ConstraintsChanged> {
        self.changes.subscribe()
    }

    /// Current values.
    pub fn snapshot(&self) -> Constraints {
        self.current.read().clone()
    }

    pub fn set_time(&self, time: Option<Arc<TimeConstraint>>) {
        let changed = {
            let mut current = self.current.write();
            let same = match (&current.time, &time) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a == b,
                (None, None) => true,
                _ => false,
            };
            if !same {
                current.time = time;
            }
            !same
        };
        if changed {
            self.notify(ConstraintsChanged::Time);
        }
    }

    pub fn set_viewer_position(&self, viewer_position: Option<ViewerPositionConstraint>) {
        let changed = {
            let mut current = self.current.write();
            let changed = current.viewer_position != viewer_position;
            current.viewer_position = viewer_position;
            changed
        };
        if changed {
            self.notify(ConstraintsChanged::ViewerPosition);
        }
    }

    pub fn set_location(&self, location: Option<LatLonAlt>) {
        let changed = {
            let mut current = self.current.write();
            let changed = current.location != location;
            current.location = location;
            changed
        };
        if changed {
            self.notify(ConstraintsChanged::Location);
        }
    }

    /// Restore the time constraint given at construction.
    pub fn reset_time(&self) {
        self.set_time(self.original_time.clone());
    }

    fn notify(&self, change: ConstraintsChanged) {
        // No subscribers is fine
        if self.changes.send(change).is_err() {
            debug!(?change, "Constraint change with no subscribers");
        }
    }
}
