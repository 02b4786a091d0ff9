//! Per-layer in-flight request counter.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use super::{Activity, ActivitySink, RequestObserver};

/// Label shown while `count` requests are in flight for `display_name`.
pub fn activity_label(display_name: &str, count: usize) -> String {
    format!("{} Tile Downloads {}", display_name, count)
}

#[derive(Default)]
struct TrackerState {
    count: usize,
    activity: Option<Box<dyn Activity>>,
}

/// Counts in-flight tile requests for one layer.
///
/// All mutations take the same lock, so start and completion calls from
/// different worker threads are serialized. On the `0 -> 1` transition an
/// activity is begun through the [`ActivitySink`]; every transition updates
/// its label with the live count; on the transition back to zero the
/// activity is completed and released.
pub struct QueryTracker {
    display_name: String,
    sink: Arc<dyn ActivitySink>,
    state: Mutex<TrackerState>,
}

impl QueryTracker {
    /// Create a tracker.
    ///
    /// # Arguments
    ///
    /// * `display_name` - Layer name used in the activity label
    /// * `sink` - Where activities are created
    pub fn new(display_name: impl Into<String>, sink: Arc<dyn ActivitySink>) -> Self {
        Self {
            display_name: display_name.into(),
            sink,
            state: Mutex::new(TrackerState::default()),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Requests currently in flight.
    pub fn count(&self) -> usize {
        self.state.lock().count
    }

    /// Returns true while an activity is open.
    pub fn is_active(&self) -> bool {
        self.state.lock().activity.is_some()
    }
}

impl RequestObserver for QueryTracker {
    fn request_started(&self) {
        let mut state = self.state.lock();
        state.count += 1;
        let label = activity_label(&self.display_name, state.count);
        trace!(layer = %self.display_name, count = state.count, "Tile request started");

        match &state.activity {
            Some(activity) => activity.set_label(&label),
            None => state.activity = Some(self.sink.begin(&label)),
        }
    }

    fn request_completed(&self) {
        let mut state = self.state.lock();
        if state.count == 0 {
            warn!(layer = %self.display_name, "Tile request completed without a matching start");
            return;
        }
        state.count -= 1;
        let label = activity_label(&self.display_name, state.count);
        trace!(layer = %self.display_name, count = state.count, "Tile request completed");

        if let Some(activity) = &state.activity {
            activity.set_label(&label);
        }
        if state.count == 0 {
            if let Some(activity) = state.activity.take() {
                activity.complete();
            }
        }
    }
}

impl std::fmt::Debug for QueryTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("QueryTracker")
            .field("display_name", &self.display_name)
            .field("count", &state.count)
            .field("active", &state.activity.is_some())
            .finish()
    }
}
