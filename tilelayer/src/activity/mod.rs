//! Query/activity tracking
//!
//! Tile image resolution happens on arbitrary worker tasks. Each layer owns a
//! [`QueryTracker`] that counts the requests in flight and keeps a single
//! user-visible activity (for example a status-bar entry) labelled
//! `"<layer> Tile Downloads <n>"` alive while the count is non-zero.
//!
//! Tile nodes report through the [`RequestObserver`] trait, so every child of
//! a layer's tree feeds the same counter as its root.

mod tracker;

pub use tracker::{activity_label, QueryTracker};

use parking_lot::Mutex;
use tracing::{debug, info};

/// Receives start/completion notifications for tile image requests.
pub trait RequestObserver: Send + Sync {
    /// A request was issued.
    fn request_started(&self);

    /// A previously started request finished, successfully or not.
    fn request_completed(&self);
}

/// A live, externally visible activity.
pub trait Activity: Send + Sync {
    /// Replace the activity's label.
    fn set_label(&self, label: &str);

    /// Mark the activity finished. Called exactly once.
    fn complete(&self);
}

/// Creates activities. Implemented by the host UI.
pub trait ActivitySink: Send + Sync {
    /// Begin a new activity with an initial label.
    fn begin(&self, label: &str) -> Box<dyn Activity>;
}

/// Activity sink that reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingActivitySink;

impl ActivitySink for LoggingActivitySink {
    fn begin(&self, label: &str) -> Box<dyn Activity> {
        info!(activity = label, "Activity started");
        Box::new(LoggingActivity {
            label: Mutex::new(label.to_string()),
        })
    }
}

struct LoggingActivity {
    label: Mutex<String>,
}

impl Activity for LoggingActivity {
    fn set_label(&self, label: &str) {
        debug!(activity = label, "Activity updated");
        *self.label.lock() = label.to_string();
    }

    fn complete(&self) {
        info!(activity = %self.label.lock(), "Activity complete");
    }
}

#[cfg(test)]
pub(crate) use tracker::tests::RecordingSink;
