//! Visibility constraint engine
//!
//! Decides whether a tile or geometry should be handed to the renderer at
//! all. Two independent predicate families are provided:
//!
//! - **Time constraints** ([`TimeConstraint`]): overlap, duration-bounded,
//!   strict containment and multi-child constraints over a time range, with
//!   optional negation. Instances are interned in a [`ConstraintPool`].
//! - **Viewer-position constraints** ([`ViewerPositionConstraint`]): minimum
//!   and maximum viewer altitude, evaluated through a [`MapProjection`].
//!
//! [`Constraints`] bundles both with an optional location, and
//! [`MutableConstraints`] adds change notification.
//!
//! # Example
//!
//! ```
//! use tilelayer::constraint::{ConstraintPool, TimeConstraint};
//! use tilelayer::timespan::TimeSpan;
//!
//! let pool = ConstraintPool::shared();
//! let a = TimeConstraint::builder(0, 1_000).basic(&pool);
//! let b = TimeConstraint::builder(0, 1_000).basic(&pool);
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! assert!(a.check(&TimeSpan::new(500, 1_500)));
//! ```

mod composite;
mod pool;
mod time_constraint;
mod viewer;

pub use composite::{Constraints, ConstraintsChanged, MutableConstraints};
pub use pool::ConstraintPool;
pub use time_constraint::{TimeConstraint, TimeConstraintBuilder, TimeConstraintKind};
pub use viewer::{Altitude, AltitudeReference, MapProjection, ViewerPositionConstraint};

#[cfg(test)]
pub(crate) use viewer::tests::SphereProjection;

use thiserror::Error;

/// Errors raised when constructing constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    /// The minimum duration is not below the maximum.
    #[error("Invalid duration bounds: min {min_duration_s}s must be less than max {max_duration_s}s")]
    InvalidDuration {
        min_duration_s: u64,
        max_duration_s: u64,
    },
}
