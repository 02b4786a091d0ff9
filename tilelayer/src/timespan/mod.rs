//! Time spans used to gate tile and geometry visibility.
//!
//! Spans are half-open `[start, end)` intervals in milliseconds since the Unix
//! epoch. Unbounded ends are represented with `i64::MIN` / `i64::MAX`
//! sentinels so overlap tests stay simple integer comparisons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel for an unbounded start.
pub const UNBOUNDED_START: i64 = i64::MIN;

/// Sentinel for an unbounded end.
pub const UNBOUNDED_END: i64 = i64::MAX;

/// A span of time attached to a tile, layer or geometry.
///
/// Deserialized spans go through [`TimeSpan::new`], so a reversed `Bounded`
/// span in layer JSON is stored in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SpanRepr")]
pub enum TimeSpan {
    /// Data that is valid at all times.
    Timeless,
    /// A half-open interval in epoch milliseconds.
    Bounded { start_ms: i64, end_ms: i64 },
}

#[derive(Deserialize)]
enum SpanRepr {
    Timeless,
    Bounded { start_ms: i64, end_ms: i64 },
}

impl From<SpanRepr> for TimeSpan {
    fn from(repr: SpanRepr) -> Self {
        match repr {
            SpanRepr::Timeless => TimeSpan::Timeless,
            SpanRepr::Bounded { start_ms, end_ms } => TimeSpan::new(start_ms, end_ms),
        }
    }
}

impl TimeSpan {
    /// Create a span from epoch milliseconds. Arguments are swapped if given
    /// in reverse order.
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        if start_ms <= end_ms {
            Self::Bounded { start_ms, end_ms }
        } else {
            Self::Bounded {
                start_ms: end_ms,
                end_ms: start_ms,
            }
        }
    }

    /// A zero-length span at a single instant.
    pub fn instant(at_ms: i64) -> Self {
        Self::Bounded {
            start_ms: at_ms,
            end_ms: at_ms,
        }
    }

    /// A span with no start.
    pub fn up_to(end_ms: i64) -> Self {
        Self::new(UNBOUNDED_START, end_ms)
    }

    /// A span with no end.
    pub fn starting_at(start_ms: i64) -> Self {
        Self::new(start_ms, UNBOUNDED_END)
    }

    /// Create a span from two UTC timestamps.
    pub fn from_datetimes(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(start.timestamp_millis(), end.timestamp_millis())
    }

    pub fn is_timeless(&self) -> bool {
        matches!(self, Self::Timeless)
    }

    pub fn is_unbounded_start(&self) -> bool {
        matches!(self, Self::Bounded { start_ms, .. } if *start_ms == UNBOUNDED_START)
    }

    pub fn is_unbounded_end(&self) -> bool {
        matches!(self, Self::Bounded { end_ms, .. } if *end_ms == UNBOUNDED_END)
    }

    /// Start and end in epoch milliseconds, `None` for timeless spans.
    pub fn bounds_ms(&self) -> Option<(i64, i64)> {
        match self {
            Self::Timeless => None,
            Self::Bounded { start_ms, end_ms } => Some((*start_ms, *end_ms)),
        }
    }

    /// Duration in milliseconds, `None` if timeless or unbounded on either end.
    ///
    /// Saturates at `i64::MAX` for spans wider than an `i64` can hold.
    pub fn duration_ms(&self) -> Option<i64> {
        match self {
            Self::Timeless => None,
            _ if self.is_unbounded_start() || self.is_unbounded_end() => None,
            Self::Bounded { start_ms, end_ms } => Some(end_ms.saturating_sub(*start_ms)),
        }
    }

    /// Duration rounded up to whole seconds.
    pub fn duration_ceil_secs(&self) -> Option<i64> {
        self.duration_ms()
            .map(|ms| ms.div_euclid(1000) + i64::from(ms.rem_euclid(1000) != 0))
    }

    /// Returns true if this span overlaps the half-open interval `[min, max)`.
    ///
    /// Zero-length spans overlap when the instant lies inside the interval.
    /// Timeless spans overlap everything.
    pub fn overlaps_range(&self, min_ms: i64, max_ms: i64) -> bool {
        match self {
            Self::Timeless => true,
            Self::Bounded { start_ms, end_ms } => {
                if start_ms == end_ms {
                    *start_ms >= min_ms && *start_ms < max_ms
                } else {
                    *start_ms < max_ms && *end_ms > min_ms
                }
            }
        }
    }

    /// Returns true if this span lies entirely inside `[min, max)`.
    pub fn within_range(&self, min_ms: i64, max_ms: i64) -> bool {
        match self {
            Self::Timeless => min_ms == UNBOUNDED_START && max_ms == UNBOUNDED_END,
            Self::Bounded { start_ms, end_ms } => {
                *start_ms >= min_ms && (*end_ms <= max_ms || max_ms == UNBOUNDED_END)
            }
        }
    }
}

impl std::fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeless => write!(f, "TIMELESS"),
            Self::Bounded { start_ms, end_ms } => {
                let fmt_end = |ms: i64, unbounded: i64| {
                    if ms == unbounded {
                        "UNBOUNDED".to_string()
                    } else {
                        DateTime::<Utc>::from_timestamp_millis(ms)
                            .map(|d| d.to_rfc3339())
                            .unwrap_or_else(|| ms.to_string())
                    }
                };
                write!(
                    f,
                    "{} -> {}",
                    fmt_end(*start_ms, UNBOUNDED_START),
                    fmt_end(*end_ms, UNBOUNDED_END)
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_orders_arguments() {
        assert_eq!(TimeSpan::new(10, 5), TimeSpan::new(5, 10));
    }

    #[test]
    fn test_overlap_half_open() {
        let span = TimeSpan::new(0, 100);
        assert!(span.overlaps_range(50, 150));
        assert!(!span.overlaps_range(100, 200), "end is exclusive");
        assert!(!span.overlaps_range(-100, 0), "range end is exclusive");
    }

    #[test]
    fn test_instant_overlap() {
        let at = TimeSpan::instant(100);
        assert!(at.overlaps_range(100, 101));
        assert!(!at.overlaps_range(0, 100));
    }

    #[test]
    fn test_unbounded_spans_overlap() {
        assert!(TimeSpan::up_to(10).overlaps_range(-5_000, 0));
        assert!(TimeSpan::starting_at(10).overlaps_range(1_000_000, 2_000_000));
        assert!(!TimeSpan::starting_at(10).overlaps_range(0, 10));
    }

    #[test]
    fn test_duration() {
        assert_eq!(TimeSpan::new(0, 1_500).duration_ms(), Some(1_500));
        assert_eq!(TimeSpan::new(0, 1_500).duration_ceil_secs(), Some(2));
        assert_eq!(TimeSpan::new(0, 2_000).duration_ceil_secs(), Some(2));
        assert_eq!(TimeSpan::up_to(0).duration_ms(), None);
        assert_eq!(TimeSpan::Timeless.duration_ms(), None);
    }

    #[test]
    fn test_duration_near_sentinels_saturates() {
        let wide = TimeSpan::new(-1, UNBOUNDED_END - 1);
        assert_eq!(wide.duration_ms(), Some(i64::MAX));
        assert_eq!(wide.duration_ceil_secs(), Some(i64::MAX / 1000 + 1));

        let almost = TimeSpan::new(0, UNBOUNDED_END - 1);
        assert_eq!(almost.duration_ceil_secs(), Some((i64::MAX - 1) / 1000 + 1));
    }

    #[test]
    fn test_deserialize_orders_bounded_span() {
        let span: TimeSpan =
            serde_json::from_str(r#"{"Bounded": {"start_ms": 500, "end_ms": 100}}"#).unwrap();
        assert_eq!(span, TimeSpan::new(100, 500));
        assert_eq!(span.duration_ms(), Some(400));

        let timeless: TimeSpan = serde_json::from_str(r#""Timeless""#).unwrap();
        assert!(timeless.is_timeless());

        let text = serde_json::to_string(&TimeSpan::new(1, 2)).unwrap();
        assert_eq!(serde_json::from_str::<TimeSpan>(&text).unwrap(), TimeSpan::new(1, 2));
    }

    #[test]
    fn test_from_datetimes() {
        let a = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 10).unwrap();
        assert_eq!(TimeSpan::from_datetimes(a, b).duration_ms(), Some(10_000));
    }

    #[test]
    fn test_within_range() {
        assert!(TimeSpan::new(10, 20).within_range(0, 30));
        assert!(!TimeSpan::new(10, 40).within_range(0, 30));
        assert!(TimeSpan::starting_at(10).within_range(0, UNBOUNDED_END));
    }
}
