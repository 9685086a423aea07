//! # UV Index Widget Core Library
//!
//! This library provides the data types, fetch/retry client and polling state
//! machine behind the `uv-index` display widget. The widget shows the current
//! UV index for a configured location plus a short hourly and daily forecast,
//! refreshed from the public currentuvindex.com API.
//!
//! ## Architecture
//!
//! Two cooperating components, each running as its own tokio task:
//!
//! - **Poller** ([`poller`]): owns the refresh timer, suppresses overlapping
//!   requests and decides what to display when data is missing, stale or
//!   erroring. It keeps showing the last good snapshot through transient
//!   failures.
//! - **Fetcher** ([`uv_data`]): performs the HTTP round trip, validates the
//!   payload and absorbs transient failures with exponential backoff and full
//!   jitter ([`backoff`]), so the Poller sees at most one outcome per request.
//!
//! The two only talk through the notification bus in [`channel`]: requests go
//! one way, outcomes come back the other. There is no shared state.
//!
//! ### Data Flow
//! 1. **Timer fires**: Poller marks itself in-flight → sends `FETCH_UV_DATA`
//! 2. **Helper**: GET → validate → retry up to 5 attempts → `UV_DATA` / `UV_ERROR`
//! 3. **Outcome**: Poller clears in-flight → updates display → re-arms timer
//!
//! ## Core Types
//!
//! - [`UvReading`]: A single UV index value at a point in time
//! - [`UvSnapshot`]: Current reading plus the ordered forecast
//! - [`FetchOutcome`]: What one Fetcher invocation reports back

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Module declarations
pub mod backoff;
pub mod channel;
pub mod config;
pub mod poller;
pub mod renderer;
pub mod uv_data;

/// A single UV index value at a specific instant.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use uv_index_lib::UvReading;
///
/// let noon = UvReading {
///     uvi: 6.4,
///     time: Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap(),
/// };
/// assert!(noon.uvi > 6.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UvReading {
    /// UV index, roughly 0 to 11+
    pub uvi: f64,
    /// Instant the reading applies to
    pub time: DateTime<Utc>,
}

/// Current UV conditions plus forecast, as delivered by one successful fetch.
///
/// Snapshots are replaced wholesale on every successful fetch and never
/// patched in place. A stale snapshot stays on display when a later fetch
/// fails.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use uv_index_lib::{UvReading, UvSnapshot};
///
/// let now = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
/// let snapshot = UvSnapshot {
///     now: UvReading { uvi: 6.4, time: now },
///     forecast: vec![
///         UvReading { uvi: 6.9, time: now + Duration::hours(1) },
///         UvReading { uvi: 5.8, time: now + Duration::hours(2) },
///     ],
/// };
///
/// assert_eq!(snapshot.forecast.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UvSnapshot {
    /// Reading for the current hour
    pub now: UvReading,
    /// Upcoming readings in chronological order
    #[serde(default)]
    pub forecast: Vec<UvReading>,
}

/// Result of one Fetcher invocation, including all of its retries.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchOutcome {
    /// An attempt succeeded
    Success(UvSnapshot),
    /// The request was given up on
    Failure {
        /// Message of the last error seen
        message: String,
        /// True when the backoff loop ran out of attempts
        exhausted_retries: bool,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}
