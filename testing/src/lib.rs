//! # RSVP Testing
//!
//! Testing utilities and helpers for the RSVP service.
//!
//! This crate provides:
//! - [`FixedClock`]: Deterministic time
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - [`InMemoryBackend`]: The three tables in memory, with per-operation call
//!   counters and failure injection
//!
//! ## Example
//!
//! ```ignore
//! use rsvp_testing::{InMemoryBackend, BackendOp};
//!
//! #[tokio::test]
//! async fn public_feed_is_batched() {
//!     let backend = Arc::new(InMemoryBackend::new());
//!     let alice = backend.add_profile("Alice");
//!     backend.seed_event(event_by(alice));
//!
//!     let queries = EventQueries::new(backend.clone());
//!     queries.fetch_public_events().await?;
//!
//!     assert_eq!(backend.calls(BackendOp::ProfilesByIds), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use rsvp_core::environment::Clock;

pub mod backend;
pub mod reducer_test;

/// Deterministic stand-ins for environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::NaiveDate;

    /// A clock that never moves.
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use rsvp_core::environment::Clock;
    /// use rsvp_testing::FixedClock;
    ///
    /// let day = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
    /// let clock = FixedClock::on(day);
    /// assert_eq!(clock.today(), day);
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Pinned to `time`.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Pinned to midnight UTC on `day`.
        #[must_use]
        pub fn on(day: NaiveDate) -> Self {
            Self::new(day.and_time(chrono::NaiveTime::MIN).and_utc())
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Midnight UTC on 2025-05-01, before every seeded test event.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::on(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap_or_default())
    }
}

// Re-export commonly used items
pub use backend::{BackendOp, InMemoryBackend};
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
