//! # Boxoffice Testing
//!
//! Testing utilities and helpers for the boxoffice architecture.
//!
//! This crate provides:
//! - Deterministic clocks (`FixedClock`, `ManualClock`)
//! - The `ReducerTest` given/when/then harness and effect assertions
//! - An in-memory datagram transport for driving a `Store` without sockets
//!
//! ## Example
//!
//! ```ignore
//! use boxoffice_testing::{ManualClock, test_clock};
//!
//! let clock = Arc::new(ManualClock::starting_at(test_clock().now()));
//! let env = environment_with(clock.clone());
//!
//! // ... reserve something ...
//! clock.advance(chrono::Duration::seconds(6));
//! // ... the reservation is now past its deadline ...
//! ```

use boxoffice_core::environment::Clock;
use chrono::{DateTime, Utc};

pub mod reducer_test;
pub mod transport;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use boxoffice_testing::mocks::FixedClock;
    /// use boxoffice_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    ///
    /// Shared behind an `Arc` between a test and the environment under test,
    /// so the test can push time past a deadline between two actions.
    ///
    /// # Example
    ///
    /// ```
    /// use boxoffice_testing::mocks::ManualClock;
    /// use boxoffice_testing::test_clock;
    /// use boxoffice_core::environment::Clock;
    /// use chrono::Duration;
    ///
    /// // Start on a whole millisecond; finer precision is not kept
    /// let start = test_clock().now();
    /// let clock = ManualClock::starting_at(start);
    /// clock.advance(Duration::seconds(5));
    /// assert_eq!((clock.now() - start).num_seconds(), 5);
    /// ```
    #[derive(Debug)]
    pub struct ManualClock {
        millis: AtomicI64,
    }

    impl ManualClock {
        /// Create a clock frozen at `start` (millisecond precision)
        #[must_use]
        pub fn starting_at(start: DateTime<Utc>) -> Self {
            Self {
                millis: AtomicI64::new(start.timestamp_millis()),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
        }

        /// Jump to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use reducer_test::ReducerTest;
pub use transport::{ChannelPeer, ChannelTransport, channel_transport};
