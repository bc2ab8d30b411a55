//! Wall clock abstraction, so timestamp stamping can be driven by tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now().trunc_subsecs(3)
	}
}

/// Manually driven clock. Clones share the same time.
///
/// ```rust
/// use chrono::{Duration, TimeZone, Utc};
/// use gs_core::time_source::{Clock, FakeClock};
///
/// let clock = FakeClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
/// clock.advance(Duration::seconds(5));
/// assert_eq!(clock.now(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 5).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct FakeClock {
	time: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
	pub fn new(start: DateTime<Utc>) -> Self {
		Self {
			time: Arc::new(Mutex::new(start)),
		}
	}

	pub fn advance(&self, delta: Duration) {
		*self.time.lock() += delta;
	}

	pub fn set(&self, at: DateTime<Utc>) {
		*self.time.lock() = at;
	}
}

impl Clock for FakeClock {
	fn now(&self) -> DateTime<Utc> {
		*self.time.lock()
	}
}
