//! Wall-clock access and turn arithmetic.
//!
//! RULE: Nothing in the engine reads the system time directly.
//! Handlers receive `now` from a `Clock`, so tests can pin and
//! advance time explicitly.

use crate::types::Timestamp;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Mutex;

/// Source of "now" for request handling.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn now_ts(&self) -> Timestamp {
        self.now().timestamp()
    }
}

/// Reads the operating system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used by tests and the runner's
/// simulated activity.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(ts: Timestamp) -> Self {
        let now = Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now);
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, ts: Timestamp) {
        if let (Ok(mut now), Some(t)) = (self.now.lock(), Utc.timestamp_opt(ts, 0).single()) {
            *now = t;
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        if let Ok(mut now) = self.now.lock() {
            *now += Duration::seconds(secs);
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Whole turns between `last_updated` and `now`, and the timestamp
/// the record should carry once those turns are applied.
///
/// The returned timestamp advances by exactly `turns * interval`, so the
/// partial turn in progress is kept rather than snapped away.
/// Negative elapsed time (clock skew) yields zero turns.
pub fn whole_turns_since(last_updated: Timestamp, now: Timestamp, interval_secs: i64) -> (i64, Timestamp) {
    let elapsed = now - last_updated;
    if elapsed <= 0 || interval_secs <= 0 {
        return (0, last_updated);
    }
    let turns = elapsed / interval_secs;
    (turns, last_updated + turns * interval_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_turn_is_carried_forward() {
        let (turns, advanced) = whole_turns_since(1_000, 1_000 + 25 * 60, 600);
        assert_eq!(turns, 2);
        assert_eq!(advanced, 1_000 + 1_200);
    }

    #[test]
    fn clock_skew_yields_no_turns() {
        assert_eq!(whole_turns_since(5_000, 4_000, 600), (0, 5_000));
    }

    #[test]
    fn fixed_clock_advances_only_when_told() {
        let clock = FixedClock::at(1_700_000_000);
        assert_eq!(clock.now_ts(), 1_700_000_000);
        clock.advance_secs(600);
        assert_eq!(clock.now_ts(), 1_700_000_600);
        clock.set(42);
        assert_eq!(clock.now_ts(), 42);
    }
}
