//! Time source and time-derived workout identifiers.
//!
//! Ids are the decimal millisecond timestamp truncated to its trailing digits.
//! Two records created inside the same millisecond (or one full rollover of the
//! dropped leading digits apart) get the same id; the engine resolves such a
//! collision by letting the newer record overwrite the older one.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Number of trailing timestamp digits kept in an id.
pub const DEFAULT_ID_DIGITS: usize = 10;

/// Source of the current time for ids, descriptions and deferred tasks.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock. Clones share the same instant, so a host (or a test)
/// can keep a handle and move time forward after handing a clone to the engine.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: Rc::new(Cell::new(start.timestamp_millis())),
        }
    }

    /// Clock starting at a unix timestamp in milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        Self {
            millis: Rc::new(Cell::new(millis)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.set(self.millis.get() + by.num_milliseconds());
    }

    pub fn advance_millis(&self, millis: i64) {
        self.millis.set(self.millis.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.get())
            .single()
            .unwrap_or_default()
    }
}

/// Build an id from a timestamp, keeping its last `digits` decimal digits.
pub fn workout_id_with_digits(at: DateTime<Utc>, digits: usize) -> String {
    let full = at.timestamp_millis().to_string();
    let skip = full.len().saturating_sub(digits);
    full[skip..].to_string()
}

/// Build an id from a timestamp using the default 10 trailing digits.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use workout_map::identity::workout_id;
///
/// let at = Utc.timestamp_millis_opt(1_651_174_766_786).unwrap();
/// assert_eq!(workout_id(at), "1174766786");
/// ```
pub fn workout_id(at: DateTime<Utc>) -> String {
    workout_id_with_digits(at, DEFAULT_ID_DIGITS)
}
