// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! All things time-related.

pub use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono::{NaiveTime, TimeZone, Timelike};
pub use chrono_tz::Tz;

/// Tells time and returns the time.
///
/// Generally you will want to retrieve time using [`SystemClock`],
/// but in tests you may want to implement a `Clock` with a fixed time.
pub trait Clock {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Interacts with the system clock to get the current time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Converts a Reddit timestamp (fractional seconds since the epoch) into a
/// UTC date.
///
/// Returns `None` if the timestamp is out of range.
pub fn from_timestamp(timestamp: f64) -> Option<DateTime<Utc>> {
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

/// Midnight at the start of `date` in the given timezone.
///
/// Returns `None` if midnight does not exist on that date (a DST gap).
pub fn midnight(date: NaiveDate, tz: Tz) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
}

/// Formats a date as `YYYY-MM-DD HH:MM:SS±HH:MM` in the given timezone.
///
/// Microseconds are included only when they are non-zero.
///
/// # Examples
///
/// ```
/// use sbmod::clock::{self, Tz};
/// let date = clock::from_timestamp(1730793600.0).unwrap();
/// assert_eq!(clock::display(&date, Tz::America__Los_Angeles), "2024-11-05 00:00:00-08:00");
/// ```
pub fn display(date: &DateTime<Utc>, tz: Tz) -> String {
    let local = date.with_timezone(&tz);
    if local.nanosecond() / 1_000 != 0 {
        local.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
    } else {
        local.format("%Y-%m-%d %H:%M:%S%:z").to_string()
    }
}
