use std::cmp;
use std::fmt;
use std::time;

use chrono::{DateTime, Utc};

const MAX_NANOSEC: u32 = 1_999_999_999;
const NANOS_PER_MILLI: u32 = 1_000_000;

/// An instant in time, held as seconds and nanoseconds past the Unix epoch (UTC).
///
/// On the wire, compact output carries it as milliseconds since the epoch, so anything finer than
/// a millisecond is dropped. Verbose output carries an ISO-8601 string with millisecond precision.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    sec: i64,
    nano: u32,
}

impl Timestamp {
    /// Create a timestamp from a raw seconds + nanoseconds value. Nanoseconds may run into a
    /// second second for leap seconds, but no further.
    pub fn from_utc(sec: i64, nano: u32) -> Option<Timestamp> {
        if nano > MAX_NANOSEC {
            None
        } else {
            Some(Timestamp { sec, nano })
        }
    }

    pub fn from_sec(sec: i64) -> Timestamp {
        Timestamp { sec, nano: 0 }
    }

    /// Create a timestamp from milliseconds since the Unix epoch.
    pub fn from_millis(millis: i64) -> Timestamp {
        Timestamp {
            sec: millis.div_euclid(1000),
            nano: (millis.rem_euclid(1000) as u32) * NANOS_PER_MILLI,
        }
    }

    /// Return the UNIX timestamp (number of seconds since January 1, 1970 0:00:00 UTC).
    pub fn timestamp_utc(&self) -> i64 {
        self.sec
    }

    /// Returns the number of nanoseconds past the second count.
    pub fn timestamp_subsec_nanos(&self) -> u32 {
        self.nano
    }

    /// Milliseconds since the Unix epoch, rounded toward negative infinity. Saturates at the
    /// limits of `i64`.
    pub fn timestamp_millis(&self) -> i64 {
        self.sec
            .saturating_mul(1000)
            .saturating_add((self.nano / NANOS_PER_MILLI) as i64)
    }

    /// Render as `yyyy-MM-ddTHH:mm:ss.SSSZ`. Fails for instants chrono can't place on a calendar.
    pub fn to_iso8601(&self) -> Option<String> {
        DateTime::<Utc>::from_timestamp(self.sec, self.nano)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
    }

    /// Create a Timestamp based on the current system time. Fails if the system clock reads
    /// before the Unix Epoch.
    pub fn now() -> Option<Timestamp> {
        match time::SystemTime::now().duration_since(time::SystemTime::UNIX_EPOCH) {
            Ok(t) => Timestamp::from_utc(t.as_secs() as i64, t.subsec_nanos()),
            Err(_) => None,
        }
    }
}

impl cmp::Ord for Timestamp {
    fn cmp(&self, other: &Timestamp) -> cmp::Ordering {
        if self.sec == other.sec {
            self.nano.cmp(&other.nano)
        } else {
            self.sec.cmp(&other.sec)
        }
    }
}

impl cmp::PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Timestamp) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UTC: {} sec + {} ns", self.sec, self.nano)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Timestamp {
        Timestamp {
            sec: dt.timestamp(),
            nano: dt.timestamp_subsec_nanos(),
        }
    }
}
