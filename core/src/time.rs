use timelib::OffsetDateTime;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Represents an instant in time, defined by the number of milliseconds since the UNIX Epoch
#[derive(Serialize, Deserialize, PartialEq, PartialOrd, Eq, Ord, Copy, Clone, Hash)]
pub struct Time(i64);

impl fmt::Debug for Time {
    /// Write the time as a formatted date
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match OffsetDateTime::from_unix_timestamp_nanos(self.0 as i128 * 1_000_000) {
            Ok(dt) => write!(f, "{:02}-{:02}-{:02} {:02}:{:02}:{:02}",
                dt.month() as u8, dt.day(), dt.year() % 100,
                dt.hour(), dt.minute(), dt.second()),
            Err(_) => write!(f, "Time({})", self.0)
        }
    }
}

impl Into<i64> for Time {
    fn into(self) -> i64 {
        self.0
    }
}

impl From<i64> for Time {
    fn from(t: i64) -> Time {
        Time(t)
    }
}

impl Time {
    pub fn from_milliseconds(ms: i64) -> Time {
        Time(ms)
    }

    pub fn from_seconds(s: i64) -> Time {
        Time::from_milliseconds(s * 1000i64)
    }

    /// Return the current time in ms since the epoch.
    pub fn current() -> Time {
        let ms = SystemTime::now().duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64 * 1_000i64 + d.subsec_millis() as i64)
            .unwrap_or(0);
        Time(ms)
    }

    /// Return the time in milliseconds as a simple integer representation.
    pub fn millis(&self) -> i64 {
        self.0
    }

    /// This instant shifted forward by a duration.
    pub fn after(&self, d: Duration) -> Time {
        Time(self.0.saturating_add(duration_millis(d)))
    }

    /// Time left between `now` and this instant, or `None` once it has been reached.
    pub fn remaining_from(&self, now: Time) -> Option<Duration> {
        if now.0 >= self.0 { None }
        else { Some(Duration::from_millis((self.0 - now.0) as u64)) }
    }
}

#[inline]
fn duration_millis(d: Duration) -> i64 {
    d.as_secs() as i64 * 1_000i64 + d.subsec_millis() as i64
}


/// Source of the current time for everything that schedules or expires state.
pub trait Clock: Send {
    fn now(&self) -> Time;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time { Time::current() }
}

/// A clock which only moves when told to. Clones share the same instant, so a test can keep one
/// handle while the service owns another.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn new(start: Time) -> ManualClock {
        ManualClock(Arc::new(AtomicI64::new(start.millis())))
    }

    pub fn advance(&self, d: Duration) {
        self.0.fetch_add(duration_millis(d), Ordering::SeqCst);
    }

    pub fn set(&self, t: Time) {
        self.0.store(t.millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Time { Time(self.0.load(Ordering::SeqCst)) }
}


#[test]
fn debug_print() {
    let t = Time(1505679102000);

    assert_eq!(format!("{:?}", t), "09-17-17 20:11:42");
}

#[test]
fn current() {
    let t = Time::current();
    let time_of_writing = Time::from_seconds(1506487146i64);
    assert!(t > time_of_writing);
}

#[test]
fn remaining_until_reached() {
    let expiry = Time::from_seconds(100);
    assert_eq!(expiry.remaining_from(Time::from_seconds(40)), Some(Duration::from_secs(60)));
    assert_eq!(expiry.remaining_from(Time::from_seconds(100)), None);
    assert_eq!(expiry.remaining_from(Time::from_seconds(101)), None);
}

#[test]
fn manual_clock_shared() {
    let clock = ManualClock::new(Time::from_seconds(10));
    let handle = clock.clone();
    handle.advance(Duration::from_millis(1500));
    assert_eq!(clock.now(), Time::from_milliseconds(11_500));
}
