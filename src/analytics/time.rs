use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Timelike, Utc};
use parking_lot::Mutex;

/// Source of wall-clock time for the analytics kernel.
///
/// The returned instant carries its local offset so that the calendar day
/// and hour bucket are taken from the caller's local clock, not from UTC.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// A single observation of the clock, split into the pieces the store needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    pub at: DateTime<Utc>,
    pub day: NaiveDate,
    pub hour: u8,
}

impl Moment {
    pub fn observe(clock: &dyn Clock) -> Self {
        Self::from_local(clock.now())
    }

    pub fn from_local(local: DateTime<FixedOffset>) -> Self {
        Self {
            at: local.with_timezone(&Utc),
            day: local.date_naive(),
            // hour() is always 0..=23
            hour: local.hour() as u8,
        }
    }
}

/// Host clock in the process's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Hand-driven clock. Time only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Parses an RFC 3339 timestamp such as `2024-03-01T09:30:00+00:00`.
    pub fn at(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(rfc3339).map(Self::new)
    }

    pub fn set(&self, to: DateTime<FixedOffset>) {
        *self.now.lock() = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock()
    }
}
