use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};

/// Source of "now" in the service's configured zone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock shifted into a fixed offset (no DST rules are applied).
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// A single reading of the clock, taken once per operation so that the day a
/// record is resolved for and the time written into it never disagree.
#[derive(Debug, Clone, Copy)]
pub struct Moment {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl Moment {
    pub fn read(clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            date: now.date_naive(),
            // sub-second precision is dropped, rows store HH:MM:SS
            time: now.time().with_nanosecond(0).unwrap_or(now.time()),
        }
    }
}
