use chrono::{Days, NaiveDate};
use strum_macros::{Display, EnumString};

use crate::model::attendance::AttendanceRecord;

/// What happens to rows pushed out of the active partition by the row cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum RolloverPolicy {
    /// Overflow stays readable in the sealed previous partition.
    #[default]
    Migrate,
    /// Overflow is dropped. Loses history; kept for compatibility with old data files.
    Truncate,
}

#[derive(Debug, Clone, Copy)]
pub struct RetentionLimits {
    pub month_limit: u32,
    pub row_limit: usize,
}

#[derive(Debug, Default)]
pub struct RetentionOutcome {
    /// Rows that belong in the active partition, oldest first.
    pub kept: Vec<AttendanceRecord>,
    /// Rows beyond the cap. Only non-empty when `rollover` is set.
    pub overflow: Vec<AttendanceRecord>,
    /// Rows older than the horizon.
    pub expired: usize,
    pub rollover: bool,
}

impl RetentionOutcome {
    /// True when the partition has to be rewritten.
    pub fn changed(&self) -> bool {
        self.expired > 0 || self.rollover
    }

    /// Moves the (phone, date) row back from the overflow into the active rows,
    /// so that the current day is never split across partitions. The oldest
    /// kept row takes its place in the overflow, keeping the cap exact.
    pub fn reclaim(&mut self, phone: &str, date: NaiveDate) -> bool {
        let Some(idx) = self.overflow.iter().position(|r| r.key_matches(phone, date)) else {
            return false;
        };
        let record = self.overflow.remove(idx);
        if !self.kept.is_empty() {
            let displaced = self.kept.remove(0);
            self.overflow.push(displaced);
        }
        self.kept.push(record);
        true
    }
}

/// Oldest date still retained. Months are a flat 30 days.
pub fn horizon(today: NaiveDate, month_limit: u32) -> NaiveDate {
    let days = u64::from(month_limit) * 30;
    today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

pub fn apply_retention(
    records: Vec<AttendanceRecord>,
    today: NaiveDate,
    limits: RetentionLimits,
) -> RetentionOutcome {
    let cutoff = horizon(today, limits.month_limit);
    let total = records.len();
    let mut kept: Vec<AttendanceRecord> = records.into_iter().filter(|r| r.date >= cutoff).collect();
    let expired = total - kept.len();

    if kept.len() <= limits.row_limit {
        return RetentionOutcome {
            kept,
            overflow: Vec::new(),
            expired,
            rollover: false,
        };
    }

    // Stable, so rows of the same day keep their insertion order.
    kept.sort_by_key(|r| r.date);
    let overflow_len = kept.len() - limits.row_limit;
    let overflow: Vec<AttendanceRecord> = kept.drain(..overflow_len).collect();

    RetentionOutcome {
        kept,
        overflow,
        expired,
        rollover: true,
    }
}
