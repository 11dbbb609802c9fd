use chrono::NaiveDate;

use crate::model::attendance::AttendanceRecord;

/// Who is punching, as known at the time of the request.
#[derive(Debug, Clone)]
pub struct Snapshot<'a> {
    pub phone: &'a str,
    pub name: &'a str,
    pub departments: &'a str,
}

/// Returns the index of `phone`'s row for `today`, appending a fresh row
/// stamped with the snapshot when none exists yet.
pub fn resolve_today_record(
    records: &mut Vec<AttendanceRecord>,
    who: &Snapshot<'_>,
    today: NaiveDate,
) -> (usize, bool) {
    if let Some(idx) = records.iter().position(|r| r.key_matches(who.phone, today)) {
        return (idx, false);
    }
    records.push(AttendanceRecord::new(
        today,
        who.phone,
        who.name,
        who.departments,
    ));
    (records.len() - 1, true)
}
