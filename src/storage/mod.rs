//! Storage seam of the service. The engine only ever talks to [`Store`];
//! [`csv_store::CsvStore`] and [`sql_store::SqlStore`] are interchangeable.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};
use crate::model::attendance::{
    AttendanceRecord, DATE_FORMAT, format_flag, format_time, parse_flag, parse_offices, parse_time,
};
use crate::model::department::DepartmentGroup;
use crate::model::edit_log::EditLogEntry;
use crate::model::office::Office;
use crate::model::user::{User, UserUpdate};

pub mod csv_store;
pub mod seed;
pub mod sql_store;

/// A partition index and the rows it holds, in stored order.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub index: u32,
    pub records: Vec<AttendanceRecord>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user(&self, phone: &str) -> ServiceResult<Option<User>>;
    async fn list_users(&self) -> ServiceResult<Vec<User>>;
    /// Inserts or replaces the user keyed by phone.
    async fn put_user(&self, user: &User) -> ServiceResult<()>;
    /// Returns `false` when no user has that phone.
    async fn update_user(&self, phone: &str, update: &UserUpdate) -> ServiceResult<bool>;

    async fn list_offices(&self) -> ServiceResult<Vec<Office>>;
    /// Inserts or replaces the office keyed by name.
    async fn put_office(&self, office: &Office) -> ServiceResult<()>;
    async fn delete_office(&self, name: &str) -> ServiceResult<bool>;

    async fn list_departments(&self) -> ServiceResult<Vec<DepartmentGroup>>;
    async fn put_department(&self, group: &DepartmentGroup) -> ServiceResult<()>;
    async fn delete_department(&self, name: &str) -> ServiceResult<bool>;

    async fn get_setting(&self, key: &str) -> ServiceResult<Option<String>>;
    async fn put_setting(&self, key: &str, value: &str) -> ServiceResult<()>;

    /// Indexes of every attendance partition, ascending. Never empty.
    async fn partitions(&self) -> ServiceResult<Vec<u32>>;
    async fn load_partition(&self, index: u32) -> ServiceResult<Partition>;
    /// Overwrites a partition, creating it when missing.
    async fn replace_partition(&self, partition: &Partition) -> ServiceResult<()>;
    /// Inserts or updates the (phone, date) row inside one partition.
    async fn upsert_record(&self, index: u32, record: &AttendanceRecord) -> ServiceResult<()>;
    /// Drops rows dated before `cutoff` from every partition below `below`.
    /// Returns how many rows went.
    async fn prune_before(&self, cutoff: NaiveDate, below: u32) -> ServiceResult<usize>;
    /// Newest partition holding (phone, date), with the row.
    async fn find_record(
        &self,
        phone: &str,
        date: NaiveDate,
    ) -> ServiceResult<Option<(u32, AttendanceRecord)>>;

    async fn list_edits(&self) -> ServiceResult<Vec<EditLogEntry>>;
    /// Writes the audit entries and the corrected row as one unit: the row is
    /// never updated without its entries.
    async fn apply_edit(
        &self,
        index: u32,
        record: &AttendanceRecord,
        entries: &[EditLogEntry],
    ) -> ServiceResult<()>;

    /// Every row of every partition, oldest partition first.
    async fn scan_records(&self) -> ServiceResult<Vec<AttendanceRecord>> {
        let mut all = Vec::new();
        for index in self.partitions().await? {
            all.extend(self.load_partition(index).await?.records);
        }
        Ok(all)
    }

    async fn active_partition(&self) -> ServiceResult<u32> {
        Ok(self.partitions().await?.into_iter().max().unwrap_or(1))
    }
}

/// Flat text form of an attendance row, shared by both backends. Column
/// names follow the legacy workbook so old exports load unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "PhoneNumber")]
    pub phone: String,
    #[serde(rename = "IN")]
    pub in_time: String,
    #[serde(rename = "OUT")]
    pub out_time: String,
    #[serde(rename = "WFH")]
    pub wfh: String,
    #[serde(rename = "Leave")]
    pub leave: String,
    #[serde(rename = "Departments")]
    pub departments: String,
    #[serde(rename = "Office")]
    pub office: String,
}

impl From<&AttendanceRecord> for AttendanceRow {
    fn from(r: &AttendanceRecord) -> Self {
        Self {
            date: r.date.format(DATE_FORMAT).to_string(),
            name: r.name.clone(),
            phone: r.phone.clone(),
            in_time: format_time(r.in_time),
            out_time: format_time(r.out_time),
            wfh: format_flag(r.wfh).to_string(),
            leave: format_flag(r.leave).to_string(),
            departments: r.departments.clone(),
            office: r.offices_joined(),
        }
    }
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = ServiceError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let corrupt =
            |what: String| ServiceError::StorageUnavailable(format!("corrupt attendance row: {what}"));
        // spreadsheets sometimes carry a time part on the date column
        let date_text = row.date.trim().split([' ', 'T']).next().unwrap_or_default();
        let date = NaiveDate::parse_from_str(date_text, DATE_FORMAT)
            .map_err(|_| corrupt(format!("bad date `{}`", row.date)))?;
        Ok(Self {
            date,
            phone: row.phone.trim().to_string(),
            name: row.name,
            departments: row.departments,
            in_time: parse_time(&row.in_time).map_err(corrupt)?,
            out_time: parse_time(&row.out_time).map_err(corrupt)?,
            wfh: parse_flag(&row.wfh).map_err(corrupt)?,
            leave: parse_flag(&row.leave).map_err(corrupt)?,
            offices: parse_offices(&row.office),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_accept_datetime_strings_in_the_date_column() {
        let row = AttendanceRow {
            date: "2026-03-02 00:00:00".into(),
            name: "Asha".into(),
            phone: " 9800000001 ".into(),
            in_time: "09:00:00".into(),
            out_time: "".into(),
            wfh: "No".into(),
            leave: "".into(),
            departments: "Ops".into(),
            office: "HQ,Branch".into(),
        };
        let record = AttendanceRecord::try_from(row).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(record.phone, "9800000001");
        assert_eq!(record.leave, None);
        assert_eq!(record.offices, vec!["HQ", "Branch"]);
    }

    #[test]
    fn garbage_dates_surface_as_storage_errors() {
        let mut row = AttendanceRow::from(&AttendanceRecord::new(
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            "1",
            "n",
            "d",
        ));
        row.date = "yesterday".into();
        assert!(matches!(
            AttendanceRecord::try_from(row),
            Err(ServiceError::StorageUnavailable(_))
        ));
    }
}
