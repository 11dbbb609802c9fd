//! Flat-file backend: one CSV table per sheet of the legacy workbook, one
//! `attendance_<n>.csv` per partition.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::{AttendanceRow, Partition, Store};
use crate::error::{ServiceError, ServiceResult};
use crate::model::attendance::{AttendanceRecord, DATE_FORMAT};
use crate::model::department::DepartmentGroup;
use crate::model::edit_log::EditLogEntry;
use crate::model::office::Office;
use crate::model::role::Role;
use crate::model::user::{User, UserUpdate};

const USERS: &str = "users";
const OFFICES: &str = "offices";
const DEPARTMENTS: &str = "departments";
const SETTINGS: &str = "settings";
const EDITS: &str = "attendance_edits";
const PARTITION_PREFIX: &str = "attendance_";

const USER_HEADERS: &[&str] = &["PhoneNumber", "Name", "Departments", "PasswordHash", "Role"];
const OFFICE_HEADERS: &[&str] = &["OfficeName", "Latitude", "Longitude", "RadiusMeters"];
const DEPARTMENT_HEADERS: &[&str] = &["DepartmentGroup"];
const SETTING_HEADERS: &[&str] = &["Key", "Value"];
const EDIT_HEADERS: &[&str] = &[
    "DateTime",
    "EditedByPhone",
    "EditedByName",
    "TargetPhone",
    "Date",
    "Field",
    "OldValue",
    "NewValue",
    "Reason",
];
const ATTENDANCE_HEADERS: &[&str] = &[
    "Date",
    "Name",
    "PhoneNumber",
    "IN",
    "OUT",
    "WFH",
    "Leave",
    "Departments",
    "Office",
];

const EDIT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Serialize, Deserialize)]
struct UserRow {
    #[serde(rename = "PhoneNumber")]
    phone: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Departments", default)]
    departments: String,
    #[serde(rename = "PasswordHash", default)]
    password_hash: String,
    #[serde(rename = "Role", default)]
    role: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            phone: row.phone.trim().to_string(),
            name: row.name,
            departments: row.departments,
            password_hash: row.password_hash,
            role: Role::from_label(&row.role),
        }
    }
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            phone: u.phone.clone(),
            name: u.name.clone(),
            departments: u.departments.clone(),
            password_hash: u.password_hash.clone(),
            role: u.role.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OfficeRow {
    #[serde(rename = "OfficeName")]
    name: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "RadiusMeters")]
    radius_meters: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct DepartmentRow {
    #[serde(rename = "DepartmentGroup")]
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SettingRow {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value", default)]
    value: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct EditRow {
    #[serde(rename = "DateTime")]
    timestamp: String,
    #[serde(rename = "EditedByPhone")]
    edited_by_phone: String,
    #[serde(rename = "EditedByName")]
    edited_by_name: String,
    #[serde(rename = "TargetPhone")]
    target_phone: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Field")]
    field: String,
    #[serde(rename = "OldValue")]
    old_value: String,
    #[serde(rename = "NewValue")]
    new_value: String,
    #[serde(rename = "Reason")]
    reason: String,
}

impl From<&EditLogEntry> for EditRow {
    fn from(e: &EditLogEntry) -> Self {
        Self {
            timestamp: e.timestamp.format(EDIT_TIMESTAMP_FORMAT).to_string(),
            edited_by_phone: e.edited_by_phone.clone(),
            edited_by_name: e.edited_by_name.clone(),
            target_phone: e.target_phone.clone(),
            date: e.date.format(DATE_FORMAT).to_string(),
            field: e.field.clone(),
            old_value: e.old_value.clone(),
            new_value: e.new_value.clone(),
            reason: e.reason.clone(),
        }
    }
}

impl TryFrom<EditRow> for EditLogEntry {
    type Error = ServiceError;

    fn try_from(row: EditRow) -> Result<Self, Self::Error> {
        let timestamp = NaiveDateTime::parse_from_str(row.timestamp.trim(), "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|_| {
                ServiceError::StorageUnavailable(format!("corrupt edit log time `{}`", row.timestamp))
            })?;
        let date = NaiveDate::parse_from_str(row.date.trim(), DATE_FORMAT).map_err(|_| {
            ServiceError::StorageUnavailable(format!("corrupt edit log date `{}`", row.date))
        })?;
        Ok(Self {
            timestamp,
            edited_by_phone: row.edited_by_phone,
            edited_by_name: row.edited_by_name,
            target_phone: row.target_phone,
            date,
            field: row.field,
            old_value: row.old_value,
            new_value: row.new_value,
            reason: row.reason,
        })
    }
}

/// Tables live as `<dir>/<table>.csv`. All access is serialized through one
/// lock; files are replaced by rename so readers never see half a table.
pub struct CsvStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl CsvStore {
    pub fn open(dir: impl Into<PathBuf>) -> ServiceResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let store = Self {
            dir,
            lock: Mutex::new(()),
        };

        for (table, headers) in [
            (USERS, USER_HEADERS),
            (OFFICES, OFFICE_HEADERS),
            (DEPARTMENTS, DEPARTMENT_HEADERS),
            (SETTINGS, SETTING_HEADERS),
            (EDITS, EDIT_HEADERS),
        ] {
            if !store.path(table).exists() {
                store.write_table::<SettingRow>(table, headers, &[])?;
            }
        }
        if store.partition_indexes()?.is_empty() {
            store.write_table::<AttendanceRow>(&partition_table(1), ATTENDANCE_HEADERS, &[])?;
        }

        debug!(dir = %store.dir.display(), "CSV store ready");
        Ok(store)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.csv"))
    }

    fn read_table<T: DeserializeOwned>(&self, table: &str) -> ServiceResult<Vec<T>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_path(self.path(table))?;
        reader
            .deserialize()
            .collect::<Result<Vec<T>, csv::Error>>()
            .map_err(ServiceError::from)
    }

    fn write_table<T: Serialize>(
        &self,
        table: &str,
        headers: &[&str],
        rows: &[T],
    ) -> ServiceResult<()> {
        let target = self.path(table);
        let tmp = target.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(&tmp)?;
            writer.write_record(headers)?;
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    /// Reference tables (users, offices, departments, settings) are rebuilt
    /// empty when unreadable; the broken file is kept aside for inspection.
    fn read_reference<T: DeserializeOwned>(
        &self,
        table: &str,
        headers: &[&str],
    ) -> ServiceResult<Vec<T>> {
        match self.read_table(table) {
            Ok(rows) => Ok(rows),
            Err(err) => {
                let broken = self.path(table);
                let aside = broken.with_extension(format!(
                    "csv.corrupt-{}",
                    chrono::Utc::now().format("%Y%m%d%H%M%S")
                ));
                warn!(table, error = %err, aside = %aside.display(), "Reinitializing unreadable reference table");
                if broken.exists() {
                    fs::rename(&broken, &aside)?;
                }
                self.write_table::<SettingRow>(table, headers, &[])?;
                Ok(Vec::new())
            }
        }
    }

    fn partition_indexes(&self) -> ServiceResult<Vec<u32>> {
        let mut indexes: Vec<u32> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| parse_partition_name(&entry.file_name().to_string_lossy()))
            .collect();
        indexes.sort_unstable();
        Ok(indexes)
    }

    fn read_partition(&self, index: u32) -> ServiceResult<Partition> {
        let table = partition_table(index);
        if !self.path(&table).exists() {
            return Ok(Partition {
                index,
                records: Vec::new(),
            });
        }
        // attendance history is never rebuilt behind the caller's back
        let rows: Vec<AttendanceRow> = self.read_table(&table).map_err(|err| {
            error!(table, error = %err, "Attendance partition unreadable");
            err
        })?;
        let records = rows
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(Partition { index, records })
    }

    fn write_partition(&self, partition: &Partition) -> ServiceResult<()> {
        let rows: Vec<AttendanceRow> = partition.records.iter().map(AttendanceRow::from).collect();
        self.write_table(&partition_table(partition.index), ATTENDANCE_HEADERS, &rows)
    }

    fn append_edits(&self, entries: &[EditLogEntry]) -> ServiceResult<()> {
        let path = self.path(EDITS);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let empty = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if empty {
            writer.write_record(EDIT_HEADERS)?;
        }
        for entry in entries {
            writer.serialize(EditRow::from(entry))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn users(&self) -> ServiceResult<Vec<User>> {
        let rows: Vec<UserRow> = self.read_reference(USERS, USER_HEADERS)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    fn save_users(&self, users: &[User]) -> ServiceResult<()> {
        let rows: Vec<UserRow> = users.iter().map(UserRow::from).collect();
        self.write_table(USERS, USER_HEADERS, &rows)
    }

    fn offices(&self) -> ServiceResult<Vec<Office>> {
        let rows: Vec<OfficeRow> = self.read_reference(OFFICES, OFFICE_HEADERS)?;
        Ok(rows
            .into_iter()
            .map(|r| Office {
                name: r.name,
                latitude: r.latitude,
                longitude: r.longitude,
                radius_meters: r.radius_meters,
            })
            .collect())
    }

    fn save_offices(&self, offices: &[Office]) -> ServiceResult<()> {
        let rows: Vec<OfficeRow> = offices
            .iter()
            .map(|o| OfficeRow {
                name: o.name.clone(),
                latitude: o.latitude,
                longitude: o.longitude,
                radius_meters: o.radius_meters,
            })
            .collect();
        self.write_table(OFFICES, OFFICE_HEADERS, &rows)
    }

    fn departments(&self) -> ServiceResult<Vec<DepartmentGroup>> {
        let rows: Vec<DepartmentRow> = self.read_reference(DEPARTMENTS, DEPARTMENT_HEADERS)?;
        Ok(rows
            .into_iter()
            .map(|r| DepartmentGroup { name: r.name })
            .collect())
    }

    fn save_departments(&self, groups: &[DepartmentGroup]) -> ServiceResult<()> {
        let rows: Vec<DepartmentRow> = groups
            .iter()
            .map(|g| DepartmentRow {
                name: g.name.clone(),
            })
            .collect();
        self.write_table(DEPARTMENTS, DEPARTMENT_HEADERS, &rows)
    }

    fn settings(&self) -> ServiceResult<Vec<SettingRow>> {
        self.read_reference(SETTINGS, SETTING_HEADERS)
    }
}

fn partition_table(index: u32) -> String {
    format!("{PARTITION_PREFIX}{index}")
}

fn parse_partition_name(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(PARTITION_PREFIX)?
        .strip_suffix(".csv")?
        .parse()
        .ok()
}

fn upsert(records: &mut Vec<AttendanceRecord>, record: &AttendanceRecord) {
    match records
        .iter_mut()
        .find(|r| r.key_matches(&record.phone, record.date))
    {
        Some(existing) => *existing = record.clone(),
        None => records.push(record.clone()),
    }
}

#[async_trait]
impl Store for CsvStore {
    async fn get_user(&self, phone: &str) -> ServiceResult<Option<User>> {
        let _guard = self.guard();
        Ok(self.users()?.into_iter().find(|u| u.phone == phone))
    }

    async fn list_users(&self) -> ServiceResult<Vec<User>> {
        let _guard = self.guard();
        self.users()
    }

    async fn put_user(&self, user: &User) -> ServiceResult<()> {
        let _guard = self.guard();
        let mut users = self.users()?;
        match users.iter_mut().find(|u| u.phone == user.phone) {
            Some(existing) => *existing = user.clone(),
            None => users.push(user.clone()),
        }
        self.save_users(&users)
    }

    async fn update_user(&self, phone: &str, update: &UserUpdate) -> ServiceResult<bool> {
        let _guard = self.guard();
        let mut users = self.users()?;
        let Some(user) = users.iter_mut().find(|u| u.phone == phone) else {
            return Ok(false);
        };
        update.apply_to(user);
        self.save_users(&users)?;
        Ok(true)
    }

    async fn list_offices(&self) -> ServiceResult<Vec<Office>> {
        let _guard = self.guard();
        self.offices()
    }

    async fn put_office(&self, office: &Office) -> ServiceResult<()> {
        let _guard = self.guard();
        let mut offices = self.offices()?;
        offices.retain(|o| o.name != office.name);
        offices.push(office.clone());
        self.save_offices(&offices)
    }

    async fn delete_office(&self, name: &str) -> ServiceResult<bool> {
        let _guard = self.guard();
        let mut offices = self.offices()?;
        let before = offices.len();
        offices.retain(|o| o.name != name);
        if offices.len() == before {
            return Ok(false);
        }
        self.save_offices(&offices)?;
        Ok(true)
    }

    async fn list_departments(&self) -> ServiceResult<Vec<DepartmentGroup>> {
        let _guard = self.guard();
        self.departments()
    }

    async fn put_department(&self, group: &DepartmentGroup) -> ServiceResult<()> {
        let _guard = self.guard();
        let mut groups = self.departments()?;
        if groups.iter().any(|g| g.name == group.name) {
            return Ok(());
        }
        groups.push(group.clone());
        self.save_departments(&groups)
    }

    async fn delete_department(&self, name: &str) -> ServiceResult<bool> {
        let _guard = self.guard();
        let mut groups = self.departments()?;
        let before = groups.len();
        groups.retain(|g| g.name != name);
        if groups.len() == before {
            return Ok(false);
        }
        self.save_departments(&groups)?;
        Ok(true)
    }

    async fn get_setting(&self, key: &str) -> ServiceResult<Option<String>> {
        let _guard = self.guard();
        Ok(self
            .settings()?
            .into_iter()
            .find(|s| s.key == key)
            .map(|s| s.value))
    }

    async fn put_setting(&self, key: &str, value: &str) -> ServiceResult<()> {
        let _guard = self.guard();
        let mut settings = self.settings()?;
        match settings.iter_mut().find(|s| s.key == key) {
            Some(existing) => existing.value = value.to_string(),
            None => settings.push(SettingRow {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
        self.write_table(SETTINGS, SETTING_HEADERS, &settings)
    }

    async fn partitions(&self) -> ServiceResult<Vec<u32>> {
        let _guard = self.guard();
        let indexes = self.partition_indexes()?;
        Ok(if indexes.is_empty() { vec![1] } else { indexes })
    }

    async fn load_partition(&self, index: u32) -> ServiceResult<Partition> {
        let _guard = self.guard();
        self.read_partition(index)
    }

    async fn replace_partition(&self, partition: &Partition) -> ServiceResult<()> {
        let _guard = self.guard();
        self.write_partition(partition)
    }

    async fn upsert_record(&self, index: u32, record: &AttendanceRecord) -> ServiceResult<()> {
        let _guard = self.guard();
        let mut partition = self.read_partition(index)?;
        upsert(&mut partition.records, record);
        self.write_partition(&partition)
    }

    async fn prune_before(&self, cutoff: NaiveDate, below: u32) -> ServiceResult<usize> {
        let _guard = self.guard();
        let mut pruned = 0;
        for index in self.partition_indexes()?.into_iter().filter(|i| *i < below) {
            let mut partition = self.read_partition(index)?;
            let before = partition.records.len();
            partition.records.retain(|r| r.date >= cutoff);
            if partition.records.len() < before {
                pruned += before - partition.records.len();
                self.write_partition(&partition)?;
            }
        }
        Ok(pruned)
    }

    async fn find_record(
        &self,
        phone: &str,
        date: NaiveDate,
    ) -> ServiceResult<Option<(u32, AttendanceRecord)>> {
        let _guard = self.guard();
        for index in self.partition_indexes()?.into_iter().rev() {
            let partition = self.read_partition(index)?;
            if let Some(found) = partition
                .records
                .into_iter()
                .find(|r| r.key_matches(phone, date))
            {
                return Ok(Some((index, found)));
            }
        }
        Ok(None)
    }

    async fn list_edits(&self) -> ServiceResult<Vec<EditLogEntry>> {
        let _guard = self.guard();
        let rows: Vec<EditRow> = self.read_table(EDITS)?;
        rows.into_iter().map(EditLogEntry::try_from).collect()
    }

    async fn apply_edit(
        &self,
        index: u32,
        record: &AttendanceRecord,
        entries: &[EditLogEntry],
    ) -> ServiceResult<()> {
        let _guard = self.guard();
        let mut partition = self.read_partition(index)?;
        if !partition
            .records
            .iter()
            .any(|r| r.key_matches(&record.phone, record.date))
        {
            return Err(ServiceError::RecordNotFound {
                phone: record.phone.clone(),
                date: record.date.format(DATE_FORMAT).to_string(),
            });
        }
        // log first: a crash in between leaves an entry without an edit, never the reverse
        self.append_edits(entries)?;
        upsert(&mut partition.records, record);
        self.write_partition(&partition)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use tempfile::TempDir;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn open() -> (TempDir, CsvStore) {
        let dir = TempDir::new().expect("temp dir");
        let store = CsvStore::open(dir.path()).expect("open store");
        (dir, store)
    }

    #[actix_web::test]
    async fn fresh_store_has_one_empty_partition() {
        let (_dir, store) = open();
        assert_eq!(store.partitions().await.unwrap(), vec![1]);
        assert!(store.load_partition(1).await.unwrap().records.is_empty());
        assert!(store.list_users().await.unwrap().is_empty());
        assert!(store.list_edits().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn upsert_keeps_one_row_per_phone_and_day() {
        let (_dir, store) = open();
        let mut record = AttendanceRecord::new(day(2), "9800000001", "Asha", "Ops");
        store.upsert_record(1, &record).await.unwrap();
        record.in_time = NaiveTime::from_hms_opt(9, 0, 0);
        record.merge_office("HQ");
        record.merge_office("Branch");
        store.upsert_record(1, &record).await.unwrap();

        let partition = store.load_partition(1).await.unwrap();
        assert_eq!(partition.records, vec![record.clone()]);
        let (index, found) = store.find_record("9800000001", day(2)).await.unwrap().unwrap();
        assert_eq!(index, 1);
        assert_eq!(found.offices, vec!["HQ", "Branch"]);
    }

    #[actix_web::test]
    async fn find_record_prefers_the_newest_partition() {
        let (_dir, store) = open();
        let old = AttendanceRecord::new(day(2), "1", "Old", "");
        let new = AttendanceRecord::new(day(2), "1", "New", "");
        store.upsert_record(1, &old).await.unwrap();
        store
            .replace_partition(&Partition {
                index: 2,
                records: vec![new],
            })
            .await
            .unwrap();
        assert_eq!(store.partitions().await.unwrap(), vec![1, 2]);
        assert_eq!(store.active_partition().await.unwrap(), 2);
        let (index, found) = store.find_record("1", day(2)).await.unwrap().unwrap();
        assert_eq!((index, found.name.as_str()), (2, "New"));
        assert_eq!(store.scan_records().await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn corrupt_reference_table_is_rebuilt_empty() {
        let (dir, store) = open();
        store.put_setting("whitelist", "1,2").await.unwrap();
        fs::write(dir.path().join("settings.csv"), "Key,Value\nwhitelist,1,stray\n").unwrap();

        assert_eq!(store.get_setting("whitelist").await.unwrap(), None);
        // the rebuilt table is writable again
        store.put_setting("whitelist", "3").await.unwrap();
        assert_eq!(store.get_setting("whitelist").await.unwrap().as_deref(), Some("3"));
    }

    #[actix_web::test]
    async fn corrupt_attendance_surfaces_an_error() {
        let (dir, store) = open();
        fs::write(
            dir.path().join("attendance_1.csv"),
            "Date,Name,PhoneNumber,IN,OUT,WFH,Leave,Departments,Office\nnot-a-date,A,1,,,No,No,,\n",
        )
        .unwrap();
        assert!(matches!(
            store.load_partition(1).await,
            Err(ServiceError::StorageUnavailable(_))
        ));
        // and the file was left as it was
        let text = fs::read_to_string(dir.path().join("attendance_1.csv")).unwrap();
        assert!(text.contains("not-a-date"));
    }

    #[actix_web::test]
    async fn apply_edit_writes_log_and_row_together() {
        let (_dir, store) = open();
        let mut record = AttendanceRecord::new(day(2), "1", "A", "");
        store.upsert_record(1, &record).await.unwrap();
        record.in_time = NaiveTime::from_hms_opt(9, 15, 0);
        let entry = EditLogEntry {
            timestamp: day(3).and_hms_opt(10, 0, 0).unwrap(),
            edited_by_phone: "0".into(),
            edited_by_name: "Admin".into(),
            target_phone: "1".into(),
            date: day(2),
            field: "IN".into(),
            old_value: "".into(),
            new_value: "09:15:00".into(),
            reason: "forgot, again".into(),
        };
        store.apply_edit(1, &record, &[entry.clone()]).await.unwrap();

        assert_eq!(store.list_edits().await.unwrap(), vec![entry]);
        let (_, found) = store.find_record("1", day(2)).await.unwrap().unwrap();
        assert_eq!(found.in_time, NaiveTime::from_hms_opt(9, 15, 0));
    }

    #[actix_web::test]
    async fn apply_edit_on_missing_row_logs_nothing() {
        let (_dir, store) = open();
        let record = AttendanceRecord::new(day(2), "1", "A", "");
        let err = store.apply_edit(1, &record, &[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::RecordNotFound { .. }));
        assert!(store.list_edits().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn offices_upsert_by_name() {
        let (_dir, store) = open();
        let mut hq = Office {
            name: "HQ".into(),
            latitude: 18.94,
            longitude: 72.83,
            radius_meters: 350.0,
        };
        store.put_office(&hq).await.unwrap();
        hq.radius_meters = 500.0;
        store.put_office(&hq).await.unwrap();
        assert_eq!(store.list_offices().await.unwrap(), vec![hq]);
        assert!(store.delete_office("HQ").await.unwrap());
        assert!(!store.delete_office("HQ").await.unwrap());
    }

    #[test]
    fn partition_names_need_a_numeric_suffix() {
        assert_eq!(parse_partition_name("attendance_12.csv"), Some(12));
        assert_eq!(parse_partition_name("attendance_edits.csv"), None);
        assert_eq!(parse_partition_name("attendance_3.csv.tmp"), None);
    }
}
