//! The attendance service: every operation the HTTP layer exposes, expressed
//! over a [`Store`] and a [`Clock`].
//!
//! Attendance mutations (punches and admin corrections) are serialized by one
//! writer lock, since a punch may rewrite the whole active partition when
//! retention or a rollover kicks in. Account mutations have their own lock so
//! that two signups for the same phone cannot both pass the availability
//! check.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::attendance::action::{Action, apply_action};
use crate::attendance::audit::{AttendanceEdit, Editor, apply_changes, diff_edit, record_edit};
use crate::attendance::clock::{Clock, Moment};
use crate::attendance::geofence::{self, GeoPoint};
use crate::attendance::resolver::{Snapshot, resolve_today_record};
use crate::attendance::retention::{
    RetentionLimits, RolloverPolicy, apply_retention, horizon,
};
use crate::auth::password::{hash_password, verify_password};
use crate::config::EngineConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::model::attendance::{AttendanceRecord, DATE_FORMAT, NO_OFFICE};
use crate::model::department::DepartmentGroup;
use crate::model::edit_log::EditLogEntry;
use crate::model::office::Office;
use crate::model::role::Role;
use crate::model::setting::{WHITELIST_KEY, parse_whitelist};
use crate::model::user::{User, UserProfile, UserUpdate};
use crate::storage::{AttendanceRow, Partition, Store};
use crate::utils::phone_cache::PhoneCache;
use crate::utils::phone_filter::PhoneFilter;

/// One punch as submitted by a user.
#[derive(Debug, Clone, Copy)]
pub struct Punch<'a> {
    pub action: &'a str,
    pub office: Option<&'a str>,
    pub position: Option<GeoPoint>,
    /// The user insists on the office even though the device is outside it.
    pub confirmed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkOutcome {
    #[schema(example = "Recorded at HQ")]
    pub message: String,
    pub action: Action,
    /// Partition the record now lives in.
    pub partition: u32,
    pub rolled_over: bool,
    pub record: AttendanceRecord,
}

/// Inclusive date filter. Either end may be left open.
#[derive(Debug, Default, Clone, Copy, Deserialize, IntoParams, ToSchema)]
pub struct DateRange {
    #[schema(example = "2026-01-01", value_type = Option<String>, format = "date")]
    #[param(value_type = Option<String>, format = "date")]
    pub start: Option<NaiveDate>,
    #[schema(example = "2026-01-31", value_type = Option<String>, format = "date")]
    #[param(value_type = Option<String>, format = "date")]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn validate(&self) -> ServiceResult<()> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start > end => Err(ServiceError::BadRequest(format!(
                "start {start} is after end {end}"
            ))),
            _ => Ok(()),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

/// Self-service profile changes. Absent fields stay as they are.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    #[schema(example = "Asha K")]
    pub name: Option<String>,
    #[schema(example = "9800000009")]
    pub phone: Option<String>,
    #[schema(example = json!(["Management Team"]))]
    pub departments: Option<Vec<String>>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

/// A rendered CSV export.
#[derive(Debug)]
pub struct CsvExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct AttendanceService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    engine: EngineConfig,
    /// Serializes attendance writes. Holds the day sealed partitions were
    /// last pruned on.
    writer: Mutex<Option<NaiveDate>>,
    accounts: Mutex<()>,
    phone_filter: PhoneFilter,
    phone_cache: PhoneCache,
}

impl AttendanceService {
    /// Service with an empty phone registry. Call
    /// [`AttendanceService::warmup_phone_registry`] before taking signups.
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, engine: EngineConfig) -> Self {
        Self {
            store,
            clock,
            engine,
            writer: Mutex::new(None),
            accounts: Mutex::new(()),
            phone_filter: PhoneFilter::default(),
            phone_cache: PhoneCache::default(),
        }
    }

    /// Builds the service and loads every registered phone into the filter.
    pub async fn open(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        engine: EngineConfig,
    ) -> anyhow::Result<Self> {
        let service = Self::new(store, clock, engine);
        service.warmup_phone_registry(500).await?;
        Ok(service)
    }

    fn limits(&self) -> RetentionLimits {
        RetentionLimits {
            month_limit: self.engine.month_limit,
            row_limit: self.engine.row_limit,
        }
    }

    // ------------------------------------------------------------------
    // Attendance
    // ------------------------------------------------------------------

    /// Records one punch for `phone` on today's row, creating the row when
    /// needed. Retention runs first and may roll the active partition over.
    pub async fn mark_attendance(&self, phone: &str, punch: Punch<'_>) -> ServiceResult<MarkOutcome> {
        let action = Action::parse(punch.action)?;
        let user = self
            .store
            .get_user(phone)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound(phone.to_string()))?;
        let office = punch
            .office
            .map(str::trim)
            .filter(|o| !o.is_empty() && *o != NO_OFFICE);
        if let Some(office) = office {
            self.verify_location(office, punch.position, punch.confirmed)
                .await?;
        }

        let mut sealed_pruned_on = self.writer.lock().await;
        let moment = Moment::read(self.clock.as_ref());

        let active = self.store.active_partition().await?;
        let loaded = self.store.load_partition(active).await?;

        // a row about to be created needs a free slot under the cap
        let mut limits = self.limits();
        if !loaded
            .records
            .iter()
            .any(|r| r.key_matches(&user.phone, moment.date))
        {
            limits.row_limit = limits.row_limit.saturating_sub(1);
        }
        let mut outcome = apply_retention(loaded.records, moment.date, limits);
        if outcome.rollover {
            outcome.reclaim(&user.phone, moment.date);
        }
        let rewrite = outcome.changed();
        let mut records = std::mem::take(&mut outcome.kept);

        let who = Snapshot {
            phone: &user.phone,
            name: &user.name,
            departments: &user.departments,
        };
        let (idx, created) = resolve_today_record(&mut records, &who, moment.date);
        let recorded = apply_action(&mut records[idx], action, office, moment.time);
        let record = records[idx].clone();

        let partition = if outcome.rollover {
            let next = active + 1;
            // new partition first: a failure in between duplicates rows instead of losing them
            self.store
                .replace_partition(&Partition {
                    index: next,
                    records,
                })
                .await?;
            let sealed = match self.engine.rollover_policy {
                RolloverPolicy::Migrate => std::mem::take(&mut outcome.overflow),
                RolloverPolicy::Truncate => {
                    warn!(
                        dropped = outcome.overflow.len(),
                        partition = active,
                        "Rollover discarded overflow rows"
                    );
                    Vec::new()
                }
            };
            self.store
                .replace_partition(&Partition {
                    index: active,
                    records: sealed,
                })
                .await?;
            info!(
                from = active,
                to = next,
                policy = %self.engine.rollover_policy,
                "Attendance partition rolled over"
            );
            next
        } else if rewrite {
            self.store
                .replace_partition(&Partition {
                    index: active,
                    records,
                })
                .await?;
            active
        } else {
            self.store.upsert_record(active, &record).await?;
            active
        };

        if outcome.expired > 0 {
            info!(expired = outcome.expired, partition = active, "Pruned expired attendance rows");
        }
        // sealed partitions only age past the horizon once a day
        if sealed_pruned_on.is_none_or(|day| day < moment.date) {
            let cutoff = horizon(moment.date, self.engine.month_limit);
            let expired = self.store.prune_before(cutoff, partition).await?;
            if expired > 0 {
                info!(expired, below = partition, %cutoff, "Pruned expired rows from sealed partitions");
            }
            *sealed_pruned_on = Some(moment.date);
        }
        debug!(
            phone = %record.phone,
            action = %action,
            created,
            office_added = recorded.office_added,
            "Attendance recorded"
        );

        let message = match office {
            Some(office) if action != Action::Leave => format!("Recorded at {office}"),
            _ => "Recorded".to_string(),
        };
        Ok(MarkOutcome {
            message,
            action,
            partition,
            rolled_over: outcome.rollover,
            record,
        })
    }

    async fn verify_location(
        &self,
        office: &str,
        position: Option<GeoPoint>,
        confirmed: bool,
    ) -> ServiceResult<()> {
        let offices = self.store.list_offices().await?;
        let known = offices
            .iter()
            .find(|o| o.name == office)
            .ok_or_else(|| ServiceError::BadRequest(format!("Unknown office: {office}")))?;

        // without a position there is nothing to check against
        let Some(at) = position else {
            return Ok(());
        };
        if !at.is_valid() {
            return Err(ServiceError::BadRequest("Invalid coordinates".to_string()));
        }

        match geofence::check(known, at, self.engine.geofence_buffer_meters) {
            Ok(distance_m) => {
                debug!(office, distance_m, "Punch inside geofence");
                Ok(())
            }
            Err(ServiceError::OutsideGeofence { distance_m, .. }) if confirmed => {
                warn!(office, distance_m, "Punch outside geofence confirmed by user");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Every stored row across all partitions, sorted by date.
    pub async fn get_attendance_records(
        &self,
        range: DateRange,
    ) -> ServiceResult<Vec<AttendanceRecord>> {
        range.validate()?;
        let mut records: Vec<AttendanceRecord> = self
            .store
            .scan_records()
            .await?
            .into_iter()
            .filter(|r| range.contains(r.date))
            .collect();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    /// CSV download of the filtered rows, with the legacy column names.
    pub async fn export_csv(&self, range: DateRange) -> ServiceResult<CsvExport> {
        let records = self.get_attendance_records(range).await?;

        let label = |bound: Option<NaiveDate>, fallback: Option<NaiveDate>| {
            bound
                .or(fallback)
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| "all".to_string())
        };
        let file_name = format!(
            "attendance_{}_to_{}.csv",
            label(range.start, records.first().map(|r| r.date)),
            label(range.end, records.last().map(|r| r.date)),
        );

        let mut writer = csv::Writer::from_writer(Vec::new());
        if records.is_empty() {
            writer.write_record([
                "Date",
                "Name",
                "PhoneNumber",
                "IN",
                "OUT",
                "WFH",
                "Leave",
                "Departments",
                "Office",
            ])?;
        }
        for record in &records {
            writer.serialize(AttendanceRow::from(record))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ServiceError::from(std::io::Error::new(e.error().kind(), e.error().to_string())))?;
        Ok(CsvExport { file_name, bytes })
    }

    /// Admin correction of one (phone, date) row. Returns the audit entries
    /// written, one per field whose value actually changed.
    pub async fn update_attendance_fields(
        &self,
        editor: &Editor<'_>,
        phone: &str,
        date: NaiveDate,
        edit: &AttendanceEdit,
        reason: &str,
    ) -> ServiceResult<Vec<EditLogEntry>> {
        let _guard = self.writer.lock().await;

        let (index, mut record) = self.store.find_record(phone, date).await?.ok_or_else(|| {
            ServiceError::RecordNotFound {
                phone: phone.to_string(),
                date: date.format(DATE_FORMAT).to_string(),
            }
        })?;

        let changes = diff_edit(&record, edit)?;
        if changes.is_empty() {
            debug!(phone, %date, "Edit changed nothing");
            return Ok(Vec::new());
        }
        apply_changes(&mut record, &changes)?;

        let at = self.clock.now().naive_local();
        let entries: Vec<EditLogEntry> = changes
            .iter()
            .map(|change| record_edit(editor, &record, change, reason, at))
            .collect();
        self.store.apply_edit(index, &record, &entries).await?;

        info!(
            editor = editor.phone,
            target = phone,
            %date,
            fields = entries.len(),
            "Attendance record corrected"
        );
        Ok(entries)
    }

    pub async fn edit_log(&self) -> ServiceResult<Vec<EditLogEntry>> {
        self.store.list_edits().await
    }

    // ------------------------------------------------------------------
    // Reference data
    // ------------------------------------------------------------------

    pub async fn offices(&self) -> ServiceResult<Vec<Office>> {
        self.store.list_offices().await
    }

    /// Inserts the office, replacing one with the same name.
    pub async fn add_office(&self, office: Office) -> ServiceResult<Office> {
        let office = Office {
            name: office.name.trim().to_string(),
            ..office
        };
        if office.name.is_empty() || office.name == NO_OFFICE {
            return Err(ServiceError::BadRequest("Office name is required".to_string()));
        }
        let centre = GeoPoint {
            latitude: office.latitude,
            longitude: office.longitude,
        };
        if !centre.is_valid() {
            return Err(ServiceError::BadRequest("Invalid coordinates".to_string()));
        }
        if !(office.radius_meters > 0.0) {
            return Err(ServiceError::BadRequest(
                "Radius must be greater than zero".to_string(),
            ));
        }
        self.store.put_office(&office).await?;
        info!(office = %office.name, "Office saved");
        Ok(office)
    }

    pub async fn delete_office(&self, name: &str) -> ServiceResult<bool> {
        self.store.delete_office(name.trim()).await
    }

    pub async fn departments(&self) -> ServiceResult<Vec<DepartmentGroup>> {
        self.store.list_departments().await
    }

    pub async fn add_department(&self, name: &str) -> ServiceResult<DepartmentGroup> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::BadRequest(
                "Department group name is required".to_string(),
            ));
        }
        let group = DepartmentGroup {
            name: name.to_string(),
        };
        self.store.put_department(&group).await?;
        Ok(group)
    }

    pub async fn delete_department(&self, name: &str) -> ServiceResult<bool> {
        self.store.delete_department(name.trim()).await
    }

    /// Missing settings read as the empty string.
    pub async fn setting(&self, key: &str) -> ServiceResult<String> {
        Ok(self.store.get_setting(key).await?.unwrap_or_default())
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> ServiceResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ServiceError::BadRequest("Setting key is required".to_string()));
        }
        // keep the whitelist normalized so lookups stay exact
        let value = if key == WHITELIST_KEY {
            parse_whitelist(value).join(",")
        } else {
            value.to_string()
        };
        self.store.put_setting(key, &value).await
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    pub async fn whitelist(&self) -> ServiceResult<Vec<String>> {
        Ok(parse_whitelist(&self.setting(WHITELIST_KEY).await?))
    }

    pub async fn is_admin(&self, phone: &str) -> ServiceResult<bool> {
        Ok(self.whitelist().await?.iter().any(|p| p == phone))
    }

    pub async fn require_admin(&self, phone: &str) -> ServiceResult<()> {
        if self.is_admin(phone).await? {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Admin only".to_string()))
        }
    }

    /// Whitelists `phone`, creating its user with the default password when
    /// absent. Returns whether a user was created.
    pub async fn grant_access(&self, phone: &str, name: Option<&str>) -> ServiceResult<bool> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(ServiceError::BadRequest("Phone is required".to_string()));
        }

        let _guard = self.accounts.lock().await;
        let created = if self.store.get_user(phone).await?.is_none() {
            let name = name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("User-{phone}"));
            let user = User {
                phone: phone.to_string(),
                name,
                departments: String::new(),
                password_hash: hash_password(&self.engine.default_admin_password)?,
                role: Role::User,
            };
            self.store.put_user(&user).await?;
            self.remember_phone(phone).await;
            true
        } else {
            false
        };

        let mut whitelist = self.whitelist().await?;
        if !whitelist.iter().any(|p| p == phone) {
            whitelist.push(phone.to_string());
            self.store
                .put_setting(WHITELIST_KEY, &whitelist.join(","))
                .await?;
        }
        info!(phone, created, "Dashboard access granted");
        Ok(created)
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Loads every registered phone into the cuckoo filter and the cache, in batches.
    pub async fn warmup_phone_registry(&self, batch_size: usize) -> anyhow::Result<usize> {
        let users = self.store.list_users().await?;
        let phones: Vec<String> = users.into_iter().map(|u| u.phone).collect();
        for batch in phones.chunks(batch_size.max(1)) {
            self.phone_filter.insert_batch(batch);
            self.phone_cache.batch_mark(batch).await;
        }
        info!(count = phones.len(), "Phone registry warmup complete");
        Ok(phones.len())
    }

    async fn remember_phone(&self, phone: &str) {
        self.phone_filter.insert(phone);
        self.phone_cache.mark_taken(phone).await;
    }

    async fn forget_phone(&self, phone: &str) {
        self.phone_filter.remove(phone);
        self.phone_cache.forget(phone).await;
    }

    /// true  => phone AVAILABLE
    /// false => phone TAKEN
    pub async fn is_phone_available(&self, phone: &str) -> ServiceResult<bool> {
        // cuckoo filter: a miss is final
        if !self.phone_filter.might_exist(phone) {
            return Ok(true);
        }
        // moka cache: a hit is final
        if self.phone_cache.is_taken(phone).await {
            return Ok(false);
        }
        let exists = self.store.get_user(phone.trim()).await?.is_some();
        if exists {
            self.phone_cache.mark_taken(phone).await;
        }
        Ok(!exists)
    }

    pub async fn register(&self, phone: &str, name: &str, password: &str) -> ServiceResult<UserProfile> {
        let phone = phone.trim();
        let name = name.trim();
        if phone.is_empty() || password.is_empty() {
            return Err(ServiceError::BadRequest(
                "Phone and password must not be empty".to_string(),
            ));
        }
        if name.is_empty() {
            return Err(ServiceError::BadRequest("Name must not be empty".to_string()));
        }

        let _guard = self.accounts.lock().await;
        if self.is_admin(phone).await? {
            return Err(ServiceError::DuplicateRegistration(
                "This phone number is reserved for admin use. Please contact administrator."
                    .to_string(),
            ));
        }
        if !self.is_phone_available(phone).await? {
            return Err(ServiceError::DuplicateRegistration(
                "User already exists".to_string(),
            ));
        }

        let user = User {
            phone: phone.to_string(),
            name: name.to_string(),
            departments: String::new(),
            password_hash: hash_password(password)?,
            role: Role::User,
        };
        self.store.put_user(&user).await?;
        self.remember_phone(phone).await;
        info!(phone, "User registered");
        Ok(UserProfile::from_user(&user, false))
    }

    /// Returns the user when the password matches.
    pub async fn login(&self, phone: &str, password: &str) -> ServiceResult<User> {
        let invalid = || ServiceError::Unauthorized("Invalid phone or password".to_string());
        let phone = phone.trim();
        if phone.is_empty() || password.is_empty() {
            return Err(ServiceError::BadRequest(
                "Phone and password are required".to_string(),
            ));
        }

        let user = self.store.get_user(phone).await?.ok_or_else(|| {
            debug!(phone, "Login for unknown phone");
            invalid()
        })?;
        if let Err(e) = verify_password(password, &user.password_hash) {
            debug!(phone, error = %e, "Password mismatch");
            return Err(invalid());
        }
        Ok(user)
    }

    pub async fn profile(&self, phone: &str) -> ServiceResult<UserProfile> {
        let user = self
            .store
            .get_user(phone)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound(phone.to_string()))?;
        let is_admin = self.is_admin(&user.phone).await?;
        Ok(UserProfile::from_user(&user, is_admin))
    }

    pub async fn update_profile(
        &self,
        phone: &str,
        update: ProfileUpdate,
    ) -> ServiceResult<UserProfile> {
        let _guard = self.accounts.lock().await;
        if self.store.get_user(phone).await?.is_none() {
            return Err(ServiceError::UserNotFound(phone.to_string()));
        }

        let mut changes = UserUpdate::default();

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ServiceError::BadRequest("Name must not be empty".to_string()));
            }
            changes.name = Some(name.to_string());
        }

        if let Some(departments) = update.departments {
            let known = self.store.list_departments().await?;
            let mut chosen: Vec<String> = Vec::new();
            for dept in departments.iter().map(|d| d.trim()).filter(|d| !d.is_empty()) {
                if !known.iter().any(|k| k.name == dept) {
                    return Err(ServiceError::BadRequest(format!(
                        "Unknown department group: {dept}"
                    )));
                }
                if !chosen.iter().any(|c| c == dept) {
                    chosen.push(dept.to_string());
                }
            }
            changes.departments = Some(chosen.join(","));
        }

        if update.password.is_some() || update.confirm_password.is_some() {
            let password = update.password.unwrap_or_default();
            if Some(&password) != update.confirm_password.as_ref() {
                return Err(ServiceError::BadRequest("Passwords do not match".to_string()));
            }
            if password.is_empty() {
                return Err(ServiceError::BadRequest(
                    "Password must not be empty".to_string(),
                ));
            }
            changes.password_hash = Some(hash_password(&password)?);
        }

        let new_phone = update
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| p != phone);
        if let Some(new_phone) = &new_phone {
            if new_phone.is_empty() {
                return Err(ServiceError::BadRequest("Phone must not be empty".to_string()));
            }
            if self.store.get_user(new_phone).await?.is_some() {
                return Err(ServiceError::DuplicateRegistration(
                    "Phone already registered to another user".to_string(),
                ));
            }
            changes.phone = Some(new_phone.clone());
        }

        if !changes.is_empty() && !self.store.update_user(phone, &changes).await? {
            return Err(ServiceError::UserNotFound(phone.to_string()));
        }

        let current = match &new_phone {
            Some(new_phone) => {
                self.forget_phone(phone).await;
                self.remember_phone(new_phone).await;
                info!(old = phone, new = %new_phone, "User changed phone");
                new_phone.as_str()
            }
            None => phone,
        };
        self.profile(current).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use tempfile::TempDir;

    use super::*;
    use crate::attendance::clock::fixed::FixedClock;
    use crate::db::init_db;
    use crate::storage::csv_store::CsvStore;
    use crate::storage::sql_store::SqlStore;

    const ASHA: &str = "9800000001";
    const ADMIN: &str = "9000000001";

    fn t(hh: u32, mm: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(hh, mm, 0)
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn punch(action: &str) -> Punch<'_> {
        Punch {
            action,
            office: None,
            position: None,
            confirmed: false,
        }
    }

    fn at<'a>(action: &'a str, office: &'a str) -> Punch<'a> {
        Punch {
            office: Some(office),
            ..punch(action)
        }
    }

    fn user(phone: &str, name: &str) -> User {
        User {
            phone: phone.into(),
            name: name.into(),
            departments: "Ops".into(),
            password_hash: "x".into(),
            role: Role::User,
        }
    }

    fn office(name: &str) -> Office {
        Office {
            name: name.into(),
            latitude: 18.94358,
            longitude: 72.83826,
            radius_meters: 350.0,
        }
    }

    async fn sql_store() -> Arc<dyn Store> {
        Arc::new(SqlStore::new(init_db("sqlite::memory:").await.unwrap()))
    }

    /// Service at 2026-10-18 09:00 IST with Asha registered and two offices.
    async fn setup_with(store: Arc<dyn Store>, engine: EngineConfig) -> (AttendanceService, Arc<FixedClock>) {
        store.put_user(&user(ASHA, "Asha")).await.unwrap();
        store.put_user(&user(ADMIN, "Admin1")).await.unwrap();
        store.put_setting(WHITELIST_KEY, ADMIN).await.unwrap();
        store.put_office(&office("OfficeA")).await.unwrap();
        store.put_office(&office("OfficeB")).await.unwrap();
        store
            .put_department(&DepartmentGroup { name: "Ops".into() })
            .await
            .unwrap();

        let clock = Arc::new(FixedClock::at(2026, 10, 18, 9, 0, 0));
        let service = AttendanceService::open(store, clock.clone(), engine)
            .await
            .unwrap();
        (service, clock)
    }

    async fn setup() -> (AttendanceService, Arc<FixedClock>) {
        setup_with(sql_store().await, EngineConfig::default()).await
    }

    #[actix_web::test]
    async fn in_then_out_at_two_offices() {
        let (service, clock) = setup().await;
        service.mark_attendance(ASHA, at("IN", "OfficeA")).await.unwrap();
        clock.set(18, 0, 0);
        let outcome = service.mark_attendance(ASHA, at("out", "OfficeB")).await.unwrap();

        assert_eq!(outcome.message, "Recorded at OfficeB");
        let record = outcome.record;
        assert_eq!(record.offices, vec!["OfficeA", "OfficeB"]);
        assert_eq!(record.in_time, t(9, 0));
        assert_eq!(record.out_time, t(18, 0));
        assert_eq!(record.wfh, Some(false));
        assert_eq!(record.leave, Some(false));
        assert_eq!(record.departments, "Ops");

        let stored = service.get_attendance_records(DateRange::default()).await.unwrap();
        assert_eq!(stored, vec![record]);
    }

    #[actix_web::test]
    async fn repeated_punches_overwrite_times_only() {
        let (service, clock) = setup().await;
        service.mark_attendance(ASHA, punch("WFH IN")).await.unwrap();
        clock.set(9, 30, 0);
        let second = service.mark_attendance(ASHA, punch("wfh in")).await.unwrap();
        assert_eq!(second.message, "Recorded");
        assert_eq!(second.record.in_time, t(9, 30));
        assert_eq!(second.record.wfh, Some(true));
        assert_eq!(second.record.leave, Some(false));

        let leave = service.mark_attendance(ASHA, punch("Leave")).await.unwrap();
        assert_eq!(leave.record.leave, Some(true));
        assert_eq!(leave.record.in_time, t(9, 30));
        assert_eq!(service.get_attendance_records(DateRange::default()).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn invalid_action_writes_nothing() {
        let (service, _clock) = setup().await;
        let err = service.mark_attendance(ASHA, punch("nap")).await.unwrap_err();
        assert_eq!(err, ServiceError::InvalidAction("NAP".into()));
        assert!(service.get_attendance_records(DateRange::default()).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn unknown_user_and_unknown_office() {
        let (service, _clock) = setup().await;
        assert!(matches!(
            service.mark_attendance("1111111111", punch("IN")).await,
            Err(ServiceError::UserNotFound(_))
        ));
        assert!(matches!(
            service.mark_attendance(ASHA, at("IN", "Moon")).await,
            Err(ServiceError::BadRequest(_))
        ));
        // the sentinel means no office at all
        let outcome = service.mark_attendance(ASHA, at("IN", "-")).await.unwrap();
        assert!(outcome.record.offices.is_empty());
    }

    #[actix_web::test]
    async fn geofence_needs_confirmation_when_far_away() {
        let (service, _clock) = setup().await;
        let far = GeoPoint {
            latitude: 19.23636,
            longitude: 72.98720,
        };
        let mut p = Punch {
            position: Some(far),
            ..at("IN", "OfficeA")
        };
        match service.mark_attendance(ASHA, p).await {
            Err(ServiceError::OutsideGeofence { office, distance_m }) => {
                assert_eq!(office, "OfficeA");
                assert!(distance_m > 30_000.0);
            }
            other => panic!("expected OutsideGeofence, got {other:?}"),
        }
        assert!(service.get_attendance_records(DateRange::default()).await.unwrap().is_empty());

        p.confirmed = true;
        let outcome = service.mark_attendance(ASHA, p).await.unwrap();
        assert_eq!(outcome.record.offices, vec!["OfficeA"]);

        let near = Punch {
            position: Some(GeoPoint {
                latitude: 18.9436,
                longitude: 72.8383,
            }),
            ..at("OUT", "OfficeA")
        };
        assert!(service.mark_attendance(ASHA, near).await.is_ok());
    }

    #[actix_web::test]
    async fn retention_prunes_rows_past_the_horizon() {
        let store = sql_store().await;
        let cutoff = day(10, 18) - chrono::Days::new(300);
        let keep = AttendanceRecord::new(cutoff, "2", "B", "");
        let drop = AttendanceRecord::new(cutoff - chrono::Days::new(1), "3", "C", "");
        store
            .replace_partition(&Partition {
                index: 1,
                records: vec![drop, keep.clone()],
            })
            .await
            .unwrap();
        let (service, _clock) = setup_with(store, EngineConfig::default()).await;

        let outcome = service.mark_attendance(ASHA, punch("IN")).await.unwrap();
        assert!(!outcome.rolled_over);
        let all = service.get_attendance_records(DateRange::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], keep);
        assert_eq!(all[1].phone, ASHA);
    }

    async fn rollover_fixture(policy: RolloverPolicy) -> (Arc<dyn Store>, MarkOutcome) {
        let store = sql_store().await;
        store
            .replace_partition(&Partition {
                index: 1,
                records: vec![
                    AttendanceRecord::new(day(10, 16), "2", "B", ""),
                    AttendanceRecord::new(day(10, 15), "3", "C", ""),
                ],
            })
            .await
            .unwrap();
        let engine = EngineConfig {
            row_limit: 2,
            rollover_policy: policy,
            ..Default::default()
        };
        let (service, _clock) = setup_with(store.clone(), engine).await;
        let outcome = service.mark_attendance(ASHA, punch("IN")).await.unwrap();
        (store, outcome)
    }

    #[actix_web::test]
    async fn rollover_migrates_overflow_into_the_sealed_partition() {
        let (store, outcome) = rollover_fixture(RolloverPolicy::Migrate).await;
        assert!(outcome.rolled_over);
        assert_eq!(outcome.partition, 2);
        assert_eq!(store.partitions().await.unwrap(), vec![1, 2]);

        let active = store.load_partition(2).await.unwrap().records;
        let dates: Vec<_> = active.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(10, 16), day(10, 18)]);

        let sealed = store.load_partition(1).await.unwrap().records;
        assert_eq!(sealed.len(), 1);
        assert_eq!(sealed[0].date, day(10, 15));
    }

    #[actix_web::test]
    async fn rollover_truncate_drops_overflow() {
        let (store, outcome) = rollover_fixture(RolloverPolicy::Truncate).await;
        assert!(outcome.rolled_over);
        assert_eq!(store.load_partition(2).await.unwrap().records.len(), 2);
        assert!(store.load_partition(1).await.unwrap().records.is_empty());
    }

    #[actix_web::test]
    async fn punches_after_rollover_land_in_the_new_partition() {
        let store = sql_store().await;
        store
            .replace_partition(&Partition {
                index: 1,
                records: vec![AttendanceRecord::new(day(10, 16), "2", "B", "")],
            })
            .await
            .unwrap();
        let engine = EngineConfig {
            row_limit: 1,
            ..Default::default()
        };
        let (service, clock) = setup_with(store.clone(), engine).await;
        let first = service.mark_attendance(ASHA, punch("IN")).await.unwrap();
        assert_eq!(first.partition, 2);

        clock.set(18, 0, 0);
        let second = service.mark_attendance(ASHA, punch("OUT")).await.unwrap();
        assert!(!second.rolled_over);
        assert_eq!(second.partition, 2);
        assert_eq!(second.record.in_time, t(9, 0));
        assert_eq!(second.record.out_time, t(18, 0));
    }

    /// Seals the 10-18 row into partition 1, then punches far past the horizon.
    async fn sealed_rows_expire(store: Arc<dyn Store>) {
        let engine = EngineConfig {
            row_limit: 1,
            ..Default::default()
        };
        let (service, clock) = setup_with(store.clone(), engine).await;
        service.mark_attendance(ASHA, punch("IN")).await.unwrap();
        clock.advance_days(1);
        assert!(service.mark_attendance(ASHA, punch("IN")).await.unwrap().rolled_over);
        assert_eq!(store.load_partition(1).await.unwrap().records[0].date, day(10, 18));

        clock.advance_days(400);
        let outcome = service.mark_attendance(ASHA, punch("IN")).await.unwrap();
        let dates: Vec<_> = service
            .get_attendance_records(DateRange::default())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.date)
            .collect();
        assert_eq!(dates, vec![outcome.record.date]);
        assert!(store.load_partition(1).await.unwrap().records.is_empty());
    }

    #[actix_web::test]
    async fn sealed_partitions_are_pruned_too() {
        sealed_rows_expire(sql_store().await).await;
    }

    #[actix_web::test]
    async fn sealed_partitions_are_pruned_too_on_flat_files() {
        let dir = TempDir::new().unwrap();
        sealed_rows_expire(Arc::new(CsvStore::open(dir.path()).unwrap())).await;
    }

    #[actix_web::test]
    async fn admin_edit_logs_each_changed_field_once() {
        let (service, clock) = setup().await;
        service.mark_attendance(ASHA, punch("IN")).await.unwrap();
        clock.set(10, 0, 0);

        let admin = Editor {
            phone: ADMIN,
            name: "Admin1",
        };
        let edit = AttendanceEdit {
            in_time: Some("09:15:00".into()),
            wfh: Some("No".into()),
            ..Default::default()
        };
        let entries = service
            .update_attendance_fields(&admin, ASHA, day(10, 18), &edit, "late bus")
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].field, "IN");
        assert_eq!(entries[0].old_value, "09:00:00");
        assert_eq!(entries[0].new_value, "09:15:00");
        assert_eq!(entries[0].edited_by_phone, ADMIN);

        // saving the same values again is silent
        let again = service
            .update_attendance_fields(&admin, ASHA, day(10, 18), &edit, "late bus")
            .await
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(service.edit_log().await.unwrap(), entries);

        // short forms of the stored values are the same values
        let short = AttendanceEdit {
            in_time: Some("09:15".into()),
            wfh: Some("no".into()),
            ..Default::default()
        };
        let again = service
            .update_attendance_fields(&admin, ASHA, day(10, 18), &short, "typo")
            .await
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(service.edit_log().await.unwrap().len(), 1);

        let records = service.get_attendance_records(DateRange::default()).await.unwrap();
        assert_eq!(records[0].in_time, t(9, 15));
    }

    #[actix_web::test]
    async fn editing_a_missing_row_is_record_not_found() {
        let (service, _clock) = setup().await;
        let err = service
            .update_attendance_fields(
                &Editor {
                    phone: ADMIN,
                    name: "Admin1",
                },
                ASHA,
                day(10, 1),
                &AttendanceEdit::default(),
                "",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RecordNotFound { .. }));
    }

    #[actix_web::test]
    async fn records_are_filtered_and_sorted_across_partitions() {
        let store = sql_store().await;
        store
            .replace_partition(&Partition {
                index: 1,
                records: vec![AttendanceRecord::new(day(10, 3), "2", "B", "")],
            })
            .await
            .unwrap();
        store
            .replace_partition(&Partition {
                index: 2,
                records: vec![
                    AttendanceRecord::new(day(10, 9), "2", "B", ""),
                    AttendanceRecord::new(day(10, 1), "3", "C", ""),
                ],
            })
            .await
            .unwrap();
        let (service, _clock) = setup_with(store, EngineConfig::default()).await;

        let all = service.get_attendance_records(DateRange::default()).await.unwrap();
        let dates: Vec<_> = all.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(10, 1), day(10, 3), day(10, 9)]);

        let range = DateRange {
            start: Some(day(10, 2)),
            end: Some(day(10, 9)),
        };
        assert_eq!(service.get_attendance_records(range).await.unwrap().len(), 2);

        let backwards = DateRange {
            start: Some(day(10, 9)),
            end: Some(day(10, 2)),
        };
        assert!(matches!(
            service.get_attendance_records(backwards).await,
            Err(ServiceError::BadRequest(_))
        ));

        let export = service.export_csv(range).await.unwrap();
        assert_eq!(export.file_name, "attendance_2026-10-02_to_2026-10-09.csv");
        let text = String::from_utf8(export.bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Name,PhoneNumber,IN,OUT,WFH,Leave,Departments,Office")
        );
        assert_eq!(lines.count(), 2);
    }

    #[actix_web::test]
    async fn empty_export_still_has_a_header() {
        let (service, _clock) = setup().await;
        let export = service.export_csv(DateRange::default()).await.unwrap();
        assert_eq!(export.file_name, "attendance_all_to_all.csv");
        assert!(String::from_utf8(export.bytes).unwrap().starts_with("Date,Name,PhoneNumber"));
    }

    #[actix_web::test]
    async fn signup_rejects_whitelisted_and_existing_phones() {
        let (service, _clock) = setup().await;
        // opening the service warms both registry layers
        assert!(service.phone_filter.might_exist(ASHA));
        assert!(service.phone_cache.is_taken(ASHA).await);
        assert!(matches!(
            service.register(ADMIN, "Mallory", "pw").await,
            Err(ServiceError::DuplicateRegistration(_))
        ));
        assert!(matches!(
            service.register(ASHA, "Asha again", "pw").await,
            Err(ServiceError::DuplicateRegistration(_))
        ));
        assert!(matches!(
            service.register("", "Nobody", "pw").await,
            Err(ServiceError::BadRequest(_))
        ));

        let profile = service.register(" 9800000002 ", "Ravi", "pw").await.unwrap();
        assert_eq!(profile.phone, "9800000002");
        assert!(!profile.is_admin);
        assert!(!service.is_phone_available("9800000002").await.unwrap());

        let user = service.login("9800000002", "pw").await.unwrap();
        assert_eq!(user.name, "Ravi");
        assert!(matches!(
            service.login("9800000002", "wrong").await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            service.login("9800000003", "pw").await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[actix_web::test]
    async fn profile_updates_and_phone_changes() {
        let (service, _clock) = setup().await;
        service.register("9800000002", "Ravi", "pw").await.unwrap();

        let taken = ProfileUpdate {
            phone: Some(ASHA.into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_profile("9800000002", taken).await,
            Err(ServiceError::DuplicateRegistration(_))
        ));

        let mismatch = ProfileUpdate {
            password: Some("a".into()),
            confirm_password: Some("b".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_profile("9800000002", mismatch).await,
            Err(ServiceError::BadRequest(_))
        ));

        let unknown_dept = ProfileUpdate {
            departments: Some(vec!["Sales".into()]),
            ..Default::default()
        };
        assert!(matches!(
            service.update_profile("9800000002", unknown_dept).await,
            Err(ServiceError::BadRequest(_))
        ));

        let update = ProfileUpdate {
            name: Some("Ravi K".into()),
            phone: Some("9800000009".into()),
            departments: Some(vec!["Ops".into(), "Ops".into()]),
            password: Some("new".into()),
            confirm_password: Some("new".into()),
        };
        let profile = service.update_profile("9800000002", update).await.unwrap();
        assert_eq!(profile.phone, "9800000009");
        assert_eq!(profile.name, "Ravi K");
        assert_eq!(profile.departments, vec!["Ops"]);
        assert!(service.login("9800000009", "new").await.is_ok());

        // the old phone is free again
        assert!(service.is_phone_available("9800000002").await.unwrap());
        assert!(matches!(
            service.update_profile("9800000002", ProfileUpdate::default()).await,
            Err(ServiceError::UserNotFound(_))
        ));
    }

    #[actix_web::test]
    async fn grant_access_creates_and_whitelists() {
        let (service, _clock) = setup().await;
        assert!(!service.is_admin("9800000005").await.unwrap());
        assert!(service.grant_access("9800000005", None).await.unwrap());
        assert!(service.is_admin("9800000005").await.unwrap());
        assert_eq!(service.profile("9800000005").await.unwrap().name, "User-9800000005");

        // existing users are only whitelisted
        assert!(!service.grant_access(ASHA, Some("ignored")).await.unwrap());
        assert_eq!(service.whitelist().await.unwrap(), vec![ADMIN, "9800000005", ASHA]);
        assert!(service.require_admin(ASHA).await.is_ok());
        assert!(matches!(
            service.require_admin("9800000002").await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[actix_web::test]
    async fn reference_data_validation() {
        let (service, _clock) = setup().await;
        assert!(service.add_office(Office { name: " ".into(), ..office("x") }).await.is_err());
        assert!(service.add_office(Office { radius_meters: 0.0, ..office("x") }).await.is_err());
        assert!(service.add_office(Office { latitude: 120.0, ..office("x") }).await.is_err());

        let replaced = service
            .add_office(Office {
                radius_meters: 500.0,
                ..office(" OfficeA ")
            })
            .await
            .unwrap();
        assert_eq!(replaced.name, "OfficeA");
        let offices = service.offices().await.unwrap();
        assert_eq!(offices.len(), 2);
        assert!(offices.iter().any(|o| o.name == "OfficeA" && o.radius_meters == 500.0));
        assert!(service.delete_office("OfficeB").await.unwrap());
        assert!(!service.delete_office("OfficeB").await.unwrap());

        assert!(service.add_department("  ").await.is_err());
        service.add_department("Sales").await.unwrap();
        assert_eq!(service.departments().await.unwrap().len(), 2);
        assert!(service.delete_department("Sales").await.unwrap());

        service.set_setting(WHITELIST_KEY, " 1, ,2 ").await.unwrap();
        assert_eq!(service.setting(WHITELIST_KEY).await.unwrap(), "1,2");
        assert_eq!(service.setting("missing").await.unwrap(), "");
    }

    #[actix_web::test]
    async fn flat_file_backend_behaves_the_same() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn Store> = Arc::new(CsvStore::open(dir.path()).unwrap());
        let engine = EngineConfig {
            row_limit: 1,
            ..Default::default()
        };
        let (service, clock) = setup_with(store.clone(), engine).await;

        service.mark_attendance(ASHA, at("IN", "OfficeA")).await.unwrap();
        clock.advance_days(1);
        let outcome = service.mark_attendance(ASHA, at("OUT", "OfficeB")).await.unwrap();
        assert!(outcome.rolled_over);
        assert_eq!(store.partitions().await.unwrap(), vec![1, 2]);

        let entries = service
            .update_attendance_fields(
                &Editor {
                    phone: ADMIN,
                    name: "Admin1",
                },
                ASHA,
                day(10, 18),
                &AttendanceEdit {
                    leave: Some("Yes".into()),
                    ..Default::default()
                },
                "sick",
            )
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(store.load_partition(1).await.unwrap().records[0].leave, Some(true));
        assert_eq!(service.get_attendance_records(DateRange::default()).await.unwrap().len(), 2);
    }
}
