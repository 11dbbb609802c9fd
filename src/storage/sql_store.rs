//! Relational backend on SQLite. Attendance rows carry their partition index
//! as a column; `attendance_partitions` remembers partitions that are empty.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use super::{AttendanceRow, Partition, Store};
use crate::error::{ServiceError, ServiceResult};
use crate::model::attendance::{AttendanceRecord, DATE_FORMAT};
use crate::model::department::DepartmentGroup;
use crate::model::edit_log::EditLogEntry;
use crate::model::office::Office;
use crate::model::role::Role;
use crate::model::user::{User, UserUpdate};

const ATTENDANCE_COLUMNS: &str =
    "date, name, phone, in_time, out_time, wfh, leave, departments, office";

#[derive(FromRow)]
struct UserSql {
    phone: String,
    name: String,
    departments: String,
    password_hash: String,
    role: String,
}

impl From<UserSql> for User {
    fn from(row: UserSql) -> Self {
        Self {
            phone: row.phone,
            name: row.name,
            departments: row.departments,
            password_hash: row.password_hash,
            role: Role::from_label(&row.role),
        }
    }
}

#[derive(Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &SqliteRow) -> ServiceResult<AttendanceRecord> {
    AttendanceRecord::try_from(AttendanceRow::from_row(row)?)
}

async fn upsert_in<'e, E>(executor: E, index: u32, record: &AttendanceRecord) -> ServiceResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let row = AttendanceRow::from(record);
    sqlx::query(
        r#"
        INSERT INTO attendance
            (partition_index, date, name, phone, in_time, out_time, wfh, leave, departments, office)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (partition_index, date, phone) DO UPDATE SET
            name = excluded.name,
            in_time = excluded.in_time,
            out_time = excluded.out_time,
            wfh = excluded.wfh,
            leave = excluded.leave,
            departments = excluded.departments,
            office = excluded.office
        "#,
    )
    .bind(index)
    .bind(row.date)
    .bind(row.name)
    .bind(row.phone)
    .bind(row.in_time)
    .bind(row.out_time)
    .bind(row.wfh)
    .bind(row.leave)
    .bind(row.departments)
    .bind(row.office)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl Store for SqlStore {
    async fn get_user(&self, phone: &str) -> ServiceResult<Option<User>> {
        let user = sqlx::query_as::<_, UserSql>(
            "SELECT phone, name, departments, password_hash, role FROM users WHERE phone = ?",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user.map(User::from))
    }

    async fn list_users(&self) -> ServiceResult<Vec<User>> {
        let users = sqlx::query_as::<_, UserSql>(
            "SELECT phone, name, departments, password_hash, role FROM users ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users.into_iter().map(User::from).collect())
    }

    async fn put_user(&self, user: &User) -> ServiceResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO users (phone, name, departments, password_hash, role)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.phone)
        .bind(&user.name)
        .bind(&user.departments)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_user(&self, phone: &str, update: &UserUpdate) -> ServiceResult<bool> {
        let Some(mut user) = self.get_user(phone).await? else {
            return Ok(false);
        };
        update.apply_to(&mut user);

        let result = sqlx::query(
            r#"
            UPDATE users
            SET phone = ?, name = ?, departments = ?, password_hash = ?, role = ?
            WHERE phone = ?
            "#,
        )
        .bind(&user.phone)
        .bind(&user.name)
        .bind(&user.departments)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(phone)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_offices(&self) -> ServiceResult<Vec<Office>> {
        Ok(sqlx::query_as::<_, Office>(
            "SELECT name, latitude, longitude, radius_meters FROM offices ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn put_office(&self, office: &Office) -> ServiceResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO offices (name, latitude, longitude, radius_meters)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&office.name)
        .bind(office.latitude)
        .bind(office.longitude)
        .bind(office.radius_meters)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_office(&self, name: &str) -> ServiceResult<bool> {
        let result = sqlx::query("DELETE FROM offices WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_departments(&self) -> ServiceResult<Vec<DepartmentGroup>> {
        Ok(
            sqlx::query_as::<_, DepartmentGroup>("SELECT name FROM departments ORDER BY rowid")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn put_department(&self, group: &DepartmentGroup) -> ServiceResult<()> {
        sqlx::query("INSERT OR IGNORE INTO departments (name) VALUES (?)")
            .bind(&group.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_department(&self, name: &str) -> ServiceResult<bool> {
        let result = sqlx::query("DELETE FROM departments WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_setting(&self, key: &str) -> ServiceResult<Option<String>> {
        Ok(
            sqlx::query_scalar::<_, String>(
                "SELECT setting_value FROM settings WHERE setting_key = ?",
            )
            .bind(key)
            .fetch_optional(&self.pool)
            .await?,
        )
    }

    async fn put_setting(&self, key: &str, value: &str) -> ServiceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (setting_key, setting_value) VALUES (?, ?)
            ON CONFLICT (setting_key) DO UPDATE SET setting_value = excluded.setting_value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn partitions(&self) -> ServiceResult<Vec<u32>> {
        let indexes = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT partition_index FROM attendance_partitions
            UNION
            SELECT DISTINCT partition_index FROM attendance
            ORDER BY 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let indexes: Vec<u32> = indexes
            .into_iter()
            .filter_map(|i| u32::try_from(i).ok())
            .collect();
        Ok(if indexes.is_empty() { vec![1] } else { indexes })
    }

    async fn load_partition(&self, index: u32) -> ServiceResult<Partition> {
        let rows = sqlx::query(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE partition_index = ? ORDER BY rowid"
        ))
        .bind(index)
        .fetch_all(&self.pool)
        .await?;
        let records = rows
            .iter()
            .map(record_from_row)
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(Partition { index, records })
    }

    async fn replace_partition(&self, partition: &Partition) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT OR IGNORE INTO attendance_partitions (partition_index) VALUES (?)")
            .bind(partition.index)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM attendance WHERE partition_index = ?")
            .bind(partition.index)
            .execute(&mut *tx)
            .await?;
        for record in &partition.records {
            upsert_in(&mut *tx, partition.index, record).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_record(&self, index: u32, record: &AttendanceRecord) -> ServiceResult<()> {
        upsert_in(&self.pool, index, record).await
    }

    async fn prune_before(&self, cutoff: NaiveDate, below: u32) -> ServiceResult<usize> {
        // date() also reads rows stored with a time part
        let result = sqlx::query("DELETE FROM attendance WHERE partition_index < ? AND date(date) < ?")
            .bind(below)
            .bind(cutoff.format(DATE_FORMAT).to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn find_record(
        &self,
        phone: &str,
        date: NaiveDate,
    ) -> ServiceResult<Option<(u32, AttendanceRecord)>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT partition_index, {ATTENDANCE_COLUMNS} FROM attendance
            WHERE phone = ? AND date = ?
            ORDER BY partition_index DESC
            LIMIT 1
            "#
        ))
        .bind(phone)
        .bind(date.format(DATE_FORMAT).to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let index: i64 = row.try_get("partition_index")?;
                let index = u32::try_from(index).map_err(|_| {
                    ServiceError::StorageUnavailable(format!("bad partition index {index}"))
                })?;
                Ok(Some((index, record_from_row(&row)?)))
            }
            None => Ok(None),
        }
    }

    async fn list_edits(&self) -> ServiceResult<Vec<EditLogEntry>> {
        Ok(sqlx::query_as::<_, EditLogEntry>(
            r#"
            SELECT timestamp, edited_by_phone, edited_by_name, target_phone, date,
                   field, old_value, new_value, reason
            FROM attendance_edits
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn apply_edit(
        &self,
        index: u32,
        record: &AttendanceRecord,
        entries: &[EditLogEntry],
    ) -> ServiceResult<()> {
        let row = AttendanceRow::from(record);
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE attendance
            SET in_time = ?, out_time = ?, wfh = ?, leave = ?, office = ?
            WHERE partition_index = ? AND date = ? AND phone = ?
            "#,
        )
        .bind(&row.in_time)
        .bind(&row.out_time)
        .bind(&row.wfh)
        .bind(&row.leave)
        .bind(&row.office)
        .bind(index)
        .bind(&row.date)
        .bind(&row.phone)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // dropping the transaction rolls it back
            return Err(ServiceError::RecordNotFound {
                phone: row.phone,
                date: row.date,
            });
        }

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO attendance_edits
                    (timestamp, edited_by_phone, edited_by_name, target_phone, date,
                     field, old_value, new_value, reason)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.timestamp)
            .bind(&entry.edited_by_phone)
            .bind(&entry.edited_by_name)
            .bind(&entry.target_phone)
            .bind(entry.date)
            .bind(&entry.field)
            .bind(&entry.old_value)
            .bind(&entry.new_value)
            .bind(&entry.reason)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
