use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One changed field of one attendance record. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct EditLogEntry {
    #[schema(example = "2026-01-02T10:00:00", value_type = String, format = "date-time")]
    pub timestamp: NaiveDateTime,
    pub edited_by_phone: String,
    pub edited_by_name: String,
    pub target_phone: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "IN")]
    pub field: String,
    #[schema(example = "09:00:00")]
    pub old_value: String,
    #[schema(example = "09:15:00")]
    pub new_value: String,
    #[schema(example = "Forgot to punch in")]
    pub reason: String,
}
