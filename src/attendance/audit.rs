use chrono::NaiveDateTime;
use serde::Deserialize;
use strum::IntoEnumIterator;
use utoipa::ToSchema;

use crate::error::{ServiceError, ServiceResult};
use crate::model::attendance::{
    AttendanceRecord, EditableField, format_flag, format_time, parse_flag, parse_time,
};
use crate::model::edit_log::EditLogEntry;

/// Admin correction of a past record, values as typed in the dashboard.
/// Absent fields are left alone.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct AttendanceEdit {
    #[serde(rename = "IN", alias = "in_time")]
    #[schema(example = "09:15:00")]
    pub in_time: Option<String>,
    #[serde(rename = "OUT", alias = "out_time")]
    #[schema(example = "18:00:00")]
    pub out_time: Option<String>,
    #[serde(rename = "WFH", alias = "wfh")]
    #[schema(example = "No")]
    pub wfh: Option<String>,
    #[serde(rename = "Leave", alias = "leave")]
    #[schema(example = "No")]
    pub leave: Option<String>,
}

impl AttendanceEdit {
    fn get(&self, field: EditableField) -> Option<&str> {
        match field {
            EditableField::In => self.in_time.as_deref(),
            EditableField::Out => self.out_time.as_deref(),
            EditableField::Wfh => self.wfh.as_deref(),
            EditableField::Leave => self.leave.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: EditableField,
    pub old_value: String,
    pub new_value: String,
}

/// Canonical stored form of a typed value, so `09:00` and `09:00:00` compare equal.
fn normalize(field: EditableField, raw: &str) -> ServiceResult<String> {
    let normalized = match field {
        EditableField::In | EditableField::Out => parse_time(raw).map(format_time),
        EditableField::Wfh | EditableField::Leave => {
            parse_flag(raw).map(|flag| format_flag(flag).to_string())
        }
    };
    normalized.map_err(ServiceError::BadRequest)
}

/// Fields whose normalized value actually differs from what is stored.
/// Fails on the first value that does not parse.
pub fn diff_edit(record: &AttendanceRecord, edit: &AttendanceEdit) -> ServiceResult<Vec<FieldChange>> {
    let mut changes = Vec::new();
    for field in EditableField::iter() {
        let Some(raw) = edit.get(field) else {
            continue;
        };
        let new_value = normalize(field, raw)?;
        let old_value = record.field_value(field);
        if old_value != new_value {
            changes.push(FieldChange {
                field,
                old_value,
                new_value,
            });
        }
    }
    Ok(changes)
}

/// Writes the changes into `record`. Fails without partial writes when any
/// value does not parse.
pub fn apply_changes(record: &mut AttendanceRecord, changes: &[FieldChange]) -> ServiceResult<()> {
    let mut updated = record.clone();
    for change in changes {
        let value = change.new_value.as_str();
        match change.field {
            EditableField::In => updated.in_time = parse_time(value).map_err(ServiceError::BadRequest)?,
            EditableField::Out => {
                updated.out_time = parse_time(value).map_err(ServiceError::BadRequest)?
            }
            EditableField::Wfh => updated.wfh = parse_flag(value).map_err(ServiceError::BadRequest)?,
            EditableField::Leave => {
                updated.leave = parse_flag(value).map_err(ServiceError::BadRequest)?
            }
        }
    }
    *record = updated;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Editor<'a> {
    pub phone: &'a str,
    pub name: &'a str,
}

/// One audit row for one changed field.
pub fn record_edit(
    editor: &Editor<'_>,
    record: &AttendanceRecord,
    change: &FieldChange,
    reason: &str,
    at: NaiveDateTime,
) -> EditLogEntry {
    EditLogEntry {
        timestamp: at,
        edited_by_phone: editor.phone.to_string(),
        edited_by_name: editor.name.to_string(),
        target_phone: record.phone.clone(),
        date: record.date,
        field: change.field.to_string(),
        old_value: change.old_value.clone(),
        new_value: change.new_value.clone(),
        reason: reason.trim().to_string(),
    }
}
