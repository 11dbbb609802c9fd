use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Wall-clock format used for `IN`/`OUT` everywhere: storage, API and edit logs.
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Office value meaning "no office selected".
pub const NO_OFFICE: &str = "-";

/// One row per (phone, day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "9800000001")]
    pub phone: String,
    #[schema(example = "Asha")]
    pub name: String,
    #[schema(example = "Management Team")]
    pub departments: String,
    #[schema(example = "09:00:00", value_type = Option<String>)]
    pub in_time: Option<NaiveTime>,
    #[schema(example = "18:05:12", value_type = Option<String>)]
    pub out_time: Option<NaiveTime>,
    /// `None` only for rows written by something other than this service.
    pub wfh: Option<bool>,
    pub leave: Option<bool>,
    #[schema(example = json!(["HQ", "Branch"]))]
    pub offices: Vec<String>,
}

impl AttendanceRecord {
    pub fn new(date: NaiveDate, phone: &str, name: &str, departments: &str) -> Self {
        Self {
            date,
            phone: phone.to_string(),
            name: name.to_string(),
            departments: departments.to_string(),
            in_time: None,
            out_time: None,
            wfh: Some(false),
            leave: Some(false),
            offices: Vec::new(),
        }
    }

    pub fn key_matches(&self, phone: &str, date: NaiveDate) -> bool {
        self.phone == phone && self.date == date
    }

    /// Appends `office` unless it is blank, the `-` sentinel, or already present.
    pub fn merge_office(&mut self, office: &str) -> bool {
        let office = office.trim();
        if office.is_empty() || office == NO_OFFICE {
            return false;
        }
        if self.offices.iter().any(|o| o == office) {
            return false;
        }
        self.offices.push(office.to_string());
        true
    }

    pub fn offices_joined(&self) -> String {
        self.offices.join(",")
    }

    /// Value of an editable field as it is shown to and typed by admins.
    pub fn field_value(&self, field: EditableField) -> String {
        match field {
            EditableField::In => format_time(self.in_time),
            EditableField::Out => format_time(self.out_time),
            EditableField::Wfh => format_flag(self.wfh).to_string(),
            EditableField::Leave => format_flag(self.leave).to_string(),
        }
    }
}

/// Fields an admin may correct after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumIter)]
pub enum EditableField {
    #[strum(serialize = "IN")]
    In,
    #[strum(serialize = "OUT")]
    Out,
    #[strum(serialize = "WFH")]
    Wfh,
    #[strum(serialize = "Leave")]
    Leave,
}

pub fn format_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// Blank means "no time". Accepts `HH:MM` as well as `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<Option<NaiveTime>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map(Some)
        .map_err(|_| format!("`{raw}` is not a time of day (HH:MM:SS)"))
}

pub fn format_flag(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "",
    }
}

pub fn parse_flag(raw: &str) -> Result<Option<bool>, String> {
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "yes" | "y" | "true" | "1" => Ok(Some(true)),
        "no" | "n" | "false" | "0" => Ok(Some(false)),
        other => Err(format!("`{other}` is not Yes/No")),
    }
}

pub fn parse_offices(raw: &str) -> Vec<String> {
    let mut offices: Vec<String> = Vec::new();
    for office in raw.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        if !offices.iter().any(|o| o == office) {
            offices.push(office.to_string());
        }
    }
    offices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AttendanceRecord {
        AttendanceRecord::new(
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            "9800000001",
            "Asha",
            "Ops",
        )
    }

    #[test]
    fn merge_office_is_set_like_and_ordered() {
        let mut r = record();
        assert!(r.merge_office("HQ"));
        assert!(r.merge_office(" Branch "));
        assert!(!r.merge_office("HQ"));
        assert!(!r.merge_office(NO_OFFICE));
        assert!(!r.merge_office("  "));
        assert_eq!(r.offices, vec!["HQ", "Branch"]);
        assert_eq!(r.offices_joined(), "HQ,Branch");
    }

    #[test]
    fn parse_offices_suppresses_duplicates() {
        assert_eq!(parse_offices("HQ, Branch,HQ,,"), vec!["HQ", "Branch"]);
        assert!(parse_offices("").is_empty());
    }

    #[test]
    fn flags_round_trip_through_text() {
        assert_eq!(parse_flag("Yes").unwrap(), Some(true));
        assert_eq!(parse_flag(" no ").unwrap(), Some(false));
        assert_eq!(parse_flag("").unwrap(), None);
        assert!(parse_flag("maybe").is_err());
        assert_eq!(format_flag(None), "");
    }

    #[test]
    fn times_accept_short_form() {
        let t = parse_time("09:15").unwrap().unwrap();
        assert_eq!(format_time(Some(t)), "09:15:00");
        assert_eq!(parse_time("  ").unwrap(), None);
        assert!(parse_time("quarter past nine").is_err());
    }

    #[test]
    fn field_values_render_for_admins() {
        let mut r = record();
        r.in_time = parse_time("09:00:00").unwrap();
        assert_eq!(r.field_value(EditableField::In), "09:00:00");
        assert_eq!(r.field_value(EditableField::Out), "");
        assert_eq!(r.field_value(EditableField::Wfh), "No");
        assert_eq!(EditableField::Leave.to_string(), "Leave");
    }
}
