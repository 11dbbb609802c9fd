use chrono::NaiveTime;
use serde::Serialize;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::{ServiceError, ServiceResult};
use crate::model::attendance::AttendanceRecord;

/// The punches a user can make. Parsing is case-insensitive, surrounding
/// whitespace is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, ToSchema)]
#[strum(ascii_case_insensitive)]
pub enum Action {
    #[strum(serialize = "IN")]
    #[serde(rename = "IN")]
    In,
    #[strum(serialize = "OUT")]
    #[serde(rename = "OUT")]
    Out,
    #[strum(serialize = "WFH IN")]
    #[serde(rename = "WFH IN")]
    WfhIn,
    #[strum(serialize = "WFH OUT")]
    #[serde(rename = "WFH OUT")]
    WfhOut,
    #[strum(serialize = "LEAVE")]
    #[serde(rename = "LEAVE")]
    Leave,
}

impl Action {
    pub fn parse(raw: &str) -> ServiceResult<Self> {
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        normalized
            .parse()
            .map_err(|_| ServiceError::InvalidAction(raw.trim().to_uppercase()))
    }
}

/// Result of a successful [`apply_action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub action: Action,
    pub office_added: bool,
}

pub fn apply_action(
    record: &mut AttendanceRecord,
    action: Action,
    office: Option<&str>,
    now: NaiveTime,
) -> Recorded {
    let office_added = office.is_some_and(|o| record.merge_office(o));

    match action {
        Action::In => record.in_time = Some(now),
        Action::Out => record.out_time = Some(now),
        Action::WfhIn => {
            record.in_time = Some(now);
            record.wfh = Some(true);
        }
        Action::WfhOut => {
            record.out_time = Some(now);
            record.wfh = Some(true);
        }
        Action::Leave => record.leave = Some(true),
    }

    // Rows are never left with blank flags once an action touched them.
    record.wfh.get_or_insert(false);
    record.leave.get_or_insert(false);

    Recorded {
        action,
        office_added,
    }
}
