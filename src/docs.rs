use crate::api::admin::{EditAttendanceRequest, EditAttendanceResponse, GrantAccessRequest, SettingValue};
use crate::api::attendance::MarkRequest;
use crate::api::reference::CreateDepartment;
use crate::attendance::action::Action;
use crate::attendance::audit::AttendanceEdit;
use crate::attendance::geofence::GeoPoint;
use crate::auth::handlers::{LoginReq, LoginResponse, SignupReq};
use crate::model::attendance::AttendanceRecord;
use crate::model::department::DepartmentGroup;
use crate::model::edit_log::EditLogEntry;
use crate::model::office::Office;
use crate::model::user::UserProfile;
use crate::service::{DateRange, MarkOutcome, ProfileUpdate};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance Tracking

Employees punch in and out once per day, from an office or from home.

### Key Features
- **Punches**: IN, OUT, WFH IN, WFH OUT and LEAVE on today's record,
  with optional office geofence checks
- **Admin dashboard**: browse and export records, correct past records
  (every corrected field is written to an append-only edit log)
- **Reference data**: offices with coordinates and radius, department groups
- **Accounts**: signup, login, profile and phone changes

### Security
Protected endpoints take a **JWT Bearer** access token from `/auth/login`.
Admin endpoints additionally require the caller's phone to be on the
`whitelist` setting.

### Storage
Records live in numbered partitions. Rows older than the retention horizon
are pruned on every punch, and a full partition rolls over into the next one.
"#,
    ),
    paths(
        crate::auth::handlers::signup,
        crate::auth::handlers::login,
        crate::auth::handlers::profile,
        crate::auth::handlers::update_profile,

        crate::api::attendance::mark_attendance,

        crate::api::reference::list_offices,
        crate::api::reference::save_office,
        crate::api::reference::delete_office,
        crate::api::reference::list_departments,
        crate::api::reference::add_department,
        crate::api::reference::delete_department,

        crate::api::admin::list_records,
        crate::api::admin::export_records,
        crate::api::admin::edit_record,
        crate::api::admin::list_edits,
        crate::api::admin::get_setting,
        crate::api::admin::put_setting,
        crate::api::admin::grant_access
    ),
    components(
        schemas(
            SignupReq,
            LoginReq,
            LoginResponse,
            UserProfile,
            ProfileUpdate,
            MarkRequest,
            MarkOutcome,
            Action,
            GeoPoint,
            AttendanceRecord,
            DateRange,
            AttendanceEdit,
            EditAttendanceRequest,
            EditAttendanceResponse,
            EditLogEntry,
            SettingValue,
            GrantAccessRequest,
            Office,
            DepartmentGroup,
            CreateDepartment
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Signup, login and profile"),
        (name = "Attendance", description = "Daily punches"),
        (name = "Offices", description = "Office locations"),
        (name = "Departments", description = "Department groups"),
        (name = "Admin", description = "Whitelisted dashboard operations"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/auth/login",
            "/api/attendance",
            "/api/admin/attendance/{phone}/{date}",
            "/api/offices/{name}",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }
}
