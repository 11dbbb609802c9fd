use crate::attendance::audit::{AttendanceEdit, Editor};
use crate::auth::auth::AuthUser;
use crate::error::ServiceError;
use crate::model::attendance::{AttendanceRecord, DATE_FORMAT};
use crate::model::edit_log::EditLogEntry;
use crate::service::{AttendanceService, DateRange};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditAttendanceRequest {
    #[serde(flatten)]
    pub fields: AttendanceEdit,
    #[schema(example = "Forgot to punch in")]
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EditAttendanceResponse {
    #[schema(example = "Updated & logged")]
    pub message: String,
    pub changes: Vec<EditLogEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SettingValue {
    #[schema(example = "8080042473,9800000001")]
    pub value: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantAccessRequest {
    #[schema(example = "9800000005")]
    pub phone: String,
    /// Used only when the user does not exist yet
    #[schema(example = "Ravi")]
    pub name: Option<String>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ServiceError::BadRequest(format!("Invalid date `{raw}`, expected YYYY-MM-DD")))
}

/// List attendance records across all partitions
#[utoipa::path(
    get,
    path = "/api/admin/attendance",
    params(DateRange),
    responses(
        (status = 200, description = "Records sorted by date", body = [AttendanceRecord]),
        (status = 400, description = "Start date after end date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not on the admin whitelist")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn list_records(
    auth: AuthUser,
    query: web::Query<DateRange>,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    service.require_admin(&auth.phone).await?;
    let records = service.get_attendance_records(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Download attendance records as CSV
#[utoipa::path(
    get,
    path = "/api/admin/attendance/export",
    params(DateRange),
    responses(
        (status = 200, description = "CSV file with the legacy column names", content_type = "text/csv"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not on the admin whitelist")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn export_records(
    auth: AuthUser,
    query: web::Query<DateRange>,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    service.require_admin(&auth.phone).await?;
    let export = service.export_csv(query.into_inner()).await?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(export.file_name)],
        })
        .body(export.bytes))
}

/// Correct a past attendance record
#[utoipa::path(
    put,
    path = "/api/admin/attendance/{phone}/{date}",
    params(
        ("phone" = String, Path, description = "Phone number of the user"),
        ("date" = String, Path, description = "Day of the record, YYYY-MM-DD")
    ),
    request_body = EditAttendanceRequest,
    responses(
        (status = 200, description = "Changed fields, one log entry each", body = EditAttendanceResponse),
        (status = 400, description = "Malformed date or field value"),
        (status = 403, description = "Not on the admin whitelist"),
        (status = 404, description = "No record for that phone and date")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn edit_record(
    auth: AuthUser,
    path: web::Path<(String, String)>,
    body: web::Json<EditAttendanceRequest>,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    service.require_admin(&auth.phone).await?;
    let (phone, date) = path.into_inner();
    let date = parse_date(&date)?;

    let editor = Editor {
        phone: &auth.phone,
        name: &auth.name,
    };
    let changes = service
        .update_attendance_fields(&editor, &phone, date, &body.fields, &body.reason)
        .await?;

    let message = if changes.is_empty() {
        "Nothing changed"
    } else {
        "Updated & logged"
    };
    Ok(HttpResponse::Ok().json(EditAttendanceResponse {
        message: message.to_string(),
        changes,
    }))
}

/// List every attendance correction
#[utoipa::path(
    get,
    path = "/api/admin/edits",
    responses(
        (status = 200, description = "Edit log, oldest first", body = [EditLogEntry]),
        (status = 403, description = "Not on the admin whitelist")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn list_edits(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    service.require_admin(&auth.phone).await?;
    Ok(HttpResponse::Ok().json(service.edit_log().await?))
}

/// Read a setting
#[utoipa::path(
    get,
    path = "/api/admin/settings/{key}",
    params(
        ("key" = String, Path, description = "Setting key, e.g. whitelist")
    ),
    responses(
        (status = 200, description = "Setting value, empty when unset", body = Object, example = json!({
            "key": "whitelist",
            "value": "8080042473"
        })),
        (status = 403, description = "Not on the admin whitelist")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn get_setting(
    auth: AuthUser,
    path: web::Path<String>,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    service.require_admin(&auth.phone).await?;
    let key = path.into_inner();
    let value = service.setting(&key).await?;
    Ok(HttpResponse::Ok().json(json!({ "key": key, "value": value })))
}

/// Write a setting
#[utoipa::path(
    put,
    path = "/api/admin/settings/{key}",
    params(
        ("key" = String, Path, description = "Setting key, e.g. whitelist")
    ),
    request_body = SettingValue,
    responses(
        (status = 200, description = "Setting saved"),
        (status = 403, description = "Not on the admin whitelist")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn put_setting(
    auth: AuthUser,
    path: web::Path<String>,
    body: web::Json<SettingValue>,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    service.require_admin(&auth.phone).await?;
    let key = path.into_inner();
    service.set_setting(&key, &body.value).await?;
    info!(key = %key, by = %auth.phone, "Setting updated");
    Ok(HttpResponse::Ok().json(json!({ "message": "Setting saved" })))
}

/// Grant dashboard access to a phone
#[utoipa::path(
    post,
    path = "/api/admin/access",
    request_body = GrantAccessRequest,
    responses(
        (status = 200, description = "Phone whitelisted", body = Object, example = json!({
            "message": "Access granted via whitelist",
            "user_created": true
        })),
        (status = 400, description = "Phone missing"),
        (status = 403, description = "Not on the admin whitelist")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn grant_access(
    auth: AuthUser,
    body: web::Json<GrantAccessRequest>,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    service.require_admin(&auth.phone).await?;
    let created = service
        .grant_access(&body.phone, body.name.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Access granted via whitelist",
        "user_created": created
    })))
}
