use crate::attendance::geofence::GeoPoint;
use crate::auth::auth::AuthUser;
use crate::service::{AttendanceService, MarkOutcome, Punch};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkRequest {
    /// One of IN, OUT, WFH IN, WFH OUT, LEAVE (any case)
    #[schema(example = "IN")]
    pub action: String,
    /// Office name, or "-" / absent for none
    #[schema(example = "HQ")]
    pub office: Option<String>,
    #[schema(example = 18.9435)]
    pub latitude: Option<f64>,
    #[schema(example = 72.8382)]
    pub longitude: Option<f64>,
    /// Record at the office even when the device is outside its radius
    #[serde(default)]
    pub confirmed: bool,
}

impl MarkRequest {
    fn position(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// Mark attendance for today
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkRequest,
    responses(
        (status = 200, description = "Punch recorded", body = MarkOutcome),
        (status = 400, description = "Invalid action, office or coordinates", body = Object, example = json!({
            "error": "INVALID_ACTION",
            "message": "Invalid action: NAP"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User no longer exists"),
        (status = 409, description = "Device is outside the office geofence", body = Object, example = json!({
            "error": "OUTSIDE_GEOFENCE",
            "message": "You are 812m away from HQ",
            "office": "HQ",
            "distance_m": 812.0
        })),
        (status = 503, description = "Storage unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    body: web::Json<MarkRequest>,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    let punch = Punch {
        action: &body.action,
        office: body.office.as_deref(),
        position: body.position(),
        confirmed: body.confirmed,
    };

    let outcome = service
        .mark_attendance(&auth.phone, punch)
        .await
        .inspect_err(|e| tracing::info!(error = %e, phone = %auth.phone, "Punch rejected"))?;

    Ok(HttpResponse::Ok().json(outcome))
}
