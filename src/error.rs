use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Every failure the attendance service reports back to its caller.
#[derive(Debug, Display, PartialEq)]
pub enum ServiceError {
    #[display(fmt = "Invalid action: {}", _0)]
    InvalidAction(String),

    #[display(fmt = "User not found: {}", _0)]
    UserNotFound(String),

    #[display(fmt = "No attendance record for {} on {}", phone, date)]
    RecordNotFound { phone: String, date: String },

    #[display(fmt = "{}", _0)]
    DuplicateRegistration(String),

    #[display(fmt = "You are {:.0}m away from {}", distance_m, office)]
    OutsideGeofence { office: String, distance_m: f64 },

    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "Storage unavailable: {}", _0)]
    StorageUnavailable(String),
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidAction(_) => "INVALID_ACTION",
            ServiceError::UserNotFound(_) => "USER_NOT_FOUND",
            ServiceError::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            ServiceError::DuplicateRegistration(_) => "DUPLICATE_REGISTRATION",
            ServiceError::OutsideGeofence { .. } => "OUTSIDE_GEOFENCE",
            ServiceError::BadRequest(_) => "BAD_REQUEST",
            ServiceError::Unauthorized(_) => "UNAUTHORIZED",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidAction(_) | ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::UserNotFound(_) | ServiceError::RecordNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ServiceError::DuplicateRegistration(_) | ServiceError::OutsideGeofence { .. } => {
                StatusCode::CONFLICT
            }
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        if let ServiceError::OutsideGeofence { office, distance_m } = self {
            body["office"] = json!(office);
            body["distance_m"] = json!(distance_m.round());
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "Database error");
        ServiceError::StorageUnavailable(err.to_string())
    }
}

impl From<csv::Error> for ServiceError {
    fn from(err: csv::Error) -> Self {
        tracing::error!(error = %err, "CSV table error");
        ServiceError::StorageUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!(error = %err, "Storage I/O error");
        ServiceError::StorageUnavailable(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(
            ServiceError::InvalidAction("NAP".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::DuplicateRegistration("taken".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::StorageUnavailable("disk".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn invalid_action_message_names_the_action() {
        assert_eq!(
            ServiceError::InvalidAction("NAP".into()).to_string(),
            "Invalid action: NAP"
        );
    }
}
