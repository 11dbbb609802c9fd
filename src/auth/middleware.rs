use crate::auth::auth::authenticate;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

/// Rejects requests without a valid bearer token; otherwise stashes the
/// [`AuthUser`](crate::auth::auth::AuthUser) for the handlers behind it.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    match authenticate(req.headers(), &config.jwt_secret) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(err) => {
            tracing::debug!(path = %req.path(), error = %err, "Unauthenticated request");
            Ok(req.error_response(err))
        }
    }
}
