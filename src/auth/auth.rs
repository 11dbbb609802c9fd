use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::{ServiceError, ServiceResult};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorInternalServerError,
    http::header::{AUTHORIZATION, HeaderMap}, web::Data,
};
use futures::future::{Ready, ready};

/// The caller of a protected route, as proven by its bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub phone: String,
    pub name: String,
}

fn unauthorized(message: &str) -> ServiceError {
    ServiceError::Unauthorized(message.to_string())
}

/// Resolves the caller from the `Authorization: Bearer` header.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> ServiceResult<AuthUser> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| unauthorized("Invalid Authorization header encoding"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Authorization header must start with Bearer"))?;

    let claims = verify_token(token.trim(), secret).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        unauthorized("Invalid or expired token")
    })?;
    Ok(AuthUser {
        phone: claims.sub,
        name: claims.name,
    })
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on the protected scope
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(ErrorInternalServerError("Config missing")));
        };
        ready(authenticate(req.headers(), &config.jwt_secret).map_err(Into::into))
    }
}
