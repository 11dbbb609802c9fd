use crate::{
    auth::{auth::AuthUser, jwt::generate_access_token},
    config::Config,
    model::user::UserProfile,
    service::{AttendanceService, ProfileUpdate},
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SignupReq {
    #[schema(example = "9800000001")]
    pub phone: String,
    #[schema(example = "Asha")]
    pub name: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReq {
    #[schema(example = "9800000001")]
    pub phone: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub profile: UserProfile,
}

/// Create an account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupReq,
    responses(
        (status = 201, description = "Account created", body = UserProfile),
        (status = 400, description = "Missing phone, name or password"),
        (status = 409, description = "Phone already registered or reserved", body = Object, example = json!({
            "error": "DUPLICATE_REGISTRATION",
            "message": "User already exists"
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_signup", skip(user, service), fields(phone = %user.phone))]
pub async fn signup(
    user: web::Json<SignupReq>,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    info!("Signup request received");
    let profile = service
        .register(&user.phone, &user.name, &user.password)
        .await?;
    Ok(HttpResponse::Created().json(profile))
}

/// Exchange phone and password for an access token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid phone or password")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(user, service, config), fields(phone = %user.phone))]
pub async fn login(
    user: web::Json<LoginReq>,
    service: web::Data<AttendanceService>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    let db_user = service.login(&user.phone, &user.password).await?;
    debug!("Password verified");

    let access_token = generate_access_token(
        &db_user.phone,
        &db_user.name,
        &config.jwt_secret,
        config.access_token_ttl,
    )?;
    let profile = service.profile(&db_user.phone).await?;

    info!("Login successful");
    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        profile,
    }))
}

/// Current user's profile
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Profile of the caller", body = UserProfile),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User no longer exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn profile(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(service.profile(&auth.phone).await?))
}

/// Update name, departments, password or phone
///
/// A phone change invalidates the old token, so a fresh one is returned.
#[utoipa::path(
    put,
    path = "/api/me",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = LoginResponse),
        (status = 400, description = "Passwords differ or unknown department"),
        (status = 404, description = "User no longer exists"),
        (status = 409, description = "Phone already registered to another user")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn update_profile(
    auth: AuthUser,
    body: web::Json<ProfileUpdate>,
    service: web::Data<AttendanceService>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let profile = service
        .update_profile(&auth.phone, body.into_inner())
        .await?;
    let access_token = generate_access_token(
        &profile.phone,
        &profile.name,
        &config.jwt_secret,
        config.access_token_ttl,
    )?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        profile,
    }))
}
