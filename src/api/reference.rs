use crate::auth::auth::AuthUser;
use crate::model::department::DepartmentGroup;
use crate::model::office::Office;
use crate::service::AttendanceService;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDepartment {
    #[schema(example = "Field Sales")]
    pub name: String,
}

/// List offices
#[utoipa::path(
    get,
    path = "/api/offices",
    responses(
        (status = 200, description = "Known offices", body = [Office]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Offices"
)]
pub async fn list_offices(
    _auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(service.offices().await?))
}

/// Add or replace an office
#[utoipa::path(
    post,
    path = "/api/offices",
    request_body = Office,
    responses(
        (status = 200, description = "Office saved", body = Office),
        (status = 400, description = "Blank name, bad coordinates or radius"),
        (status = 403, description = "Not on the admin whitelist")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Offices"
)]
pub async fn save_office(
    auth: AuthUser,
    body: web::Json<Office>,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    service.require_admin(&auth.phone).await?;
    let office = service.add_office(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(office))
}

/// Delete an office
#[utoipa::path(
    delete,
    path = "/api/offices/{name}",
    params(
        ("name" = String, Path, description = "Office name")
    ),
    responses(
        (status = 200, description = "Office deleted"),
        (status = 403, description = "Not on the admin whitelist"),
        (status = 404, description = "No such office")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Offices"
)]
pub async fn delete_office(
    auth: AuthUser,
    path: web::Path<String>,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    service.require_admin(&auth.phone).await?;
    let name = path.into_inner();
    if !service.delete_office(&name).await? {
        return Ok(HttpResponse::NotFound().json(json!({
            "error": "NOT_FOUND",
            "message": format!("No office named {name}")
        })));
    }
    info!(office = %name, by = %auth.phone, "Office deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Office deleted" })))
}

/// List department groups
#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "Department groups", body = [DepartmentGroup]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Departments"
)]
pub async fn list_departments(
    _auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(service.departments().await?))
}

/// Add a department group
#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = CreateDepartment,
    responses(
        (status = 200, description = "Department group added", body = DepartmentGroup),
        (status = 400, description = "Blank name"),
        (status = 403, description = "Not on the admin whitelist")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Departments"
)]
pub async fn add_department(
    auth: AuthUser,
    body: web::Json<CreateDepartment>,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    service.require_admin(&auth.phone).await?;
    let group = service.add_department(&body.name).await?;
    Ok(HttpResponse::Ok().json(group))
}

/// Delete a department group
#[utoipa::path(
    delete,
    path = "/api/departments/{name}",
    params(
        ("name" = String, Path, description = "Department group name")
    ),
    responses(
        (status = 200, description = "Department group deleted"),
        (status = 403, description = "Not on the admin whitelist"),
        (status = 404, description = "No such department group")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Departments"
)]
pub async fn delete_department(
    auth: AuthUser,
    path: web::Path<String>,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    service.require_admin(&auth.phone).await?;
    let name = path.into_inner();
    if !service.delete_department(&name).await? {
        return Ok(HttpResponse::NotFound().json(json!({
            "error": "NOT_FOUND",
            "message": format!("No department group named {name}")
        })));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Department group deleted" })))
}
