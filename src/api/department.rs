use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::identity::AuthUser;
use crate::model::department::Department;

#[derive(Deserialize, ToSchema)]
pub struct DepartmentPayload {
    #[schema(example = "Engineering")]
    pub dep_name: Option<String>,
    #[schema(example = "Product and platform teams")]
    pub description: Option<String>,
}

const DEPARTMENT_COLUMNS: &str = "id, dep_name, description, created_at, updated_at";

fn db_error(e: sqlx::Error, context: &'static str) -> actix_web::Error {
    error!(error = %e, "{}", context);
    ErrorInternalServerError("Internal Server Error")
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "success": false,
        "error": "Department not found"
    }))
}

/// Returns the trimmed name, or None when blank or absent
fn department_name(payload: &DepartmentPayload) -> Option<&str> {
    payload
        .dep_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
}

async fn fetch_department(pool: &MySqlPool, id: u64) -> Result<Option<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>(&format!(
        "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Add department
#[utoipa::path(
    post,
    path = "/api/department",
    request_body = DepartmentPayload,
    responses(
        (status = 200, description = "Department created", body = Department),
        (status = 400, description = "Department name is required"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn add_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<DepartmentPayload>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let Some(name) = department_name(&payload) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "Department name is required"
        })));
    };

    let result = sqlx::query("INSERT INTO departments (dep_name, description) VALUES (?, ?)")
        .bind(name)
        .bind(payload.description.as_deref())
        .execute(pool.get_ref())
        .await
        .map_err(|e| db_error(e, "Failed to add department"))?;

    let department = fetch_department(pool.get_ref(), result.last_insert_id())
        .await
        .map_err(|e| db_error(e, "Failed to reload department"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "department": department })))
}

/// List departments
#[utoipa::path(
    get,
    path = "/api/department",
    responses((status = 200, description = "All departments", body = [Department])),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn list_departments(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let departments = sqlx::query_as::<_, Department>(&format!(
        "SELECT {DEPARTMENT_COLUMNS} FROM departments ORDER BY dep_name"
    ))
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| db_error(e, "Failed to list departments"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "departments": departments })))
}

/// Get department
#[utoipa::path(
    get,
    path = "/api/department/{id}",
    params(("id" = u64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department found", body = Department),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn get_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let department = fetch_department(pool.get_ref(), path.into_inner())
        .await
        .map_err(|e| db_error(e, "Failed to fetch department"))?;

    match department {
        Some(department) => Ok(HttpResponse::Ok().json(json!({ "success": true, "department": department }))),
        None => Ok(not_found()),
    }
}

/// Update department
#[utoipa::path(
    put,
    path = "/api/department/{id}",
    params(("id" = u64, Path, description = "Department ID")),
    request_body = DepartmentPayload,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 400, description = "Department name must not be blank"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<DepartmentPayload>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    if payload.dep_name.is_some() && department_name(&payload).is_none() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "Department name must not be blank"
        })));
    }

    let result = sqlx::query(
        r#"
        UPDATE departments
        SET dep_name = COALESCE(?, dep_name),
            description = COALESCE(?, description),
            updated_at = NOW()
        WHERE id = ?
        "#,
    )
    .bind(department_name(&payload))
    .bind(payload.description.as_deref())
    .bind(id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| db_error(e, "Failed to update department"))?;

    if result.rows_affected() == 0 {
        return Ok(not_found());
    }

    let department = fetch_department(pool.get_ref(), id)
        .await
        .map_err(|e| db_error(e, "Failed to reload department"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "department": department })))
}

/// Delete department. Employees of the department keep their record with no department.
#[utoipa::path(
    delete,
    path = "/api/department/{id}",
    params(("id" = u64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| db_error(e, "Failed to delete department"))?;

    if result.rows_affected() == 0 {
        return Ok(not_found());
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Department deleted"
    })))
}
