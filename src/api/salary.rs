use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::auth::identity::AuthUser;
use crate::model::salary::{Salary, net_salary};

#[derive(Deserialize, ToSchema)]
pub struct SalaryPayload {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = 50000.0)]
    pub basic_salary: f64,
    #[schema(example = 5000.0)]
    pub allowances: Option<f64>,
    #[schema(example = 2000.0)]
    pub deductions: Option<f64>,
    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub pay_date: NaiveDate,
}

const SALARY_COLUMNS: &str =
    "id, employee_id, basic_salary, allowances, deductions, net_salary, pay_date";

fn db_error(e: sqlx::Error, context: &'static str) -> actix_web::Error {
    error!(error = %e, "{}", context);
    ErrorInternalServerError("Internal Server Error")
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "success": false,
        "error": message
    }))
}

/// Record a salary payment. Net salary is derived, never taken from the client.
#[utoipa::path(
    post,
    path = "/api/salary",
    request_body = SalaryPayload,
    responses(
        (status = 200, description = "Salary recorded", body = Salary),
        (status = 400, description = "Invalid amounts"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn add_salary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SalaryPayload>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let allowances = payload.allowances.unwrap_or(0.0);
    let deductions = payload.deductions.unwrap_or(0.0);

    if [payload.basic_salary, allowances, deductions]
        .iter()
        .any(|v| !v.is_finite() || *v < 0.0)
    {
        return Ok(bad_request("Salary amounts must be non-negative numbers"));
    }

    let exists = sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?)")
        .bind(payload.employee_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| db_error(e, "Failed to check employee"))?;

    if exists == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "success": false,
            "error": "Employee not found"
        })));
    }

    let net = net_salary(payload.basic_salary, allowances, deductions);

    let result = sqlx::query(
        r#"
        INSERT INTO salaries (employee_id, basic_salary, allowances, deductions, net_salary, pay_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.basic_salary)
    .bind(allowances)
    .bind(deductions)
    .bind(net)
    .bind(payload.pay_date)
    .execute(pool.get_ref())
    .await
    .map_err(|e| db_error(e, "Failed to add salary"))?;

    info!(employee_id = payload.employee_id, net_salary = net, "Salary recorded");

    let salary = sqlx::query_as::<_, Salary>(&format!(
        "SELECT {SALARY_COLUMNS} FROM salaries WHERE id = ?"
    ))
    .bind(result.last_insert_id())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| db_error(e, "Failed to reload salary"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "salary": salary })))
}

/// Salary history of an employee, newest first
#[utoipa::path(
    get,
    path = "/api/salary/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Salary history", body = [Salary]),
        (status = 403, description = "Not allowed")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn get_salaries(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_admin_or_self(employee_id)?;

    let salaries = sqlx::query_as::<_, Salary>(&format!(
        "SELECT {SALARY_COLUMNS} FROM salaries WHERE employee_id = ? ORDER BY pay_date DESC, id DESC"
    ))
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| db_error(e, "Failed to fetch salaries"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "salary": salaries })))
}
