use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{identity::AuthUser, password::hash_password},
    db::{is_duplicate_key, is_foreign_key_violation},
    model::{
        employee::{EMPLOYEE_COLUMNS, EMPLOYEE_FROM, Employee},
        role::Role,
    },
    utils::{
        db_utils::{PageWindow, SqlUpdate},
        email_cache, email_filter,
    },
};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "john@company.com", format = "email")]
    pub email: String,
    #[schema(example = "initial-password")]
    pub password: String,
    #[schema(example = "employee")]
    pub role: Option<Role>,
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "1990-04-12", format = "date", value_type = Option<String>)]
    pub dob: Option<NaiveDate>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub doj: Option<NaiveDate>,
    #[schema(example = "male")]
    pub gender: Option<String>,
    #[schema(example = 1)]
    pub department_id: Option<u64>,
    #[schema(example = "+8801712345678")]
    pub phone_number: Option<String>,
    #[schema(example = 50000.0)]
    pub salary: Option<f64>,
    pub bank_branch: Option<String>,
    pub bank_ifsc: Option<String>,
    pub account_number: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    /// Page number (starts at 1)
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
    /// Filter by department
    pub department_id: Option<u64>,
    /// Search name, email or employee code
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub success: bool,
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub employee_code: Option<String>,
    #[schema(example = "1990-04-12", format = "date", value_type = Option<String>)]
    pub dob: Option<NaiveDate>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub doj: Option<NaiveDate>,
    pub gender: Option<String>,
    pub department_id: Option<u64>,
    pub phone_number: Option<String>,
    pub salary: Option<f64>,
    pub bank_branch: Option<String>,
    pub bank_ifsc: Option<String>,
    pub account_number: Option<String>,
}

// Typed binding for the dynamic list filters
#[derive(Debug, Clone)]
enum FilterValue {
    U64(u64),
    Str(String),
}

fn db_error(e: sqlx::Error, context: &'static str) -> actix_web::Error {
    error!(error = %e, "{}", context);
    ErrorInternalServerError("Internal Server Error")
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "success": false,
        "error": "Employee not found"
    }))
}

fn unknown_department() -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "success": false,
        "error": "Department not found"
    }))
}

/// Moves the availability caches from the old address to the new one
async fn swap_email(old: &str, new: &str) {
    email_filter::remove(old);
    email_filter::insert(new);
    email_cache::forget(old).await;
    email_cache::mark_taken(new).await;
}

fn conflict(message: &str) -> HttpResponse {
    HttpResponse::Conflict().json(json!({
        "success": false,
        "error": message
    }))
}

/// Trims and drops blank strings so "" never overwrites a stored value
fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email_filter::normalize(email);

    // Cuckoo filter: a miss means definitely not registered
    if !email_filter::might_exist(&email) {
        return true;
    }

    // Moka cache: a hit means definitely registered
    if email_cache::is_taken(&email).await {
        return false;
    }

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .map(|found| found != 0)
    .unwrap_or(true); // fail-safe

    if exists {
        email_cache::mark_taken(&email).await;
    }

    !exists
}

async fn fetch_employee(pool: &MySqlPool, employee_id: u64) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} {EMPLOYEE_FROM} WHERE e.id = ?"
    ))
    .bind(employee_id)
    .fetch_optional(pool)
    .await
}

/// Add employee: creates the login account and the employee record together
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 200, description = "Employee created", body = Employee),
        (status = 400, description = "Missing required fields or unknown department"),
        (status = 409, description = "Email or employee code already registered"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let name = payload.name.trim();
    let email = email_filter::normalize(&payload.email);
    let employee_code = payload.employee_code.trim();

    if name.is_empty() || email.is_empty() || payload.password.is_empty() || employee_code.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "Name, email, password and employee code are required"
        })));
    }

    if !is_email_available(&email, pool.get_ref()).await {
        return Ok(conflict("User already registered with this email"));
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ErrorInternalServerError("Internal Server Error")
    })?;
    let role = payload.role.unwrap_or(Role::Employee);

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| db_error(e, "Failed to open transaction"))?;

    let user = sqlx::query("INSERT INTO users (name, email, password, role_id) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(&email)
        .bind(hashed)
        .bind(role.id())
        .execute(&mut *tx)
        .await;

    let user_id = match user {
        Ok(r) => r.last_insert_id(),
        Err(e) if is_duplicate_key(&e) => return Ok(conflict("User already registered with this email")),
        Err(e) => return Err(db_error(e, "Failed to create user")),
    };

    let employee = sqlx::query(
        r#"
        INSERT INTO employees
        (user_id, employee_code, dob, doj, gender, phone_number, department_id, salary,
         bank_branch, bank_ifsc, account_number)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(employee_code)
    .bind(payload.dob)
    .bind(payload.doj)
    .bind(non_blank(&payload.gender))
    .bind(non_blank(&payload.phone_number))
    .bind(payload.department_id)
    .bind(payload.salary)
    .bind(non_blank(&payload.bank_branch))
    .bind(non_blank(&payload.bank_ifsc))
    .bind(non_blank(&payload.account_number))
    .execute(&mut *tx)
    .await;

    let employee_id = match employee {
        Ok(r) => r.last_insert_id(),
        Err(e) if is_duplicate_key(&e) => return Ok(conflict("Employee code already in use")),
        Err(e) if is_foreign_key_violation(&e) => return Ok(unknown_department()),
        Err(e) => return Err(db_error(e, "Failed to create employee")),
    };

    tx.commit()
        .await
        .map_err(|e| db_error(e, "Failed to commit employee"))?;

    email_filter::insert(&email);
    email_cache::mark_taken(&email).await;
    info!(employee_id, user_id, "Employee created");

    let employee = fetch_employee(pool.get_ref(), employee_id)
        .await
        .map_err(|e| db_error(e, "Failed to reload employee"))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Employee created",
        "employee": employee
    })))
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses((status = 200, description = "Paginated employee list", body = EmployeeListResponse)),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let PageWindow { page, per_page, offset } = PageWindow::new(query.page, query.per_page);

    let mut conditions = Vec::new();
    let mut bindings: Vec<FilterValue> = Vec::new();

    if let Some(department_id) = query.department_id {
        conditions.push("e.department_id = ?");
        bindings.push(FilterValue::U64(department_id));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(u.name LIKE ? OR u.email LIKE ? OR e.employee_code LIKE ?)");
        let like = format!("%{}%", search);
        bindings.extend(std::iter::repeat_n(FilterValue::Str(like), 3));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) {EMPLOYEE_FROM} {where_clause}");
    debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = match b {
            FilterValue::U64(v) => count_query.bind(*v),
            FilterValue::Str(s) => count_query.bind(s.as_str()),
        };
    }

    let total = count_query
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| db_error(e, "Failed to count employees"))?;

    let data_sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} {EMPLOYEE_FROM} {where_clause} ORDER BY e.id DESC LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in &bindings {
        data_query = match b {
            FilterValue::U64(v) => data_query.bind(*v),
            FilterValue::Str(s) => data_query.bind(s.as_str()),
        };
    }

    let employees = data_query
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| db_error(e, "Failed to fetch employees"))?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        success: true,
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// View employee by employee id, falling back to the owning user's id
#[utoipa::path(
    get,
    path = "/api/employee/{id}",
    params(("id" = u64, Path, description = "Employee ID or user ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let mut employee = fetch_employee(pool.get_ref(), id)
        .await
        .map_err(|e| db_error(e, "Failed to fetch employee"))?;

    if employee.is_none() {
        employee = sqlx::query_as::<_, Employee>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} {EMPLOYEE_FROM} WHERE e.user_id = ?"
        ))
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| db_error(e, "Failed to fetch employee by user"))?;
    }

    match employee {
        Some(emp) => {
            auth.require_admin_or_self(emp.id)?;
            Ok(HttpResponse::Ok().json(json!({ "success": true, "employee": emp })))
        }
        None => Ok(not_found()),
    }
}

/// Employees of a department
#[utoipa::path(
    get,
    path = "/api/employee/department/{id}",
    params(("id" = u64, Path, description = "Department ID")),
    responses((status = 200, description = "Employees in the department", body = [Employee])),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn employees_by_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employees = sqlx::query_as::<_, Employee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} {EMPLOYEE_FROM} WHERE e.department_id = ? ORDER BY u.name"
    ))
    .bind(path.into_inner())
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| db_error(e, "Failed to fetch employees by department"))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "employees": employees })))
}

/// Update employee and the linked user account
#[utoipa::path(
    put,
    path = "/api/employee/{id}",
    params(("id" = u64, Path, description = "Employee ID")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 400, description = "Department not found"),
        (status = 409, description = "Email or employee code already registered")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    let Some(current) = fetch_employee(pool.get_ref(), employee_id)
        .await
        .map_err(|e| db_error(e, "Failed to fetch employee"))?
    else {
        return Ok(not_found());
    };

    let new_email = non_blank(&body.email)
        .map(|e| email_filter::normalize(&e))
        .filter(|e| *e != current.email);

    let mut user_update = SqlUpdate::new("users");
    user_update
        .set_opt("name", non_blank(&body.name))
        .set_opt("email", new_email.clone())
        .set_opt("role_id", body.role.map(Role::id));

    let mut employee_update = SqlUpdate::new("employees");
    employee_update
        .set_opt("employee_code", non_blank(&body.employee_code))
        .set_opt("dob", body.dob)
        .set_opt("doj", body.doj)
        .set_opt("gender", non_blank(&body.gender))
        .set_opt("department_id", body.department_id)
        .set_opt("phone_number", non_blank(&body.phone_number))
        .set_opt("salary", body.salary)
        .set_opt("bank_branch", non_blank(&body.bank_branch))
        .set_opt("bank_ifsc", non_blank(&body.bank_ifsc))
        .set_opt("account_number", non_blank(&body.account_number));

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| db_error(e, "Failed to open transaction"))?;

    for (update, id) in [(&user_update, current.user_id), (&employee_update, employee_id)] {
        match update.execute(&mut *tx, "id", id).await {
            Ok(_) => {}
            Err(e) if is_duplicate_key(&e) => {
                return Ok(conflict("Email or employee code already registered"));
            }
            Err(e) if is_foreign_key_violation(&e) => return Ok(unknown_department()),
            Err(e) => return Err(db_error(e, "Failed to update employee")),
        }
    }

    tx.commit()
        .await
        .map_err(|e| db_error(e, "Failed to commit employee update"))?;

    if let Some(email) = &new_email {
        swap_email(&current.email, email).await;
    }
    info!(employee_id, "Employee updated");

    let employee = fetch_employee(pool.get_ref(), employee_id)
        .await
        .map_err(|e| db_error(e, "Failed to reload employee"))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Employee updated successfully",
        "employee": employee
    })))
}

/// Delete employee together with the user account
#[utoipa::path(
    delete,
    path = "/api/employee/{id}",
    params(("id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deleted"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    let Some(current) = fetch_employee(pool.get_ref(), employee_id)
        .await
        .map_err(|e| db_error(e, "Failed to fetch employee"))?
    else {
        return Ok(not_found());
    };

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| db_error(e, "Failed to open transaction"))?;

    // leaves and salaries cascade with the employee row
    sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e, "Failed to delete employee"))?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(current.user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e, "Failed to delete user"))?;

    tx.commit()
        .await
        .map_err(|e| db_error(e, "Failed to commit employee delete"))?;

    email_filter::remove(&current.email);
    email_cache::forget(&current.email).await;
    info!(employee_id, user_id = current.user_id, "Employee deleted");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Employee deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_are_dropped() {
        assert_eq!(non_blank(&Some("  Dhaka ".to_string())), Some("Dhaka".to_string()));
        assert_eq!(non_blank(&Some("   ".to_string())), None);
        assert_eq!(non_blank(&None), None);
    }

    #[test]
    fn create_payload_accepts_role_names() {
        let payload: CreateEmployee = serde_json::from_value(json!({
            "name": "Jane",
            "email": "Jane@Company.com",
            "password": "pw",
            "role": "admin",
            "employee_code": "EMP-9",
            "doj": "2026-02-01"
        }))
        .unwrap();

        assert_eq!(payload.role, Some(Role::Admin));
        assert_eq!(payload.doj, NaiveDate::from_ymd_opt(2026, 2, 1));
        assert!(payload.department_id.is_none());
    }

    #[actix_web::test]
    async fn changed_email_frees_the_old_address() {
        let old = "before.swap@company.com";
        let new = "after.swap@company.com";
        email_filter::insert(old);
        email_cache::mark_taken(old).await;

        swap_email(old, new).await;

        assert!(!email_filter::might_exist(old));
        assert!(!email_cache::is_taken(old).await);
        assert!(email_filter::might_exist(new));
        assert!(email_cache::is_taken(new).await);
    }
}
