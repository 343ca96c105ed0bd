use actix_web::{HttpResponse, web};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::identity::AuthUser,
    leave::{
        error::LeaveError,
        service::{self, AppliedLeave, ApplyLeave, LeaveBalance, LeaveBreakdown},
        store::{LeaveStore, into_leaves},
    },
    model::leave::{LEAVE_COLUMNS, Leave, LeaveRow, LeaveStatus, LeaveType},
    utils::db_utils::PageWindow,
};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LeaveQuery {
    /// Filter by employee (admins only; employees always see their own)
    pub employee_id: Option<u64>,
    /// Filter by status
    pub status: Option<LeaveStatus>,
    /// Filter by leave type
    pub leave_type: Option<LeaveType>,
    /// Page number (starts at 1)
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub success: bool,
    pub data: Vec<Leave>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewPayload {
    #[schema(example = "Enjoy your time off")]
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct YearQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

enum FilterValue {
    U64(u64),
    Str(String),
}

/// Resolves whose leave is being applied for. Admins may name any employee;
/// everyone else applies for their own profile.
fn applicant(auth: &AuthUser, requested: Option<u64>) -> Result<u64, LeaveError> {
    match (auth.is_admin(), requested, auth.employee_id) {
        (true, Some(id), _) => Ok(id),
        (_, None, Some(own)) => Ok(own),
        (false, Some(id), Some(own)) if id == own => Ok(own),
        (false, Some(_), Some(_)) => Err(LeaveError::Forbidden),
        (_, _, None) => Err(LeaveError::NoEmployeeProfile),
    }
}

fn require_access(auth: &AuthUser, employee_id: u64) -> Result<(), LeaveError> {
    if auth.can_access_employee(employee_id) {
        Ok(())
    } else {
        Err(LeaveError::Forbidden)
    }
}

/// Apply for leave
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body = ApplyLeave,
    responses(
        (status = 201, description = "Leave application stored", body = AppliedLeave),
        (status = 400, description = "Validation failed or insufficient balance"),
        (status = 403, description = "No employee profile or not allowed"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn apply_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<ApplyLeave>,
) -> Result<HttpResponse, LeaveError> {
    apply_for(&auth, pool.get_ref(), &body, Utc::now()).await
}

async fn apply_for<S: LeaveStore>(
    auth: &AuthUser,
    store: &S,
    body: &ApplyLeave,
    now: DateTime<Utc>,
) -> Result<HttpResponse, LeaveError> {
    let employee_id = applicant(auth, body.employee_id)?;

    let applied = service::check_and_apply_leave(store, employee_id, body, now).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Leave application submitted successfully",
        "leave": applied.leave,
        "leave_balance": applied.leave_balance
    })))
}

/// List leave requests
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveQuery),
    responses((status = 200, description = "Paginated leave list", body = LeaveListResponse)),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveQuery>,
) -> Result<HttpResponse, LeaveError> {
    let PageWindow { page, per_page, offset } = PageWindow::new(query.page, query.per_page);

    let employee_filter = if auth.is_admin() {
        query.employee_id
    } else {
        Some(auth.employee_id.ok_or(LeaveError::NoEmployeeProfile)?)
    };

    let mut conditions = Vec::new();
    let mut args = Vec::new();

    if let Some(id) = employee_filter {
        conditions.push("employee_id = ?");
        args.push(FilterValue::U64(id));
    }
    if let Some(status) = query.status {
        conditions.push("status = ?");
        args.push(FilterValue::Str(status.to_string()));
    }
    if let Some(leave_type) = query.leave_type {
        conditions.push("leave_type = ?");
        args.push(FilterValue::Str(leave_type.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM leaves {where_clause}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(s.as_str()),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {LEAVE_COLUMNS} FROM leaves {where_clause} ORDER BY applied_date DESC, id DESC LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page, per_page, "Fetching leaves");

    let mut data_q = sqlx::query_as::<_, LeaveRow>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(s.as_str()),
        };
    }
    let rows = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        success: true,
        data: into_leaves(rows)?,
        page,
        per_page,
        total,
    }))
}

/// Leave detail
#[utoipa::path(
    get,
    path = "/api/leave/{id}",
    params(("id" = u64, Path, description = "Leave ID")),
    responses(
        (status = 200, description = "Leave found", body = Leave),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Leave not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, LeaveError> {
    let leave = pool
        .get_ref()
        .find_leave(path.into_inner())
        .await?
        .ok_or(LeaveError::LeaveNotFound)?;

    require_access(&auth, leave.employee_id)?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "leave": leave })))
}

async fn review(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    leave_id: u64,
    decision: LeaveStatus,
    body: Option<web::Json<ReviewPayload>>,
) -> Result<HttpResponse, LeaveError> {
    if !auth.is_admin() {
        return Err(LeaveError::Forbidden);
    }

    let comments = body.and_then(|b| b.into_inner().comments);
    let leave = service::review_leave(
        pool.get_ref(),
        leave_id,
        decision,
        auth.user_id,
        comments.as_deref(),
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Leave {}", decision),
        "leave": leave
    })))
}

/// Approve a pending leave
#[utoipa::path(
    put,
    path = "/api/leave/{id}/approve",
    params(("id" = u64, Path, description = "Leave ID")),
    request_body(content = ReviewPayload, description = "Optional reviewer comments"),
    responses(
        (status = 200, description = "Leave approved", body = Leave),
        (status = 400, description = "Leave already reviewed"),
        (status = 404, description = "Leave not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewPayload>>,
) -> Result<HttpResponse, LeaveError> {
    review(auth, pool, path.into_inner(), LeaveStatus::Approved, body).await
}

/// Reject a pending leave
#[utoipa::path(
    put,
    path = "/api/leave/{id}/reject",
    params(("id" = u64, Path, description = "Leave ID")),
    request_body(content = ReviewPayload, description = "Optional reviewer comments"),
    responses(
        (status = 200, description = "Leave rejected", body = Leave),
        (status = 400, description = "Leave already reviewed"),
        (status = 404, description = "Leave not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewPayload>>,
) -> Result<HttpResponse, LeaveError> {
    review(auth, pool, path.into_inner(), LeaveStatus::Rejected, body).await
}

/// Current-year balance per leave type
#[utoipa::path(
    get,
    path = "/api/leave/balance/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Leave balance", body = LeaveBalance),
        (status = 400, description = "Joining date missing"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, LeaveError> {
    balance_for(&auth, pool.get_ref(), path.into_inner(), Utc::now().date_naive()).await
}

async fn balance_for<S: LeaveStore>(
    auth: &AuthUser,
    store: &S,
    employee_id: u64,
    today: NaiveDate,
) -> Result<HttpResponse, LeaveError> {
    require_access(auth, employee_id)?;

    let balance = service::get_leave_balance(store, employee_id, today).await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "leave_balance": balance })))
}

/// Month-by-month allocation and usage for a year
#[utoipa::path(
    get,
    path = "/api/leave/breakdown/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        YearQuery
    ),
    responses(
        (status = 200, description = "Monthly breakdown", body = LeaveBreakdown),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_breakdown(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<YearQuery>,
) -> Result<HttpResponse, LeaveError> {
    breakdown_for(&auth, pool.get_ref(), path.into_inner(), query.year, Utc::now().date_naive()).await
}

async fn breakdown_for<S: LeaveStore>(
    auth: &AuthUser,
    store: &S,
    employee_id: u64,
    year: Option<i32>,
    today: NaiveDate,
) -> Result<HttpResponse, LeaveError> {
    require_access(auth, employee_id)?;

    let year = year.unwrap_or_else(|| today.year());
    let breakdown = service::get_leave_breakdown(store, employee_id, year).await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": breakdown })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            email: "someone@company.com".to_string(),
            role,
            employee_id,
        }
    }

    #[test]
    fn employees_apply_for_themselves() {
        let employee = user(Role::Employee, Some(1000));

        assert_eq!(applicant(&employee, None).unwrap(), 1000);
        assert_eq!(applicant(&employee, Some(1000)).unwrap(), 1000);
        assert!(matches!(applicant(&employee, Some(1001)), Err(LeaveError::Forbidden)));
    }

    #[test]
    fn admins_may_apply_on_behalf_of_an_employee() {
        let admin = user(Role::Admin, None);

        assert_eq!(applicant(&admin, Some(1001)).unwrap(), 1001);
        assert!(matches!(applicant(&admin, None), Err(LeaveError::NoEmployeeProfile)));
    }

    #[test]
    fn users_without_a_profile_cannot_apply() {
        let orphan = user(Role::Employee, None);
        assert!(matches!(applicant(&orphan, None), Err(LeaveError::NoEmployeeProfile)));
        assert!(matches!(applicant(&orphan, Some(5)), Err(LeaveError::NoEmployeeProfile)));
    }

    #[test]
    fn only_owner_or_admin_can_read_leave_data() {
        assert!(require_access(&user(Role::Admin, None), 7).is_ok());
        assert!(require_access(&user(Role::Employee, Some(7)), 7).is_ok());
        assert!(matches!(
            require_access(&user(Role::Employee, Some(8)), 7),
            Err(LeaveError::Forbidden)
        ));
    }

    #[test]
    fn list_query_parses_enum_filters() {
        let query = web::Query::<LeaveQuery>::from_query("status=pending&leave_type=sick&page=2")
            .unwrap()
            .into_inner();

        assert_eq!(query.status, Some(LeaveStatus::Pending));
        assert_eq!(query.leave_type, Some(LeaveType::Sick));
        assert_eq!(query.page, Some(2));
        assert!(query.employee_id.is_none());
    }

    mod responses {
        use actix_web::{ResponseError, body::to_bytes, http::StatusCode};
        use chrono::TimeZone;
        use serde_json::Value;

        use super::*;
        use crate::leave::store::memory::MemoryStore;
        use crate::model::leave::HalfDayPeriod;

        const EMP: u64 = 1000;

        fn date(y: i32, m: u32, d: u32) -> NaiveDate {
            NaiveDate::from_ymd_opt(y, m, d).unwrap()
        }

        async fn into_parts(result: Result<HttpResponse, LeaveError>) -> (StatusCode, Value) {
            let resp = match result {
                Ok(resp) => resp,
                Err(err) => err.error_response(),
            };
            let status = resp.status();
            let bytes = to_bytes(resp.into_body()).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap())
        }

        fn casual(from: NaiveDate, end: NaiveDate) -> ApplyLeave {
            ApplyLeave {
                leave_type: Some(LeaveType::Casual),
                from_date: Some(from),
                end_date: Some(end),
                reason: Some("Family event".to_string()),
                ..Default::default()
            }
        }

        #[actix_web::test]
        async fn applying_within_balance_returns_created_with_updated_balance() {
            let store = MemoryStore::with_employee(EMP, Some(date(2026, 1, 10)));
            let now = Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap();

            let (status, body) = into_parts(
                apply_for(&user(Role::Employee, Some(EMP)), &store, &casual(date(2026, 3, 16), date(2026, 3, 17)), now)
                    .await,
            )
            .await;

            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(body["success"], true);
            assert_eq!(body["leave"]["status"], "pending");
            assert_eq!(body["leave"]["leave_type"], "casual");
            assert_eq!(body["leave"]["total_days"], 2.0);
            assert_eq!(body["leave_balance"]["total_available"], 3.0);
            assert_eq!(body["leave_balance"]["total_used"], 2.0);
            assert_eq!(body["leave_balance"]["remaining"], 1.0);
            assert_eq!(body["leave_balance"]["doj"], "2026-01-10");
            assert_eq!(store.leave_count(), 1);
        }

        #[actix_web::test]
        async fn over_balance_application_is_a_json_bad_request() {
            let store = MemoryStore::with_employee(EMP, Some(date(2026, 3, 1)));
            let now = Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap();

            let (status, body) = into_parts(
                apply_for(&user(Role::Employee, Some(EMP)), &store, &casual(date(2026, 3, 16), date(2026, 3, 18)), now)
                    .await,
            )
            .await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert_eq!(
                body["error"],
                "Insufficient casual leave balance. You have 1 days remaining out of 1 available, but requested 3 days."
            );
            assert_eq!(store.leave_count(), 0);
        }

        #[actix_web::test]
        async fn validation_failures_never_store_anything() {
            let store = MemoryStore::with_employee(EMP, Some(date(2020, 1, 1)));
            let now = Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap();
            let employee = user(Role::Employee, Some(EMP));

            let missing_reason = ApplyLeave {
                reason: None,
                ..casual(date(2026, 3, 16), date(2026, 3, 16))
            };
            let (status, body) = into_parts(apply_for(&employee, &store, &missing_reason, now).await).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "All fields are required");

            let half_day_span = ApplyLeave {
                is_half_day: true,
                half_day_period: Some(HalfDayPeriod::Morning),
                ..casual(date(2026, 3, 16), date(2026, 3, 17))
            };
            let (status, body) = into_parts(apply_for(&employee, &store, &half_day_span, now).await).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "For half day leave, from date and end date must be the same");

            let someone_else = ApplyLeave {
                employee_id: Some(EMP + 1),
                ..casual(date(2026, 3, 16), date(2026, 3, 16))
            };
            let (status, body) = into_parts(apply_for(&employee, &store, &someone_else, now).await).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["success"], false);

            assert_eq!(store.leave_count(), 0);
        }

        #[actix_web::test]
        async fn balance_is_wrapped_and_guarded() {
            let store = MemoryStore::with_employee(EMP, Some(date(2026, 2, 1)));
            let today = date(2026, 4, 30);

            let (status, body) =
                into_parts(balance_for(&user(Role::Employee, Some(EMP)), &store, EMP, today).await).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["leave_balance"]["casual"]["available"], 3.0);
            assert_eq!(body["leave_balance"]["sick"]["remaining"], 3.0);
            assert_eq!(body["leave_balance"]["current_year"], 2026);

            let (status, body) =
                into_parts(balance_for(&user(Role::Employee, Some(EMP + 1)), &store, EMP, today).await).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["success"], false);

            let (status, _) = into_parts(balance_for(&user(Role::Admin, None), &store, 42, today).await).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        #[actix_web::test]
        async fn breakdown_year_defaults_to_the_current_one() {
            let store = MemoryStore::with_employee(EMP, Some(date(2025, 9, 1)));
            let admin = user(Role::Admin, None);

            let (status, body) =
                into_parts(breakdown_for(&admin, &store, EMP, None, date(2026, 5, 10)).await).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["data"]["year"], 2026);
            assert_eq!(body["data"]["breakdown"].as_array().unwrap().len(), 12);

            let (_, body) =
                into_parts(breakdown_for(&admin, &store, EMP, Some(2025), date(2026, 5, 10)).await).await;
            assert_eq!(body["data"]["year"], 2025);
            assert_eq!(body["data"]["breakdown"][0]["month"], "September");
            assert_eq!(body["data"]["breakdown"].as_array().unwrap().len(), 4);
        }
    }
}
