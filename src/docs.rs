use crate::api::department::DepartmentPayload;
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery, UpdateEmployee};
use crate::api::leave::{LeaveListResponse, LeaveQuery, ReviewPayload};
use crate::api::salary::SalaryPayload;
use crate::leave::accrual::{MonthBreakdown, PerType, TypeBalance};
use crate::leave::service::{AppliedBalance, AppliedLeave, ApplyLeave, LeaveBalance, LeaveBreakdown};
use crate::model::department::Department;
use crate::model::employee::Employee;
use crate::model::leave::{HalfDayPeriod, Leave, LeaveStatus, LeaveType};
use crate::model::role::Role;
use crate::model::salary::Salary;
use crate::model::user::UserSummary;
use crate::models::{LoginReqDto, LoginResponse};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Employee Management API",
        version = "1.0.0",
        description = r#"
## Employee Management System

Backend for managing departments, employees, salaries and leave.

### Key Features
- **Employees**: create, update, list and view employee profiles with their login account
- **Departments**: maintain the department list
- **Salary**: record payments, view salary history
- **Leave**: apply for leave against a monthly accrual, approve or reject requests,
  view the current balance and a month-by-month breakdown

### Leave accrual
Each leave type accrues 1 day per month worked in the current year, counted from the
joining month. Pending and approved requests consume the balance; rejected ones do not.

### Security
Every endpoint under the API prefix expects a **JWT Bearer** access token.
Administrative operations require the `admin` role.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::verify,

        crate::api::department::add_department,
        crate::api::department::list_departments,
        crate::api::department::get_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::employees_by_department,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::salary::add_salary,
        crate::api::salary::get_salaries,

        crate::api::leave::apply_leave,
        crate::api::leave::leave_list,
        crate::api::leave::get_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::leave_balance,
        crate::api::leave::leave_breakdown
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            UserSummary,
            Role,
            Department,
            DepartmentPayload,
            Employee,
            CreateEmployee,
            UpdateEmployee,
            EmployeeQuery,
            EmployeeListResponse,
            Salary,
            SalaryPayload,
            Leave,
            LeaveType,
            LeaveStatus,
            HalfDayPeriod,
            ApplyLeave,
            AppliedLeave,
            AppliedBalance,
            LeaveQuery,
            LeaveListResponse,
            ReviewPayload,
            LeaveBalance,
            TypeBalance,
            LeaveBreakdown,
            MonthBreakdown,
            PerType
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token management"),
        (name = "Department", description = "Department management APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Salary", description = "Salary records"),
        (name = "Leave", description = "Leave applications, review and balances"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_leave_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/leave/balance/{employee_id}"));
        assert!(doc.paths.paths.contains_key("/api/leave/{id}/approve"));
        assert!(doc.paths.paths.contains_key("/auth/login"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("LeaveBreakdown"));
    }
}
