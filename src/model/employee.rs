use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Employee joined with its user account and department name.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "user_id": 7,
        "employee_code": "EMP-001",
        "name": "John Doe",
        "email": "john.doe@company.com",
        "role_id": 2,
        "profile_image": null,
        "dob": "1990-04-12",
        "doj": "2024-01-01",
        "gender": "male",
        "phone_number": "+8801712345678",
        "department_id": 10,
        "department_name": "Engineering",
        "salary": 50000.0,
        "bank_branch": "Downtown",
        "bank_ifsc": "BANK0001",
        "account_number": "0011223344"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 7)]
    pub user_id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = 2)]
    pub role_id: u8,

    #[schema(nullable = true)]
    pub profile_image: Option<String>,

    #[schema(example = "1990-04-12", value_type = Option<String>, format = "date")]
    pub dob: Option<NaiveDate>,

    /// Date of joining, the anchor for leave accrual
    #[schema(example = "2024-01-01", value_type = Option<String>, format = "date")]
    pub doj: Option<NaiveDate>,

    #[schema(example = "male", nullable = true)]
    pub gender: Option<String>,

    #[schema(example = "+8801712345678", nullable = true)]
    pub phone_number: Option<String>,

    #[schema(example = 10, nullable = true)]
    pub department_id: Option<u64>,

    #[schema(example = "Engineering", nullable = true)]
    pub department_name: Option<String>,

    #[schema(example = 50000.0, nullable = true)]
    pub salary: Option<f64>,

    #[schema(nullable = true)]
    pub bank_branch: Option<String>,

    #[schema(nullable = true)]
    pub bank_ifsc: Option<String>,

    #[schema(nullable = true)]
    pub account_number: Option<String>,
}

/// Columns selected for every `Employee` read.
pub const EMPLOYEE_COLUMNS: &str = r#"
    e.id, e.user_id, e.employee_code, u.name, u.email, u.role_id, u.profile_image,
    e.dob, e.doj, e.gender, e.phone_number, e.department_id, d.dep_name AS department_name,
    e.salary, e.bank_branch, e.bank_ifsc, e.account_number
"#;

pub const EMPLOYEE_FROM: &str = r#"
    FROM employees e
    JOIN users u ON u.id = e.user_id
    LEFT JOIN departments d ON d.id = e.department_id
"#;
