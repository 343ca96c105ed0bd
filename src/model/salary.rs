use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Salary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = 50000.0)]
    pub basic_salary: f64,
    #[schema(example = 5000.0)]
    pub allowances: f64,
    #[schema(example = 2000.0)]
    pub deductions: f64,
    #[schema(example = 53000.0)]
    pub net_salary: f64,
    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub pay_date: NaiveDate,
}

pub fn net_salary(basic_salary: f64, allowances: f64, deductions: f64) -> f64 {
    basic_salary + allowances - deductions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_salary_adds_allowances_and_subtracts_deductions() {
        assert_eq!(net_salary(50_000.0, 5_000.0, 2_000.0), 53_000.0);
        assert_eq!(net_salary(42_000.0, 0.0, 0.0), 42_000.0);
    }
}
