use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlPool;

use crate::model::leave::{LEAVE_COLUMNS, Leave, LeaveRow, LeaveStatus, NewLeave};

/// The employee fields leave accounting depends on.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmployeeTenure {
    pub id: u64,
    pub doj: Option<NaiveDate>,
}

#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

/// Queries the leave service needs from the backing store.
#[allow(async_fn_in_trait)]
pub trait LeaveStore {
    async fn find_tenure(&self, employee_id: u64) -> Result<Option<EmployeeTenure>, StoreError>;

    /// Leaves of `employee_id` overlapping `[from, to]`, any status.
    async fn find_leaves_in_range(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Leave>, StoreError>;

    async fn find_leave(&self, leave_id: u64) -> Result<Option<Leave>, StoreError>;

    async fn insert_leave(&self, leave: &NewLeave) -> Result<Leave, StoreError>;

    /// Moves a pending leave into `status`. Returns false when the leave
    /// was no longer pending.
    async fn review_leave(
        &self,
        leave_id: u64,
        status: LeaveStatus,
        reviewed_by: u64,
        comments: Option<&str>,
        reviewed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

pub(crate) fn into_leaves(rows: Vec<LeaveRow>) -> Result<Vec<Leave>, StoreError> {
    rows.into_iter()
        .map(|row| Leave::try_from(row).map_err(StoreError::Corrupt))
        .collect()
}

impl LeaveStore for MySqlPool {
    async fn find_tenure(&self, employee_id: u64) -> Result<Option<EmployeeTenure>, StoreError> {
        let tenure = sqlx::query_as::<_, EmployeeTenure>("SELECT id, doj FROM employees WHERE id = ?")
            .bind(employee_id)
            .fetch_optional(self)
            .await?;
        Ok(tenure)
    }

    async fn find_leaves_in_range(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Leave>, StoreError> {
        let sql = format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM leaves
            WHERE employee_id = ?
              AND from_date <= ?
              AND end_date >= ?
            ORDER BY from_date
            "#
        );

        let rows = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(employee_id)
            .bind(to)
            .bind(from)
            .fetch_all(self)
            .await?;

        into_leaves(rows)
    }

    async fn find_leave(&self, leave_id: u64) -> Result<Option<Leave>, StoreError> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leaves WHERE id = ?");

        let row = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(leave_id)
            .fetch_optional(self)
            .await?;

        row.map(|r| Leave::try_from(r).map_err(StoreError::Corrupt))
            .transpose()
    }

    async fn insert_leave(&self, leave: &NewLeave) -> Result<Leave, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leaves
                (employee_id, leave_type, from_date, end_date, is_half_day, half_day_period,
                 reason, status, total_days, applied_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(leave.employee_id)
        .bind(leave.leave_type.as_ref())
        .bind(leave.from_date)
        .bind(leave.end_date)
        .bind(leave.half_day_period.is_some())
        .bind(leave.half_day_period.map(|p| p.to_string()))
        .bind(&leave.reason)
        .bind(LeaveStatus::Pending.to_string())
        .bind(leave.total_days)
        .bind(leave.applied_date)
        .execute(self)
        .await?;

        Ok(Leave {
            id: result.last_insert_id(),
            employee_id: leave.employee_id,
            leave_type: leave.leave_type,
            from_date: leave.from_date,
            end_date: leave.end_date,
            is_half_day: leave.half_day_period.is_some(),
            half_day_period: leave.half_day_period,
            reason: leave.reason.clone(),
            status: LeaveStatus::Pending,
            total_days: leave.total_days,
            applied_date: leave.applied_date,
            reviewed_at: None,
            reviewed_by: None,
            comments: None,
        })
    }

    async fn review_leave(
        &self,
        leave_id: u64,
        status: LeaveStatus,
        reviewed_by: u64,
        comments: Option<&str>,
        reviewed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE leaves
            SET status = ?, reviewed_by = ?, comments = ?, reviewed_at = ?
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(status.as_ref())
        .bind(reviewed_by)
        .bind(comments)
        .bind(reviewed_at)
        .bind(leave_id)
        .execute(self)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
pub mod memory {
    //! In-memory store used by the service and handler tests.

    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryStore {
        pub employees: Mutex<Vec<EmployeeTenure>>,
        pub leaves: Mutex<Vec<Leave>>,
    }

    impl MemoryStore {
        pub fn with_employee(id: u64, doj: Option<NaiveDate>) -> Self {
            let store = MemoryStore::default();
            store.employees.lock().unwrap().push(EmployeeTenure { id, doj });
            store
        }

        pub fn leave_count(&self) -> usize {
            self.leaves.lock().unwrap().len()
        }
    }

    impl LeaveStore for MemoryStore {
        async fn find_tenure(&self, employee_id: u64) -> Result<Option<EmployeeTenure>, StoreError> {
            Ok(self
                .employees
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.id == employee_id)
                .cloned())
        }

        async fn find_leaves_in_range(
            &self,
            employee_id: u64,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<Leave>, StoreError> {
            Ok(self
                .leaves
                .lock()
                .unwrap()
                .iter()
                .filter(|l| l.employee_id == employee_id && l.overlaps(from, to))
                .cloned()
                .collect())
        }

        async fn find_leave(&self, leave_id: u64) -> Result<Option<Leave>, StoreError> {
            Ok(self.leaves.lock().unwrap().iter().find(|l| l.id == leave_id).cloned())
        }

        async fn insert_leave(&self, leave: &NewLeave) -> Result<Leave, StoreError> {
            let mut leaves = self.leaves.lock().unwrap();
            let stored = Leave {
                id: leaves.len() as u64 + 1,
                employee_id: leave.employee_id,
                leave_type: leave.leave_type,
                from_date: leave.from_date,
                end_date: leave.end_date,
                is_half_day: leave.half_day_period.is_some(),
                half_day_period: leave.half_day_period,
                reason: leave.reason.clone(),
                status: LeaveStatus::Pending,
                total_days: leave.total_days,
                applied_date: leave.applied_date,
                reviewed_at: None,
                reviewed_by: None,
                comments: None,
            };
            leaves.push(stored.clone());
            Ok(stored)
        }

        async fn review_leave(
            &self,
            leave_id: u64,
            status: LeaveStatus,
            reviewed_by: u64,
            comments: Option<&str>,
            reviewed_at: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            let mut leaves = self.leaves.lock().unwrap();
            match leaves
                .iter_mut()
                .find(|l| l.id == leave_id && l.status == LeaveStatus::Pending)
            {
                Some(leave) => {
                    leave.status = status;
                    leave.reviewed_by = Some(reviewed_by);
                    leave.comments = comments.map(str::to_string);
                    leave.reviewed_at = Some(reviewed_at);
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }
}
