use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::leave::accrual::{self, MonthBreakdown, PerType, TypeBalance};
use crate::leave::error::LeaveError;
use crate::leave::store::{EmployeeTenure, LeaveStore};
use crate::model::leave::{HalfDayPeriod, Leave, LeaveStatus, LeaveType, NewLeave};

/// Leave application as submitted. Every field is optional here so that a
/// missing one is reported as a validation failure rather than a parse error.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ApplyLeave {
    /// Required for admins applying on someone's behalf; employees apply for themselves
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = "casual")]
    pub leave_type: Option<LeaveType>,
    #[schema(example = "2026-03-02", value_type = Option<String>, format = "date")]
    pub from_date: Option<NaiveDate>,
    #[schema(example = "2026-03-04", value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    #[schema(example = "Family event")]
    pub reason: Option<String>,
    #[serde(default)]
    pub is_half_day: bool,
    #[schema(example = "morning")]
    pub half_day_period: Option<HalfDayPeriod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AppliedBalance {
    pub total_available: f64,
    pub total_used: f64,
    pub remaining: f64,
    pub monthly_allocation: f64,
    #[schema(value_type = String, format = "date")]
    pub doj: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppliedLeave {
    pub leave: Leave,
    pub leave_balance: AppliedBalance,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaveBalance {
    pub casual: TypeBalance,
    pub sick: TypeBalance,
    #[schema(value_type = String, format = "date")]
    pub doj: NaiveDate,
    #[schema(example = 2026)]
    pub current_year: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveBreakdown {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(value_type = String, format = "date")]
    pub doj: NaiveDate,
    pub monthly_allocation: PerType,
    pub breakdown: Vec<MonthBreakdown>,
}

struct ValidRequest {
    leave_type: LeaveType,
    from_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    half_day_period: Option<HalfDayPeriod>,
}

fn validate(request: &ApplyLeave) -> Result<ValidRequest, LeaveError> {
    let reason = request.reason.as_deref().map(str::trim).unwrap_or_default();

    let (Some(leave_type), Some(from_date), Some(end_date)) =
        (request.leave_type, request.from_date, request.end_date)
    else {
        return Err(LeaveError::MissingFields);
    };
    if reason.is_empty() {
        return Err(LeaveError::MissingFields);
    }

    let half_day_period = if request.is_half_day {
        Some(request.half_day_period.ok_or(LeaveError::HalfDayPeriodRequired)?)
    } else {
        None
    };

    Ok(ValidRequest {
        leave_type,
        from_date,
        end_date,
        reason: reason.to_string(),
        half_day_period,
    })
}

async fn tenure_with_doj<S: LeaveStore>(store: &S, employee_id: u64) -> Result<NaiveDate, LeaveError> {
    match store.find_tenure(employee_id).await? {
        Some(EmployeeTenure { doj: Some(doj), .. }) => Ok(doj),
        Some(EmployeeTenure { doj: None, .. }) => Err(LeaveError::MissingJoiningDate),
        None => Err(LeaveError::EmployeeNotFound),
    }
}

async fn leaves_in_year<S: LeaveStore>(
    store: &S,
    employee_id: u64,
    year: i32,
) -> Result<Vec<Leave>, LeaveError> {
    let (start, end) = accrual::year_bounds(year).ok_or(LeaveError::InvalidYear(year))?;
    Ok(store.find_leaves_in_range(employee_id, start, end).await?)
}

/// Validates a leave application against the employee's balance and stores it.
///
/// The balance read and the insert are not serialized: two concurrent
/// applications for the same employee can both pass the check.
pub async fn check_and_apply_leave<S: LeaveStore>(
    store: &S,
    employee_id: u64,
    request: &ApplyLeave,
    now: DateTime<Utc>,
) -> Result<AppliedLeave, LeaveError> {
    let valid = validate(request)?;
    let total_days = accrual::requested_days(valid.from_date, valid.end_date, valid.half_day_period)?;

    let doj = tenure_with_doj(store, employee_id).await?;
    let today = now.date_naive();

    let existing = leaves_in_year(store, employee_id, today.year()).await?;
    let balance = accrual::type_balance(doj, valid.leave_type, &existing, today);
    debug!(
        employee_id,
        leave_type = %valid.leave_type,
        available = balance.available,
        used = balance.used,
        requested = total_days,
        "Checking leave balance"
    );

    if total_days > balance.remaining {
        info!(employee_id, leave_type = %valid.leave_type, "Leave rejected: insufficient balance");
        return Err(LeaveError::InsufficientBalance {
            leave_type: valid.leave_type,
            remaining: balance.remaining,
            available: balance.available,
            requested: total_days,
        });
    }

    let leave = store
        .insert_leave(&NewLeave {
            employee_id,
            leave_type: valid.leave_type,
            from_date: valid.from_date,
            end_date: valid.end_date,
            half_day_period: valid.half_day_period,
            reason: valid.reason,
            total_days,
            applied_date: now,
        })
        .await?;

    info!(employee_id, leave_id = leave.id, total_days, "Leave application stored");

    Ok(AppliedLeave {
        leave,
        leave_balance: AppliedBalance {
            total_available: balance.available,
            total_used: balance.used + total_days,
            remaining: balance.remaining - total_days,
            monthly_allocation: balance.monthly_allocation,
            doj,
        },
    })
}

pub async fn get_leave_balance<S: LeaveStore>(
    store: &S,
    employee_id: u64,
    today: NaiveDate,
) -> Result<LeaveBalance, LeaveError> {
    let doj = tenure_with_doj(store, employee_id).await?;
    let leaves = leaves_in_year(store, employee_id, today.year()).await?;

    Ok(LeaveBalance {
        casual: accrual::type_balance(doj, LeaveType::Casual, &leaves, today),
        sick: accrual::type_balance(doj, LeaveType::Sick, &leaves, today),
        doj,
        current_year: today.year(),
    })
}

pub async fn get_leave_breakdown<S: LeaveStore>(
    store: &S,
    employee_id: u64,
    year: i32,
) -> Result<LeaveBreakdown, LeaveError> {
    let doj = tenure_with_doj(store, employee_id).await?;
    let leaves = leaves_in_year(store, employee_id, year).await?;
    let breakdown =
        accrual::month_breakdown(doj, year, &leaves).ok_or(LeaveError::InvalidYear(year))?;

    Ok(LeaveBreakdown {
        year,
        doj,
        monthly_allocation: PerType {
            casual: accrual::monthly_allocation(LeaveType::Casual),
            sick: accrual::monthly_allocation(LeaveType::Sick),
        },
        breakdown,
    })
}

/// Applies an admin decision to a pending leave.
pub async fn review_leave<S: LeaveStore>(
    store: &S,
    leave_id: u64,
    decision: LeaveStatus,
    reviewer_id: u64,
    comments: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Leave, LeaveError> {
    let leave = store.find_leave(leave_id).await?.ok_or(LeaveError::LeaveNotFound)?;

    if !leave.status.can_transition_to(decision) {
        return Err(LeaveError::AlreadyReviewed(leave.status));
    }

    let comments = comments.map(str::trim).filter(|c| !c.is_empty());
    if !store
        .review_leave(leave_id, decision, reviewer_id, comments, now)
        .await?
    {
        // Reviewed by someone else between the read and the update.
        let current = store.find_leave(leave_id).await?.ok_or(LeaveError::LeaveNotFound)?;
        return Err(LeaveError::AlreadyReviewed(current.status));
    }

    info!(leave_id, status = %decision, reviewer_id, "Leave reviewed");

    Ok(Leave {
        status: decision,
        reviewed_at: Some(now),
        reviewed_by: Some(reviewer_id),
        comments: comments.map(str::to_string),
        ..leave
    })
}
