//! Leave accrual arithmetic.
//!
//! Every function here is pure: "today" is always passed in, so callers
//! decide the clock and tests can pin it.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use strum::IntoEnumIterator;
use utoipa::ToSchema;

use crate::leave::error::LeaveError;
use crate::model::leave::{HalfDayPeriod, Leave, LeaveType};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Days credited per elapsed month.
pub fn monthly_allocation(leave_type: LeaveType) -> f64 {
    match leave_type {
        LeaveType::Casual => 1.0,
        LeaveType::Sick => 1.0,
    }
}

/// Days accrued for `leave_type` in the calendar year of `today`.
///
/// Joining this year accrues from the joining month through the current
/// month inclusive. Joining in an earlier year accrues the whole year.
/// Joining in a later year accrues nothing.
pub fn calculate_available_leaves(doj: NaiveDate, leave_type: LeaveType, today: NaiveDate) -> f64 {
    let months = if doj.year() < today.year() {
        12
    } else if doj.year() == today.year() {
        (today.month() as i32 - doj.month() as i32 + 1).max(0)
    } else {
        0
    };

    f64::from(months) * monthly_allocation(leave_type)
}

/// Days consumed by a request covering `from..=end`.
///
/// A half day must start and end on the same date and counts 0.5.
pub fn requested_days(
    from: NaiveDate,
    end: NaiveDate,
    half_day: Option<HalfDayPeriod>,
) -> Result<f64, LeaveError> {
    if half_day.is_some() {
        if from != end {
            return Err(LeaveError::HalfDayDateMismatch);
        }
        return Ok(0.5);
    }

    let days = (end - from).num_days() + 1;
    if days <= 0 {
        return Err(LeaveError::InvalidDateRange);
    }

    Ok(days as f64)
}

pub fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next.pred_opt()?))
}

/// Days already booked against `leave_type` in `year`.
///
/// Counts pending and approved requests whose start date falls in the year.
pub fn used_leaves(leaves: &[Leave], leave_type: LeaveType, year: i32) -> f64 {
    leaves
        .iter()
        .filter(|l| l.leave_type == leave_type)
        .filter(|l| l.status.counts_toward_balance())
        .filter(|l| l.from_date.year() == year)
        .map(|l| l.total_days)
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TypeBalance {
    #[schema(example = 10.0)]
    pub available: f64,
    #[schema(example = 2.5)]
    pub used: f64,
    #[schema(example = 7.5)]
    pub remaining: f64,
    #[schema(example = 1.0)]
    pub monthly_allocation: f64,
}

pub fn type_balance(doj: NaiveDate, leave_type: LeaveType, leaves: &[Leave], today: NaiveDate) -> TypeBalance {
    let available = calculate_available_leaves(doj, leave_type, today);
    let used = used_leaves(leaves, leave_type, today.year());

    TypeBalance {
        available,
        used,
        remaining: available - used,
        monthly_allocation: monthly_allocation(leave_type),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct PerType {
    pub casual: f64,
    pub sick: f64,
}

impl PerType {
    fn add(&mut self, leave_type: LeaveType, days: f64) {
        match leave_type {
            LeaveType::Casual => self.casual += days,
            LeaveType::Sick => self.sick += days,
        }
    }

    pub fn total(&self) -> f64 {
        self.casual + self.sick
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthBreakdown {
    #[schema(example = "March")]
    pub month: String,
    #[schema(example = 3)]
    pub month_number: u32,
    pub allocated: PerType,
    pub taken: PerType,
}

/// Month-by-month allocation and usage for `year`.
///
/// Starts at the joining month when the employee joined during `year`,
/// otherwise at January. A leave is counted in full in every month it
/// overlaps. Returns `None` when `year` is outside the calendar range.
pub fn month_breakdown(doj: NaiveDate, year: i32, leaves: &[Leave]) -> Option<Vec<MonthBreakdown>> {
    let first_month = if doj.year() == year { doj.month() } else { 1 };

    let mut allocated = PerType::default();
    for leave_type in LeaveType::iter() {
        allocated.add(leave_type, monthly_allocation(leave_type));
    }

    (first_month..=12)
        .map(|month| {
            let (start, end) = month_bounds(year, month)?;
            let mut taken = PerType::default();
            for leave in leaves
                .iter()
                .filter(|l| l.status.counts_toward_balance() && l.overlaps(start, end))
            {
                taken.add(leave.leave_type, leave.total_days);
            }

            Some(MonthBreakdown {
                month: MONTH_NAMES[(month - 1) as usize].to_string(),
                month_number: month,
                allocated: allocated.clone(),
                taken,
            })
        })
        .collect()
}
