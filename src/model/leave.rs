use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Casual,
    Sick,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HalfDayPeriod {
    Morning,
    Afternoon,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    /// Pending and approved requests consume balance; rejected ones do not.
    pub fn counts_toward_balance(self) -> bool {
        matches!(self, LeaveStatus::Pending | LeaveStatus::Approved)
    }

    /// Only a pending request can be reviewed, and only into a terminal state.
    pub fn can_transition_to(self, next: LeaveStatus) -> bool {
        matches!(
            (self, next),
            (LeaveStatus::Pending, LeaveStatus::Approved) | (LeaveStatus::Pending, LeaveStatus::Rejected)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "leave_type": "casual",
    "from_date": "2026-03-02",
    "end_date": "2026-03-04",
    "is_half_day": false,
    "half_day_period": null,
    "reason": "Family event",
    "status": "pending",
    "total_days": 3.0,
    "applied_date": "2026-02-20T09:30:00Z",
    "reviewed_at": null,
    "reviewed_by": null,
    "comments": null
}))]
pub struct Leave {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: LeaveType,
    #[schema(value_type = String, format = "date")]
    pub from_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub is_half_day: bool,
    pub half_day_period: Option<HalfDayPeriod>,
    pub reason: String,
    pub status: LeaveStatus,
    pub total_days: f64,
    #[schema(value_type = String, format = "date-time")]
    pub applied_date: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<u64>,
    pub comments: Option<String>,
}

impl Leave {
    /// Inclusive overlap with `[start, end]`
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.from_date <= end && self.end_date >= start
    }
}

/// A validated request ready to be stored.
#[derive(Debug, Clone)]
pub struct NewLeave {
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub from_date: NaiveDate,
    pub end_date: NaiveDate,
    pub half_day_period: Option<HalfDayPeriod>,
    pub reason: String,
    pub total_days: f64,
    pub applied_date: DateTime<Utc>,
}

/// Raw `leaves` row; enum columns are stored as lowercase strings.
#[derive(Debug, sqlx::FromRow)]
pub struct LeaveRow {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: String,
    pub from_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_half_day: bool,
    pub half_day_period: Option<String>,
    pub reason: String,
    pub status: String,
    pub total_days: f64,
    pub applied_date: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<u64>,
    pub comments: Option<String>,
}

impl TryFrom<LeaveRow> for Leave {
    type Error = String;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        let leave_type = row
            .leave_type
            .parse::<LeaveType>()
            .map_err(|_| format!("leave {}: unknown leave type {:?}", row.id, row.leave_type))?;
        let status = row
            .status
            .parse::<LeaveStatus>()
            .map_err(|_| format!("leave {}: unknown status {:?}", row.id, row.status))?;
        let half_day_period = row
            .half_day_period
            .as_deref()
            .map(str::parse::<HalfDayPeriod>)
            .transpose()
            .map_err(|_| format!("leave {}: unknown half day period", row.id))?;

        Ok(Leave {
            id: row.id,
            employee_id: row.employee_id,
            leave_type,
            from_date: row.from_date,
            end_date: row.end_date,
            is_half_day: row.is_half_day,
            half_day_period,
            reason: row.reason,
            status,
            total_days: row.total_days,
            applied_date: row.applied_date,
            reviewed_at: row.reviewed_at,
            reviewed_by: row.reviewed_by,
            comments: row.comments,
        })
    }
}

pub const LEAVE_COLUMNS: &str = r#"
    id, employee_id, leave_type, from_date, end_date, is_half_day, half_day_period,
    reason, status, total_days, applied_date, reviewed_at, reviewed_by, comments
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn row(leave_type: &str, status: &str, period: Option<&str>) -> LeaveRow {
        LeaveRow {
            id: 9,
            employee_id: 1,
            leave_type: leave_type.to_string(),
            from_date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            is_half_day: period.is_some(),
            half_day_period: period.map(str::to_string),
            reason: "dentist".to_string(),
            status: status.to_string(),
            total_days: if period.is_some() { 0.5 } else { 1.0 },
            applied_date: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            comments: None,
        }
    }

    #[test]
    fn row_converts_into_typed_leave() {
        let leave = Leave::try_from(row("sick", "approved", Some("morning"))).unwrap();
        assert_eq!(leave.leave_type, LeaveType::Sick);
        assert_eq!(leave.status, LeaveStatus::Approved);
        assert_eq!(leave.half_day_period, Some(HalfDayPeriod::Morning));
    }

    #[test]
    fn row_with_unknown_values_is_rejected() {
        assert!(Leave::try_from(row("annual", "pending", None)).is_err());
        assert!(Leave::try_from(row("casual", "cancelled", None)).is_err());
        assert!(Leave::try_from(row("casual", "pending", Some("evening"))).is_err());
    }

    #[test]
    fn only_pending_can_be_reviewed() {
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::Approved));
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::Rejected));
        assert!(!LeaveStatus::Pending.can_transition_to(LeaveStatus::Pending));
        assert!(!LeaveStatus::Approved.can_transition_to(LeaveStatus::Rejected));
        assert!(!LeaveStatus::Rejected.can_transition_to(LeaveStatus::Approved));
    }

    #[test]
    fn rejected_leaves_do_not_count() {
        assert!(LeaveStatus::Pending.counts_toward_balance());
        assert!(LeaveStatus::Approved.counts_toward_balance());
        assert!(!LeaveStatus::Rejected.counts_toward_balance());
    }

    #[test]
    fn overlap_is_inclusive() {
        let leave = Leave::try_from(row("casual", "pending", None)).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
        assert!(leave.overlaps(day, day));
        assert!(!leave.overlaps(day.succ_opt().unwrap(), NaiveDate::from_ymd_opt(2026, 5, 31).unwrap()));
    }
}
