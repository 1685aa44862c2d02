use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Application state machine: `pending` is the only non-terminal state.
/// `pending -> approved`, `pending -> rejected` and `pending -> cancelled`
/// are the only legal transitions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn is_terminal(self) -> bool {
        self != LeaveStatus::Pending
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub leave_type_id: Uuid,
    #[schema(example = "LA2026-1767600000000")]
    pub application_number: String,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub total_days: i32,
    pub reason: String,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = 1)]
    pub approval_level: i32,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub applied_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub rejected_date: Option<DateTime<Utc>>,
    pub approval_comments: Option<String>,
    pub rejection_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_db_text() {
        for s in [
            LeaveStatus::Pending,
            LeaveStatus::Approved,
            LeaveStatus::Rejected,
            LeaveStatus::Cancelled,
        ] {
            assert_eq!(s.to_string().parse::<LeaveStatus>().unwrap(), s);
        }
    }

    #[test]
    fn pending_is_the_only_open_state() {
        assert!(!LeaveStatus::Pending.is_terminal());
        assert!(LeaveStatus::Approved.is_terminal());
        assert!(LeaveStatus::Rejected.is_terminal());
        assert!(LeaveStatus::Cancelled.is_terminal());
    }
}
