use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    EarlyLeave,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Manual,
    SmartCard,
    SystemAuto,
}

/// At most one record per (user, date); the unique index backs the
/// idempotence of check-in and of the absence sweep.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institution_id: Uuid,
    pub work_group_id: Option<Uuid>,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "present")]
    pub status: String,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[schema(example = "manual")]
    pub verification_method: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_wire_format() {
        assert_eq!(AttendanceStatus::EarlyLeave.to_string(), "early_leave");
        assert_eq!(VerificationMethod::SystemAuto.to_string(), "system_auto");
        assert_eq!(
            "smart_card".parse::<VerificationMethod>().unwrap(),
            VerificationMethod::SmartCard
        );
    }
}
