use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One row per approval level of an application. A level's row is resolved
/// when the decision for that level lands; later levels stay pending.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ApprovalWorkflowEntry {
    pub id: Uuid,
    pub leave_application_id: Uuid,
    #[schema(example = 1)]
    pub approval_level: i32,
    #[schema(example = "pending")]
    pub status: String,
    pub approver_id: Option<Uuid>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub decision_date: Option<DateTime<Utc>>,
    pub comments: Option<String>,
}
