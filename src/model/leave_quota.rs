use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-user, per-leave-type, per-year allocation. Invariant:
/// `remaining_days = allocated_days - used_days` at all times.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": "5f6a2d9e-8f1b-4f7c-9f3e-0a1b2c3d4e5f",
        "user_id": "7be9aa5c-72b1-4f3a-9c70-1b5a2e7ad1f4",
        "leave_type_id": "f4f9a9a0-61b2-4f0e-8d4e-2f0c9a3a7e21",
        "quota_year": 2026,
        "allocated_days": 14,
        "used_days": 2,
        "remaining_days": 12
    })
)]
pub struct UserLeaveQuota {
    pub id: Uuid,
    pub user_id: Uuid,
    pub leave_type_id: Uuid,
    #[schema(example = 2026)]
    pub quota_year: i32,
    #[schema(example = 14)]
    pub allocated_days: i32,
    #[schema(example = 2)]
    pub used_days: i32,
    #[schema(example = 12)]
    pub remaining_days: i32,
}
