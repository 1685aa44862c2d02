use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Institution-scoped leave category, set up by the institution admin.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": "f4f9a9a0-61b2-4f0e-8d4e-2f0c9a3a7e21",
        "institution_id": "b0d1f1de-4f2e-4f87-9a54-6a2a6c5a9c1e",
        "name": "Annual Leave",
        "code": "AL",
        "default_quota_days": 14,
        "allow_carry_forward": false,
        "requires_approval": true,
        "is_active": true
    })
)]
pub struct LeaveType {
    pub id: Uuid,

    pub institution_id: Uuid,

    #[schema(example = "Annual Leave")]
    pub name: String,

    #[schema(example = "AL")]
    pub code: String,

    #[schema(example = 14)]
    pub default_quota_days: i32,

    pub allow_carry_forward: bool,

    pub requires_approval: bool,

    pub is_active: bool,
}
