use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Institution-scoped schedule. `working_days` holds weekday numbers,
/// 1 = Monday .. 7 = Sunday; NULL means the Mon-Fri default applies.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": "0b1c2d3e-4f50-6172-8394-a5b6c7d8e9f0",
        "institution_id": "b0d1f1de-4f2e-4f87-9a54-6a2a6c5a9c1e",
        "name": "Teaching Staff",
        "default_start_time": "08:00:00",
        "default_end_time": "17:00:00",
        "working_days": [1, 2, 3, 4, 5],
        "late_threshold_minutes": 15,
        "early_leave_threshold_minutes": 30,
        "is_active": true
    })
)]
pub struct WorkGroup {
    pub id: Uuid,

    pub institution_id: Uuid,

    #[schema(example = "Teaching Staff")]
    pub name: String,

    #[schema(example = "08:00:00", value_type = String, format = "time")]
    pub default_start_time: NaiveTime,

    #[schema(example = "17:00:00", value_type = String, format = "time")]
    pub default_end_time: NaiveTime,

    #[schema(example = json!([1, 2, 3, 4, 5]))]
    pub working_days: Option<Vec<i32>>,

    #[schema(example = 15)]
    pub late_threshold_minutes: i32,

    #[schema(example = 30)]
    pub early_leave_threshold_minutes: i32,

    pub is_active: bool,
}
