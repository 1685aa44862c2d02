use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Institution member. Rows are never hard-deleted; `status` flips to
/// `inactive` instead so attendance history stays attributable.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": "7be9aa5c-72b1-4f3a-9c70-1b5a2e7ad1f4",
        "institution_id": "b0d1f1de-4f2e-4f87-9a54-6a2a6c5a9c1e",
        "employee_id": "EMP-001",
        "full_name": "Nur Aisyah",
        "email": "aisyah@school.edu.my",
        "username": "aisyah",
        "role_id": 3,
        "status": "active"
    })
)]
pub struct User {
    pub id: Uuid,

    pub institution_id: Option<Uuid>,

    #[schema(example = "EMP-001", nullable = true)]
    pub employee_id: Option<String>,

    #[schema(example = "Nur Aisyah")]
    pub full_name: String,

    #[schema(example = "aisyah@school.edu.my")]
    pub email: String,

    #[schema(example = "aisyah")]
    pub username: String,

    #[schema(example = 3)]
    pub role_id: i16,

    #[schema(example = "active")]
    pub status: String,
}
