use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::leave_type::LeaveType;
use crate::utils::db_utils::{build_update_sql, execute_update};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::PgPool;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

// columns a partial update may touch
const UPDATABLE_COLUMNS: &[&str] = &[
    "name",
    "code",
    "default_quota_days",
    "allow_carry_forward",
    "requires_approval",
    "is_active",
];

#[derive(Deserialize, ToSchema)]
pub struct CreateLeaveType {
    #[schema(example = "Annual Leave")]
    pub name: String,
    #[schema(example = "AL")]
    pub code: String,
    #[schema(example = 14)]
    pub default_quota_days: i32,
    #[serde(default)]
    pub allow_carry_forward: bool,
    #[serde(default = "default_true")]
    pub requires_approval: bool,
}

fn default_true() -> bool {
    true
}

/// List leave types of the caller's institution
#[utoipa::path(
    get,
    path = "/api/v1/leave-types",
    responses(
        (status = 200, description = "Leave types", body = Vec<LeaveType>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "LeaveType"
)]
pub async fn list_leave_types(
    auth: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let institution_id = auth.institution()?;

    let types = sqlx::query_as::<_, LeaveType>(
        r#"
        SELECT id, institution_id, name, code, default_quota_days,
               allow_carry_forward, requires_approval, is_active
        FROM leave_types
        WHERE institution_id = $1
        AND is_active = TRUE
        ORDER BY name
        "#,
    )
    .bind(institution_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": types
    })))
}

/// Create leave type (institution admin)
#[utoipa::path(
    post,
    path = "/api/v1/leave-types",
    request_body = CreateLeaveType,
    responses(
        (status = 200, description = "Leave type created", body = Object, example = json!({
            "success": true,
            "data": { "id": "f4f9a9a0-61b2-4f0e-8d4e-2f0c9a3a7e21" }
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "LeaveType"
)]
pub async fn create_leave_type(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<CreateLeaveType>,
) -> Result<HttpResponse, ApiError> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    if payload.name.trim().is_empty() || payload.code.trim().is_empty() {
        return Err(ApiError::validation("name and code must not be empty"));
    }

    if payload.default_quota_days < 0 {
        return Err(ApiError::validation("default_quota_days cannot be negative"));
    }

    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO leave_types
            (id, institution_id, name, code, default_quota_days,
             allow_carry_forward, requires_approval, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
        "#,
    )
    .bind(id)
    .bind(institution_id)
    .bind(payload.name.trim())
    .bind(payload.code.trim())
    .bind(payload.default_quota_days)
    .bind(payload.allow_carry_forward)
    .bind(payload.requires_approval)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create leave type");
        ApiError::Upstream
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "id": id }
    })))
}

/// Partial update of a leave type
#[utoipa::path(
    put,
    path = "/api/v1/leave-types/{id}",
    params(
        ("id" = Uuid, Path, description = "Leave type ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Leave type updated"),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave type not found")
    ),
    security(("bearer_auth" = [])),
    tag = "LeaveType"
)]
pub async fn update_leave_type(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    let leave_type_id = path.into_inner();

    // the id must resolve inside the caller's institution before any write
    let owned = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM leave_types WHERE id = $1 AND institution_id = $2)",
    )
    .bind(leave_type_id)
    .bind(institution_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    if !owned {
        return Err(ApiError::not_found("Leave type not found").into());
    }

    let update = build_update_sql(
        "leave_types",
        &body,
        UPDATABLE_COLUMNS,
        "id",
        leave_type_id,
    )?;

    let affected = execute_update(pool.get_ref(), update, leave_type_id)
        .await
        .map_err(|e| {
            error!(error = %e, %leave_type_id, "Failed to update leave type");
            ApiError::Upstream
        })?;

    if affected == 0 {
        return Err(ApiError::not_found("Leave type not found").into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Leave type updated successfully"
    })))
}
