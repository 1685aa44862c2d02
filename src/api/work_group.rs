use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::work_group::WorkGroup;
use actix_web::{HttpResponse, web};
use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct CreateWorkGroup {
    #[schema(example = "Teaching Staff")]
    pub name: String,
    #[schema(example = "08:00:00", value_type = String, format = "time")]
    pub default_start_time: NaiveTime,
    #[schema(example = "17:00:00", value_type = String, format = "time")]
    pub default_end_time: NaiveTime,
    /// Weekday numbers, 1 = Monday .. 7 = Sunday; omit for Mon-Fri
    #[schema(example = json!([1, 2, 3, 4, 5]))]
    pub working_days: Option<Vec<i32>>,
    #[serde(default = "default_late_threshold")]
    #[schema(example = 15)]
    pub late_threshold_minutes: i32,
    #[serde(default = "default_early_threshold")]
    #[schema(example = 30)]
    pub early_leave_threshold_minutes: i32,
}

fn default_late_threshold() -> i32 {
    15
}

fn default_early_threshold() -> i32 {
    30
}

#[derive(Deserialize, ToSchema)]
pub struct AssignUser {
    pub user_id: Uuid,
}

/// List work groups of the caller's institution
#[utoipa::path(
    get,
    path = "/api/v1/work-groups",
    responses(
        (status = 200, description = "Work groups", body = Vec<WorkGroup>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "WorkGroup"
)]
pub async fn list_work_groups(
    auth: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    let groups = sqlx::query_as::<_, WorkGroup>(
        r#"
        SELECT id, institution_id, name, default_start_time, default_end_time,
               working_days, late_threshold_minutes, early_leave_threshold_minutes,
               is_active
        FROM work_groups
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
        "data": groups
    })))
}

/// Create work group (institution admin)
#[utoipa::path(
    post,
    path = "/api/v1/work-groups",
    request_body = CreateWorkGroup,
    responses(
        (status = 200, description = "Work group created", body = Object, example = json!({
            "success": true,
            "data": { "id": "0b1c2d3e-4f50-6172-8394-a5b6c7d8e9f0" }
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "WorkGroup"
)]
pub async fn create_work_group(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<CreateWorkGroup>,
) -> Result<HttpResponse, ApiError> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("name must not be empty"));
    }

    if let Some(days) = &payload.working_days {
        if days.iter().any(|d| !(1..=7).contains(d)) {
            return Err(ApiError::validation(
                "working_days entries must be between 1 (Monday) and 7 (Sunday)",
            ));
        }
    }

    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO work_groups
            (id, institution_id, name, default_start_time, default_end_time,
             working_days, late_threshold_minutes, early_leave_threshold_minutes, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
        "#,
    )
    .bind(id)
    .bind(institution_id)
    .bind(payload.name.trim())
    .bind(payload.default_start_time)
    .bind(payload.default_end_time)
    .bind(payload.working_days.as_deref())
    .bind(payload.late_threshold_minutes)
    .bind(payload.early_leave_threshold_minutes)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create work group");
        ApiError::Upstream
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "id": id }
    })))
}

/// Assign a user to a work group; any previous active assignment is retired
/// so the working-day policy always has a single source.
#[utoipa::path(
    post,
    path = "/api/v1/work-groups/{id}/assign",
    params(
        ("id" = Uuid, Path, description = "Work group ID")
    ),
    request_body = AssignUser,
    responses(
        (status = 200, description = "User assigned"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Work group or user not found")
    ),
    security(("bearer_auth" = [])),
    tag = "WorkGroup"
)]
pub async fn assign_user(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    payload: web::Json<AssignUser>,
) -> Result<HttpResponse, ApiError> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    let work_group_id = path.into_inner();

    let group_exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM work_groups
            WHERE id = $1 AND institution_id = $2 AND is_active = TRUE
        )
        "#,
    )
    .bind(work_group_id)
    .bind(institution_id)
    .fetch_one(pool.get_ref())
    .await?;

    if !group_exists {
        return Err(ApiError::not_found("Work group not found"));
    }

    let user_exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM users
            WHERE id = $1 AND institution_id = $2 AND status = 'active'
        )
        "#,
    )
    .bind(payload.user_id)
    .bind(institution_id)
    .fetch_one(pool.get_ref())
    .await?;

    if !user_exists {
        return Err(ApiError::not_found("User not found"));
    }

    let mut tx = pool.get_ref().begin().await?;

    sqlx::query(
        r#"
        UPDATE user_work_group_assignments
        SET is_active = FALSE
        WHERE user_id = $1
        AND is_active = TRUE
        "#,
    )
    .bind(payload.user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO user_work_group_assignments (id, user_id, work_group_id, is_active)
        VALUES ($1, $2, $3, TRUE)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.user_id)
    .bind(work_group_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User assigned to work group"
    })))
}
