use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::user::User;
use crate::utils::db_utils::{build_update_sql, execute_update};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::PgPool;
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

// columns an admin may patch; credentials go through the auth endpoints
const UPDATABLE_COLUMNS: &[&str] = &["employee_id", "full_name", "email", "role_id", "status"];

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub role_id: Option<i16>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

// -------------------- Handlers --------------------

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(
        ("page", Query, description = "Page number"),
        ("per_page", Query, description = "Items per page"),
        ("role_id", Query, description = "Filter by role"),
        ("status", Query, description = "Filter by status"),
        ("search", Query, description = "Search by name, email or employee number")
    ),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // Helper enum for typed SQLx binding
    enum Binding {
        I16(i16),
        Str(String),
    }

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = vec!["institution_id = $1".to_string()];
    let mut bindings: Vec<Binding> = Vec::new();

    if let Some(role_id) = query.role_id {
        bindings.push(Binding::I16(role_id));
        conditions.push(format!("role_id = ${}", bindings.len() + 1));
    }

    if let Some(status) = &query.status {
        bindings.push(Binding::Str(status.clone()));
        conditions.push(format!("status = ${}", bindings.len() + 1));
    }

    if let Some(search) = &query.search {
        let like = format!("%{}%", search);
        bindings.push(Binding::Str(like));
        conditions.push(format!(
            "(full_name ILIKE ${n} OR email ILIKE ${n} OR employee_id ILIKE ${n})",
            n = bindings.len() + 1
        ));
    }

    let where_clause = format!("WHERE {}", conditions.join(" AND "));

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM users {}", where_clause);
    debug!(sql = %count_sql, "Counting users");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(institution_id);
    for b in &bindings {
        count_query = match b {
            Binding::I16(v) => count_query.bind(*v),
            Binding::Str(s) => count_query.bind(s.clone()),
        };
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count users");
        ApiError::Upstream
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        r#"
        SELECT id, institution_id, employee_id, full_name, email, username, role_id, status
        FROM users {}
        ORDER BY full_name
        LIMIT ${} OFFSET ${}
        "#,
        where_clause,
        bindings.len() + 2,
        bindings.len() + 3
    );
    debug!(sql = %data_sql, page, per_page, "Fetching users");

    let mut data_query = sqlx::query_as::<_, User>(&data_sql).bind(institution_id);
    for b in &bindings {
        data_query = match b {
            Binding::I16(v) => data_query.bind(*v),
            Binding::Str(s) => data_query.bind(s.clone()),
        };
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let users = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch users");
        ApiError::Upstream
    })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users,
        page,
        per_page,
        total,
    }))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    let user_id = path.into_inner();

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, institution_id, employee_id, full_name, email, username, role_id, status
        FROM users
        WHERE id = $1
        AND institution_id = $2
        "#,
    )
    .bind(user_id)
    .bind(institution_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, %user_id, "Failed to fetch user");
        ApiError::Upstream
    })?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": user
    })))
}

/// Partial update of a user (admin)
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "User updated successfully"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    let user_id = path.into_inner();

    let owned = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND institution_id = $2)",
    )
    .bind(user_id)
    .bind(institution_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    if !owned {
        return Err(ApiError::not_found("User not found").into());
    }

    let update = build_update_sql("users", &body, UPDATABLE_COLUMNS, "id", user_id)?;

    let affected = execute_update(pool.get_ref(), update, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "Failed to update user");
            ApiError::Upstream
        })?;

    if affected == 0 {
        return Err(ApiError::not_found("User not found").into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User updated successfully"
    })))
}

/// Deactivate user (soft delete; rows are never removed)
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deactivated"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn deactivate_user(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    let user_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE users
        SET status = 'inactive', updated_at = NOW()
        WHERE id = $1
        AND institution_id = $2
        AND status = 'active'
        "#,
    )
    .bind(user_id)
    .bind(institution_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, %user_id, "Failed to deactivate user");
        ApiError::Upstream
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found or already inactive"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User deactivated"
    })))
}
