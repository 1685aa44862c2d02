use crate::auth::auth::AuthUser;
use crate::domain::quota;
use crate::domain::working_days::WorkingDayPolicy;
use crate::error::ApiError;
use crate::model::approval::ApprovalWorkflowEntry;
use crate::model::leave_application::{LeaveApplication, LeaveStatus};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, prelude::FromRow};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Leave type to draw the quota from
    pub leave_type_id: Uuid,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family matters")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct DecideLeave {
    #[schema(example = "Approved, enjoy your break")]
    pub comments: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by applicant user id
    pub user_id: Option<Uuid>,
    #[schema(example = "pending")]
    /// Filter by application status
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>, // 1-based
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>, // items per page
}

// Helper enum for typed SQLx binding
enum FilterValue {
    Uuid(Uuid),
    Str(String),
}

#[derive(Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveSummary {
    /// leave application id
    pub id: Uuid,
    /// applicant user id
    pub user_id: Uuid,
    #[schema(example = "LA2026-1767600000000")]
    pub application_number: String,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub total_days: i32,
    #[schema(example = "pending", value_type = String)]
    pub status: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub applied_date: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveSummary>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/// Resolve the applicant's working-day policy: the active work-group
/// assignment's configured days when one exists, Mon-Fri otherwise. The
/// same policy type drives the absence sweep.
async fn policy_for_user(pool: &PgPool, user_id: Uuid) -> Result<WorkingDayPolicy, ApiError> {
    let row = sqlx::query_as::<_, (Option<Vec<i32>>,)>(
        r#"
        SELECT wg.working_days
        FROM user_work_group_assignments a
        JOIN work_groups wg ON wg.id = a.work_group_id
        WHERE a.user_id = $1
        AND a.is_active = TRUE
        AND wg.is_active = TRUE
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some((days,)) => WorkingDayPolicy::from_work_group(days.as_deref()),
        None => WorkingDayPolicy::Weekdays,
    })
}

fn new_application_number() -> String {
    let now = Utc::now();
    format!("LA{}-{}", now.year(), now.timestamp_millis())
}

/* =========================
Create leave application
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = CreateLeave,
        description = "Leave application payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave application submitted", body = Object,
         example = json!({
            "success": true,
            "data": {
                "applicationId": "e58ed763-928c-4155-bee9-fdbaaadc15f3",
                "applicationNumber": "LA2026-1767600000000",
                "status": "pending",
                "totalDays": 3
            }
         })
        ),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, ApiError> {
    let institution_id = auth.institution()?;

    if payload.start_date > payload.end_date {
        return Err(ApiError::validation("start_date cannot be after end_date"));
    }

    if payload.reason.trim().is_empty() {
        return Err(ApiError::validation("reason must not be empty"));
    }

    // leave type must be active and belong to the caller's institution
    let leave_type_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM leave_types
        WHERE id = $1
        AND institution_id = $2
        AND is_active = TRUE
        "#,
    )
    .bind(payload.leave_type_id)
    .bind(institution_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::validation("Leave type not found or inactive"))?;

    // refuse ranges overlapping an open or approved application
    let overlap = sqlx::query_as::<_, (NaiveDate, NaiveDate, String)>(
        r#"
        SELECT start_date, end_date, status
        FROM leave_applications
        WHERE user_id = $1
        AND status IN ('pending', 'approved')
        AND start_date <= $3
        AND end_date >= $2
        LIMIT 1
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .fetch_optional(pool.get_ref())
    .await?;

    if let Some((from, to, status)) = overlap {
        return Err(ApiError::validation(format!(
            "Leave request conflicts with existing {} leave from {} to {}",
            status, from, to
        )));
    }

    let policy = policy_for_user(pool.get_ref(), auth.user_id).await?;
    let total_days = policy.count_working_days(payload.start_date, payload.end_date);

    let application_id = Uuid::new_v4();
    let application_number = new_application_number();

    sqlx::query(
        r#"
        INSERT INTO leave_applications
            (id, user_id, leave_type_id, application_number, start_date, end_date,
             total_days, reason, status, approval_level, applied_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', 1, CURRENT_DATE)
        "#,
    )
    .bind(application_id)
    .bind(auth.user_id)
    .bind(leave_type_id)
    .bind(&application_number)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(total_days)
    .bind(payload.reason.trim())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = %auth.user_id, "Failed to create leave application");
        ApiError::Upstream
    })?;

    // level-1 workflow row; failure is logged, not fatal
    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO leave_approval_workflow
            (id, leave_application_id, approval_level, status)
        VALUES ($1, $2, 1, 'pending')
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(application_id)
    .execute(pool.get_ref())
    .await
    {
        warn!(error = %e, application_id = %application_id, "Failed to create approval workflow entry");
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "applicationId": application_id,
            "applicationNumber": application_number,
            "status": "pending",
            "totalDays": total_days
        }
    })))
}

#[derive(Clone, Copy, PartialEq)]
enum DecisionAction {
    Approve,
    Reject,
}

impl DecisionAction {
    fn as_status(self) -> LeaveStatus {
        match self {
            DecisionAction::Approve => LeaveStatus::Approved,
            DecisionAction::Reject => LeaveStatus::Rejected,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            DecisionAction::Approve => "approve",
            DecisionAction::Reject => "reject",
        }
    }
}

#[derive(FromRow)]
struct PendingApplication {
    user_id: Uuid,
    leave_type_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    approval_level: i32,
    institution_id: Option<Uuid>,
}

/// Shared decision path. The status update, quota debit and workflow
/// resolution commit as one transaction: a failure anywhere rolls the
/// whole decision back.
async fn decide(
    pool: &PgPool,
    application_id: Uuid,
    action: DecisionAction,
    approver: &AuthUser,
    comments: Option<&str>,
) -> Result<Option<i32>, ApiError> {
    approver.require_institution_admin()?;

    let application = sqlx::query_as::<_, PendingApplication>(
        r#"
        SELECT la.user_id, la.leave_type_id, la.start_date, la.end_date,
               la.status, la.approval_level, u.institution_id
        FROM leave_applications la
        JOIN users u ON u.id = la.user_id
        WHERE la.id = $1
        "#,
    )
    .bind(application_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Leave application not found"))?;

    // tenant isolation: institution admins only decide within their own walls
    if approver.role != crate::model::role::Role::Admin
        && application.institution_id != Some(approver.institution()?)
    {
        return Err(ApiError::not_found("Leave application not found"));
    }

    let status: LeaveStatus = application
        .status
        .parse()
        .map_err(|_| ApiError::Upstream)?;
    if status.is_terminal() {
        return Err(ApiError::state(format!(
            "Cannot {} application with status: {}",
            action.verb(),
            status
        )));
    }

    let policy = policy_for_user(pool, application.user_id).await?;
    let working_days = policy.count_working_days(application.start_date, application.end_date);

    let mut tx = pool.begin().await?;

    // the status guard in the WHERE clause makes a lost race visible:
    // zero rows means another decision landed first
    let updated = match action {
        DecisionAction::Approve => {
            sqlx::query(
                r#"
                UPDATE leave_applications
                SET status = 'approved',
                    approved_date = NOW(),
                    approval_comments = $2,
                    updated_at = NOW()
                WHERE id = $1
                AND status = 'pending'
                "#,
            )
            .bind(application_id)
            .bind(comments)
            .execute(&mut *tx)
            .await?
        }
        DecisionAction::Reject => {
            sqlx::query(
                r#"
                UPDATE leave_applications
                SET status = 'rejected',
                    rejected_date = NOW(),
                    rejection_reason = $2,
                    updated_at = NOW()
                WHERE id = $1
                AND status = 'pending'
                "#,
            )
            .bind(application_id)
            .bind(comments)
            .execute(&mut *tx)
            .await?
        }
    };

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(ApiError::state(format!(
            "Cannot {} application: already processed",
            action.verb()
        )));
    }

    if action == DecisionAction::Approve {
        let year = application.start_date.year();
        let quota = quota::ensure_quota(
            &mut *tx,
            application.user_id,
            application.leave_type_id,
            year,
        )
        .await?;
        quota::debit(&mut *tx, &quota, working_days).await?;
    }

    sqlx::query(
        r#"
        UPDATE leave_approval_workflow
        SET status = $2,
            decision_date = NOW(),
            comments = $3,
            approver_id = $4
        WHERE leave_application_id = $1
        AND approval_level = $5
        "#,
    )
    .bind(application_id)
    .bind(action.as_status().to_string())
    .bind(comments)
    .bind(approver.user_id)
    .bind(application.approval_level)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(match action {
        DecisionAction::Approve => Some(working_days),
        DecisionAction::Reject => None,
    })
}

/* =========================
Approve leave (admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/approve",
    params(
        ("leave_id" = Uuid, Path, description = "ID of the leave application to approve")
    ),
    request_body = DecideLeave,
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "success": true,
            "data": { "status": "approved", "workingDays": 3 }
        })),
        (status = 400, description = "Application already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    payload: web::Json<DecideLeave>,
) -> Result<HttpResponse, ApiError> {
    let working_days = decide(
        pool.get_ref(),
        path.into_inner(),
        DecisionAction::Approve,
        &auth,
        payload.comments.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": { "status": "approved", "workingDays": working_days }
    })))
}

/* =========================
Reject leave (admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/reject",
    params(
        ("leave_id" = Uuid, Path, description = "ID of the leave application to reject")
    ),
    request_body = DecideLeave,
    responses(
        (status = 200, description = "Leave rejected", body = Object, example = json!({
            "success": true,
            "data": { "status": "rejected", "workingDays": null }
        })),
        (status = 400, description = "Application already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    payload: web::Json<DecideLeave>,
) -> Result<HttpResponse, ApiError> {
    let working_days = decide(
        pool.get_ref(),
        path.into_inner(),
        DecisionAction::Reject,
        &auth,
        payload.comments.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": { "status": "rejected", "workingDays": working_days }
    })))
}

/* =========================
Cancel own application
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = Uuid, Path, description = "ID of the leave application to cancel")
    ),
    responses(
        (status = 200, description = "Leave application cancelled"),
        (status = 400, description = "Application already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let leave_id = path.into_inner();

    let status = sqlx::query_scalar::<_, String>(
        "SELECT status FROM leave_applications WHERE id = $1 AND user_id = $2",
    )
    .bind(leave_id)
    .bind(auth.user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::not_found("Leave application not found or access denied"))?;

    if status != LeaveStatus::Pending.to_string() {
        return Err(ApiError::state(format!(
            "Cannot cancel {} leave application",
            status
        )));
    }

    let result = sqlx::query(
        r#"
        UPDATE leave_applications
        SET status = 'cancelled', updated_at = NOW()
        WHERE id = $1
        AND user_id = $2
        AND status = 'pending'
        "#,
    )
    .bind(leave_id)
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::state("Leave application already processed"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Leave application cancelled successfully"
    })))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = Uuid, Path, description = "ID of the leave application to fetch")
    ),
    responses(
        (status = 200, description = "Leave application found", body = LeaveApplication),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    let leave_id = path.into_inner();

    let leave = sqlx::query_as::<_, LeaveApplication>(
        r#"
        SELECT la.id, la.user_id, la.leave_type_id, la.application_number,
               la.start_date, la.end_date, la.total_days, la.reason, la.status,
               la.approval_level, la.applied_date, la.approved_date, la.rejected_date,
               la.approval_comments, la.rejection_reason
        FROM leave_applications la
        JOIN users u ON u.id = la.user_id
        WHERE la.id = $1
        AND u.institution_id = $2
        "#,
    )
    .bind(leave_id)
    .bind(institution_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, %leave_id, "Failed to fetch leave application");
        ApiError::Upstream
    })?
    .ok_or_else(|| ApiError::not_found("Leave application not found"))?;

    let workflow = sqlx::query_as::<_, ApprovalWorkflowEntry>(
        r#"
        SELECT id, leave_application_id, approval_level, status,
               approver_id, decision_date, comments
        FROM leave_approval_workflow
        WHERE leave_application_id = $1
        ORDER BY approval_level
        "#,
    )
    .bind(leave_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": { "application": leave, "workflow": workflow }
    })))
}

/// for listing leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, ApiError> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause ($1 is always the institution)
    // -------------------------
    let mut where_sql = String::from(" WHERE u.institution_id = $1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = query.user_id {
        args.push(FilterValue::Uuid(user_id));
        where_sql.push_str(&format!(" AND la.user_id = ${}", args.len() + 1));
    }

    if let Some(status) = query.status.as_deref() {
        args.push(FilterValue::Str(status.to_lowercase()));
        where_sql.push_str(&format!(" AND la.status = ${}", args.len() + 1));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!(
        "SELECT COUNT(*) FROM leave_applications la JOIN users u ON u.id = la.user_id{}",
        where_sql
    );

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql).bind(institution_id);
    for arg in &args {
        count_q = match arg {
            FilterValue::Uuid(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(s.clone()),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count leave applications");
        ApiError::Upstream
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT la.id, la.user_id, la.application_number, la.start_date, la.end_date,
               la.total_days, la.status, la.applied_date
        FROM leave_applications la
        JOIN users u ON u.id = la.user_id
        {}
        ORDER BY la.created_at DESC
        LIMIT ${} OFFSET ${}
        "#,
        where_sql,
        args.len() + 2,
        args.len() + 3
    );

    let mut data_q = sqlx::query_as::<_, LeaveSummary>(&data_sql).bind(institution_id);
    for arg in args {
        data_q = match arg {
            FilterValue::Uuid(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let leaves = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch leave list");
            ApiError::Upstream
        })?;

    // -------------------------
    // Response
    // -------------------------
    let response = LeaveListResponse {
        data: leaves,
        page: page as u32,
        per_page: per_page as u32,
        total,
    };

    Ok(HttpResponse::Ok().json(response))
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    #[schema(example = 20)]
    pub limit: Option<i64>,
}

#[derive(Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    #[schema(example = "LA2026-1767600000000")]
    pub application_number: String,
    #[schema(example = "Annual Leave")]
    pub leave_type: String,
    #[schema(example = "AL")]
    pub leave_type_code: String,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub total_days: i32,
    pub reason: String,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub applied_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub rejected_date: Option<DateTime<Utc>>,
    pub approval_comments: Option<String>,
    pub rejection_reason: Option<String>,
}

/// caller's own applications, newest first
#[utoipa::path(
    get,
    path = "/api/v1/leave/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Leave history", body = Object, example = json!({
            "success": true,
            "data": []
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_history(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let history = sqlx::query_as::<_, HistoryEntry>(
        r#"
        SELECT la.id, la.application_number,
               lt.name AS leave_type, lt.code AS leave_type_code,
               la.start_date, la.end_date, la.total_days, la.reason, la.status,
               la.applied_date, la.approved_date, la.rejected_date,
               la.approval_comments, la.rejection_reason
        FROM leave_applications la
        JOIN leave_types lt ON lt.id = la.leave_type_id
        WHERE la.user_id = $1
        ORDER BY la.created_at DESC
        LIMIT $2
        "#,
    )
    .bind(auth.user_id)
    .bind(limit)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = %auth.user_id, "Failed to fetch leave history");
        ApiError::Upstream
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": history
    })))
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct BalanceQuery {
    /// Another user's id (admin only); defaults to the caller
    pub user_id: Option<Uuid>,
    #[schema(example = "EMP-001")]
    /// Look the user up by employee number instead (admin only)
    pub employee_id: Option<String>,
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

#[derive(FromRow)]
struct TargetUser {
    id: Uuid,
    institution_id: Option<Uuid>,
    full_name: String,
    employee_id: Option<String>,
}

/// Resolve whose balance is being asked for. Staff may only ask about
/// themselves; admins can reach anyone inside their institution.
async fn resolve_target_user(
    pool: &PgPool,
    auth: &AuthUser,
    user_id: Option<Uuid>,
    employee_id: Option<&str>,
) -> Result<TargetUser, ApiError> {
    let institution_id = auth.institution()?;

    let (sql, lookup): (&str, FilterValue) = match (user_id, employee_id) {
        (Some(id), _) => (
            r#"
            SELECT id, institution_id, full_name, employee_id
            FROM users
            WHERE id = $1 AND institution_id = $2 AND status = 'active'
            "#,
            FilterValue::Uuid(id),
        ),
        (None, Some(emp)) => (
            r#"
            SELECT id, institution_id, full_name, employee_id
            FROM users
            WHERE employee_id = $1 AND institution_id = $2 AND status = 'active'
            "#,
            FilterValue::Str(emp.to_string()),
        ),
        (None, None) => (
            r#"
            SELECT id, institution_id, full_name, employee_id
            FROM users
            WHERE id = $1 AND institution_id = $2 AND status = 'active'
            "#,
            FilterValue::Uuid(auth.user_id),
        ),
    };

    let mut q = sqlx::query_as::<_, TargetUser>(sql);
    q = match lookup {
        FilterValue::Uuid(v) => q.bind(v),
        FilterValue::Str(s) => q.bind(s),
    };

    let target = q
        .bind(institution_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if target.id != auth.user_id {
        auth.require_institution_admin()?;
    }

    Ok(target)
}

/// aggregate balance across all leave types
#[utoipa::path(
    get,
    path = "/api/v1/leave/balance",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Aggregate leave balance", body = Object, example = json!({
            "success": true,
            "data": {
                "total_leave": 20,
                "used_leave": 5,
                "remaining_leave": 15,
                "year": 2026
            }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_balance(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse, ApiError> {
    let target =
        resolve_target_user(pool.get_ref(), &auth, query.user_id, query.employee_id.as_deref())
            .await?;
    let institution_id = target
        .institution_id
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let mut conn = pool.get_ref().acquire().await?;
    let quotas =
        quota::ensure_quotas_for_user(&mut conn, target.id, institution_id, year).await?;

    let total: i32 = quotas.iter().map(|(_, _, q)| q.allocated_days).sum();
    let used: i32 = quotas.iter().map(|(_, _, q)| q.used_days).sum();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "total_leave": total,
            "used_leave": used,
            "remaining_leave": total - used,
            "year": year
        }
    })))
}

/// per-type quota rows for a year
#[utoipa::path(
    get,
    path = "/api/v1/leave/quota",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Per-type quotas", body = Object, example = json!({
            "success": true,
            "data": {
                "userId": "7be9aa5c-72b1-4f3a-9c70-1b5a2e7ad1f4",
                "userName": "Nur Aisyah",
                "employeeId": "EMP-001",
                "quotaYear": 2026,
                "quotas": [{
                    "leaveTypeId": "f4f9a9a0-61b2-4f0e-8d4e-2f0c9a3a7e21",
                    "leaveTypeName": "Annual Leave",
                    "leaveTypeCode": "AL",
                    "allocatedDays": 14,
                    "usedDays": 2,
                    "remainingDays": 12,
                    "quotaYear": 2026
                }]
            }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_quota(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse, ApiError> {
    let target =
        resolve_target_user(pool.get_ref(), &auth, query.user_id, query.employee_id.as_deref())
            .await?;
    let institution_id = target
        .institution_id
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let mut conn = pool.get_ref().acquire().await?;
    let quotas =
        quota::ensure_quotas_for_user(&mut conn, target.id, institution_id, year).await?;

    let formatted: Vec<_> = quotas
        .iter()
        .map(|(name, code, q)| {
            serde_json::json!({
                "leaveTypeId": q.leave_type_id,
                "leaveTypeName": name,
                "leaveTypeCode": code,
                "allocatedDays": q.allocated_days,
                "usedDays": q.used_days,
                "remainingDays": q.remaining_days,
                "quotaYear": q.quota_year
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "userId": target.id,
            "userName": target.full_name,
            "employeeId": target.employee_id,
            "quotaYear": year,
            "quotas": formatted
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_numbers_carry_the_year_prefix() {
        let number = new_application_number();
        assert!(number.starts_with(&format!("LA{}-", Utc::now().year())));
        let suffix = number.split('-').nth(1).unwrap();
        assert!(suffix.parse::<i64>().is_ok());
    }
}
