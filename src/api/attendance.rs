use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::domain::sweep;
use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, VerificationMethod};
use crate::utils::{card_cache, card_filter};
use actix_web::{HttpResponse, web};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use sqlx::{PgPool, prelude::FromRow};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(FromRow)]
struct Schedule {
    work_group_id: Uuid,
    institution_id: Uuid,
    default_start_time: NaiveTime,
    default_end_time: NaiveTime,
    late_threshold_minutes: i32,
    early_leave_threshold_minutes: i32,
    timezone: Option<String>,
}

async fn schedule_for_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Schedule>, ApiError> {
    let schedule = sqlx::query_as::<_, Schedule>(
        r#"
        SELECT wg.id AS work_group_id, wg.institution_id,
               wg.default_start_time, wg.default_end_time,
               wg.late_threshold_minutes, wg.early_leave_threshold_minutes,
               i.timezone
        FROM user_work_group_assignments a
        JOIN work_groups wg ON wg.id = a.work_group_id
        JOIN institutions i ON i.id = wg.institution_id
        WHERE a.user_id = $1
        AND a.is_active = TRUE
        AND wg.is_active = TRUE
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(schedule)
}

/// Present if the clock-in lands within the grace window, late after it.
fn check_in_status(local: NaiveTime, start: NaiveTime, late_threshold_min: i32) -> AttendanceStatus {
    if local > start + Duration::minutes(late_threshold_min as i64) {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

/// Leaving well before end-of-day downgrades the status; an already-late
/// record stays late.
fn check_out_status(
    current: AttendanceStatus,
    local: NaiveTime,
    end: NaiveTime,
    early_threshold_min: i32,
) -> AttendanceStatus {
    if current == AttendanceStatus::Present
        && local < end - Duration::minutes(early_threshold_min as i64)
    {
        AttendanceStatus::EarlyLeave
    } else {
        current
    }
}

/// Insert a check-in row for `date`; the unique (user, date) index turns a
/// double check-in into a database conflict we translate for the client.
async fn insert_check_in(
    pool: &PgPool,
    user_id: Uuid,
    schedule: &Schedule,
    date: NaiveDate,
    status: AttendanceStatus,
    method: VerificationMethod,
) -> Result<Uuid, ApiError> {
    let id = Uuid::new_v4();

    let result = sqlx::query(
        r#"
        INSERT INTO attendance_records
            (id, user_id, institution_id, work_group_id, date, status,
             check_in_time, verification_method)
        VALUES ($1, $2, $3, $4, $5, $6, NOW(), $7)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(schedule.institution_id)
    .bind(schedule.work_group_id)
    .bind(date)
    .bind(status.to_string())
    .bind(method.to_string())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(id),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                // duplicate check-in for same day
                if db_err.code().as_deref() == Some("23505") {
                    return Err(ApiError::state("Already checked in today"));
                }
            }

            tracing::error!(error = %e, %user_id, "Check-in failed");
            Err(ApiError::Upstream)
        }
    }
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "success": true,
            "data": { "status": "present" }
        })),
        (status = 400, description = "Already checked in today"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No active work group assignment"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let schedule = schedule_for_user(pool.get_ref(), auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("No active work group assignment".into()))?;

    let tz = sweep::resolve_timezone(schedule.timezone.as_deref(), &config.default_timezone);
    let now_local = Utc::now().with_timezone(&tz);

    let status = check_in_status(
        now_local.time(),
        schedule.default_start_time,
        schedule.late_threshold_minutes,
    );

    let attendance_id = insert_check_in(
        pool.get_ref(),
        auth.user_id,
        &schedule,
        now_local.date_naive(),
        status,
        VerificationMethod::Manual,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": { "attendance_id": attendance_id, "status": status }
    })))
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/v1/attendance/check-out",
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "success": true,
            "data": { "status": "present" }
        })),
        (status = 400, description = "No active check-in found for today"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No active work group assignment"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let schedule = schedule_for_user(pool.get_ref(), auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("No active work group assignment".into()))?;

    let tz = sweep::resolve_timezone(schedule.timezone.as_deref(), &config.default_timezone);
    let now_local = Utc::now().with_timezone(&tz);
    let today = now_local.date_naive();

    let open = sqlx::query_as::<_, (Uuid, String)>(
        r#"
        SELECT id, status
        FROM attendance_records
        WHERE user_id = $1
        AND date = $2
        AND check_out_time IS NULL
        "#,
    )
    .bind(auth.user_id)
    .bind(today)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::state("No active check-in found for today"))?;

    let current: AttendanceStatus = open.1.parse().map_err(|_| ApiError::Upstream)?;
    let status = check_out_status(
        current,
        now_local.time(),
        schedule.default_end_time,
        schedule.early_leave_threshold_minutes,
    );

    let result = sqlx::query(
        r#"
        UPDATE attendance_records
        SET check_out_time = NOW(), status = $2, updated_at = NOW()
        WHERE id = $1
        AND check_out_time IS NULL
        "#,
    )
    .bind(open.0)
    .bind(status.to_string())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = %auth.user_id, "Check-out failed");
        ApiError::Upstream
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::state("No active check-in found for today"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": { "attendance_id": open.0, "status": status }
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct CardCheckIn {
    /// UID read off the card; older reader firmware sends `rfid_uid`
    #[serde(alias = "rfid_uid")]
    #[schema(example = "04:A1:B2:C3")]
    pub card_uid: String,
    #[schema(example = "gate-01")]
    pub device_id: Option<String>,
    #[schema(example = "Main entrance")]
    pub location: Option<String>,
}

/// Card (RFID/NFC) check-in for gate readers. The cuckoo filter rejects
/// unenrolled cards without a database round trip; the cache short-circuits
/// repeat scans.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/card-check-in",
    request_body = CardCheckIn,
    responses(
        (status = 200, description = "Scan recorded", body = Object, example = json!({
            "success": true,
            "attendance_id": "e58ed763-928c-4155-bee9-fdbaaadc15f3",
            "status": "present",
            "action": "check_in"
        })),
        (status = 400, description = "Missing card_uid or already checked out"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Device account only"),
        (status = 404, description = "Card not enrolled")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn card_check_in(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    payload: web::Json<CardCheckIn>,
) -> Result<HttpResponse, ApiError> {
    auth.require_device()?;

    let card_uid = payload.card_uid.trim();
    if card_uid.is_empty() {
        return Err(ApiError::validation("Missing required field: card_uid"));
    }

    // fast negative: an unknown card never reaches the database
    if !card_filter::might_exist(card_uid) {
        return Err(ApiError::not_found(
            "Card not enrolled. Please enroll the card first.",
        ));
    }

    let user_id = match card_cache::lookup(card_uid).await {
        Some(id) => id,
        None => {
            let resolved = sqlx::query_scalar::<_, Uuid>(
                r#"
                SELECT user_id
                FROM smart_cards
                WHERE card_uid = $1
                AND status = 'active'
                "#,
            )
            .bind(card_filter::normalize(card_uid))
            .fetch_optional(pool.get_ref())
            .await?
            // filter false positive, or a card deactivated since warmup
            .ok_or_else(|| {
                ApiError::not_found("Card not enrolled. Please enroll the card first.")
            })?;

            card_cache::mark_enrolled(card_uid, resolved).await;
            resolved
        }
    };

    #[derive(FromRow)]
    struct CardHolder {
        id: Uuid,
        institution_id: Option<Uuid>,
        full_name: String,
        employee_id: Option<String>,
    }

    let holder = sqlx::query_as::<_, CardHolder>(
        r#"
        SELECT id, institution_id, full_name, employee_id
        FROM users
        WHERE id = $1
        AND status = 'active'
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::not_found("Card holder not found or inactive"))?;

    // a reader only accepts cards of its own institution
    if let Some(device_institution) = auth.institution_id {
        if holder.institution_id != Some(device_institution) {
            return Err(ApiError::not_found("Card not enrolled for this institution"));
        }
    }

    let schedule = schedule_for_user(pool.get_ref(), holder.id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Card holder has no active work group".into()))?;

    let tz = sweep::resolve_timezone(schedule.timezone.as_deref(), &config.default_timezone);
    let now_local = Utc::now().with_timezone(&tz);
    let today = now_local.date_naive();

    info!(
        card_uid = %card_filter::normalize(card_uid),
        device_id = payload.device_id.as_deref().unwrap_or("unknown"),
        user = %holder.full_name,
        "Card scan"
    );

    // first scan of the day checks in, second checks out
    let existing = sqlx::query_as::<_, (Uuid, String, bool)>(
        r#"
        SELECT id, status, check_out_time IS NOT NULL
        FROM attendance_records
        WHERE user_id = $1
        AND date = $2
        "#,
    )
    .bind(holder.id)
    .bind(today)
    .fetch_optional(pool.get_ref())
    .await?;

    let (attendance_id, status, action) = match existing {
        None => {
            let status = check_in_status(
                now_local.time(),
                schedule.default_start_time,
                schedule.late_threshold_minutes,
            );
            let id = insert_check_in(
                pool.get_ref(),
                holder.id,
                &schedule,
                today,
                status,
                VerificationMethod::SmartCard,
            )
            .await?;
            (id, status, "check_in")
        }
        Some((id, current, false)) => {
            let current: AttendanceStatus = current.parse().map_err(|_| ApiError::Upstream)?;
            let status = check_out_status(
                current,
                now_local.time(),
                schedule.default_end_time,
                schedule.early_leave_threshold_minutes,
            );

            sqlx::query(
                r#"
                UPDATE attendance_records
                SET check_out_time = NOW(), status = $2, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(status.to_string())
            .execute(pool.get_ref())
            .await?;

            (id, status, "check_out")
        }
        Some((_, _, true)) => {
            return Err(ApiError::state("Already checked out today"));
        }
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "attendance_id": attendance_id,
        "user_id": holder.id,
        "user_name": holder.full_name,
        "employee_id": holder.employee_id,
        "status": status,
        "action": action
    })))
}

#[derive(Deserialize, utoipa::IntoParams, ToSchema)]
pub struct RecordsQuery {
    /// Another user's records (admin only); defaults to the caller
    pub user_id: Option<Uuid>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    #[schema(example = "2026-01-31", format = "date", value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    #[schema(example = 31)]
    pub limit: Option<i64>,
}

/// Attendance records for a user, newest first
#[utoipa::path(
    get,
    path = "/api/v1/attendance/records",
    params(RecordsQuery),
    responses(
        (status = 200, description = "Attendance records", body = Vec<AttendanceRecord>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_records(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<RecordsQuery>,
) -> Result<HttpResponse, ApiError> {
    let institution_id = auth.institution()?;

    let user_id = query.user_id.unwrap_or(auth.user_id);
    if user_id != auth.user_id {
        auth.require_institution_admin()?;
    }

    let limit = query.limit.unwrap_or(31).clamp(1, 366);

    let records = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, user_id, institution_id, work_group_id, date, status,
               check_in_time, check_out_time, notes, verification_method
        FROM attendance_records
        WHERE user_id = $1
        AND institution_id = $2
        AND ($3::date IS NULL OR date >= $3)
        AND ($4::date IS NULL OR date <= $4)
        ORDER BY date DESC
        LIMIT $5
        "#,
    )
    .bind(user_id)
    .bind(institution_id)
    .bind(query.from)
    .bind(query.to)
    .bind(limit)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": records
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct MarkAbsentReq {
    #[schema(example = "2026-01-05", format = "date", value_type = Option<String>)]
    /// Target date; defaults to today in the default timezone
    pub date: Option<NaiveDate>,
    /// Restrict the sweep to one institution
    #[serde(alias = "institutionId")]
    pub institution_id: Option<Uuid>,
    /// Simulate: identical read path, no writes
    #[serde(default, alias = "dryRun")]
    pub dry_run: bool,
}

/// Absence sweep endpoint, invoked by an external scheduler after end of
/// work day. Dry-run mode is the supported way to rehearse a sweep.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/mark-absent",
    request_body = MarkAbsentReq,
    responses(
        (status = 200, description = "Sweep completed", body = Object, example = json!({
            "success": true,
            "message": "Absence marking process completed",
            "stats": {
                "processed_users": 42,
                "marked_absent": 3,
                "date": "2026-01-05",
                "dry_run": false
            },
            "results": []
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Operator only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_absent(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    payload: web::Json<MarkAbsentReq>,
) -> Result<HttpResponse, ApiError> {
    auth.require_operator()?;

    // institution admins sweep their own tenant only
    let institution_id = match auth.role {
        crate::model::role::Role::InstitutionAdmin => Some(auth.institution()?),
        _ => payload.institution_id,
    };

    let date = payload.date.unwrap_or_else(|| {
        let tz = sweep::resolve_timezone(None, &config.default_timezone);
        Utc::now().with_timezone(&tz).date_naive()
    });

    let outcome = sweep::mark_absences(
        pool.get_ref(),
        date,
        institution_id,
        payload.dry_run,
        &config.default_timezone,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": format!(
            "Absence marking {} completed",
            if payload.dry_run { "simulation" } else { "process" }
        ),
        "stats": outcome.stats,
        "results": outcome.results
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn on_time_scan_is_present() {
        assert_eq!(
            check_in_status(time(8, 10), time(8, 0), 15),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn scan_past_the_grace_window_is_late() {
        assert_eq!(
            check_in_status(time(8, 16), time(8, 0), 15),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn leaving_early_downgrades_a_present_record() {
        assert_eq!(
            check_out_status(AttendanceStatus::Present, time(15, 0), time(17, 0), 30),
            AttendanceStatus::EarlyLeave
        );
    }

    #[test]
    fn leaving_on_time_keeps_the_status() {
        assert_eq!(
            check_out_status(AttendanceStatus::Present, time(16, 45), time(17, 0), 30),
            AttendanceStatus::Present
        );
        assert_eq!(
            check_out_status(AttendanceStatus::Late, time(15, 0), time(17, 0), 30),
            AttendanceStatus::Late
        );
    }
}
