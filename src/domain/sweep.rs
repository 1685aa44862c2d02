use crate::domain::working_days::WorkingDayPolicy;
use crate::error::ApiError;
use crate::model::attendance::{AttendanceStatus, VerificationMethod};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SweepStats {
    pub processed_users: usize,
    pub marked_absent: usize,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub dry_run: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SweepEntry {
    pub user_id: Uuid,
    pub employee_id: Option<String>,
    pub full_name: String,
    pub email: String,
    pub work_group: String,
    pub institution: String,
    /// `marked_absent` or `would_mark_absent` (dry-run)
    pub action: String,
    pub reason: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SweepOutcome {
    pub stats: SweepStats,
    pub results: Vec<SweepEntry>,
}

#[derive(sqlx::FromRow)]
struct SweepGroup {
    id: Uuid,
    name: String,
    institution_id: Uuid,
    default_end_time: NaiveTime,
    working_days: Option<Vec<i32>>,
    institution_name: String,
    timezone: Option<String>,
}

#[derive(sqlx::FromRow)]
struct AssignedUser {
    id: Uuid,
    employee_id: Option<String>,
    full_name: String,
    email: String,
}

/// Fall back to the configured default, then to Kuala Lumpur, so a typo in
/// an institution row degrades instead of aborting the sweep.
pub fn resolve_timezone(name: Option<&str>, default_tz: &str) -> Tz {
    name.and_then(|n| n.parse::<Tz>().ok())
        .or_else(|| default_tz.parse::<Tz>().ok())
        .unwrap_or(chrono_tz::Asia::Kuala_Lumpur)
}

/// The work group's end-of-day on `date`, expressed in UTC.
pub fn cutoff_at(date: NaiveDate, end_time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let local = date.and_time(end_time);
    tz.from_local_datetime(&local)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&local))
        .with_timezone(&Utc)
}

/// A user is marked only once the work day has ended; dry-run reports the
/// would-be outcome regardless of the clock.
pub fn should_mark(now: DateTime<Utc>, cutoff: DateTime<Utc>, dry_run: bool) -> bool {
    dry_run || now > cutoff
}

/// Daily sweep marking unrecorded attendance as absent (spec: best-effort
/// batch; per-user failures are logged and skipped, never fatal).
pub async fn mark_absences(
    pool: &PgPool,
    date: NaiveDate,
    institution_id: Option<Uuid>,
    dry_run: bool,
    default_tz: &str,
) -> Result<SweepOutcome, ApiError> {
    info!(%date, dry_run, "Starting absence marking");

    let mut group_sql = String::from(
        r#"
        SELECT wg.id, wg.name, wg.institution_id, wg.default_end_time, wg.working_days,
               i.name AS institution_name, i.timezone
        FROM work_groups wg
        JOIN institutions i ON i.id = wg.institution_id
        WHERE wg.is_active = TRUE
        "#,
    );
    if institution_id.is_some() {
        group_sql.push_str(" AND wg.institution_id = $1");
    }

    let mut group_query = sqlx::query_as::<_, SweepGroup>(&group_sql);
    if let Some(inst) = institution_id {
        group_query = group_query.bind(inst);
    }

    let groups = group_query.fetch_all(pool).await.map_err(|e| {
        error!(error = %e, "Failed to fetch work groups");
        ApiError::Upstream
    })?;

    info!(count = groups.len(), "Active work groups loaded");

    let now = Utc::now();
    let mut processed_users = 0usize;
    let mut marked_absent = 0usize;
    let mut results = Vec::new();

    for group in &groups {
        let policy = WorkingDayPolicy::from_work_group(group.working_days.as_deref());
        if !policy.is_working_day(date) {
            info!(work_group = %group.name, "Skipping - not a working day");
            continue;
        }

        let tz = resolve_timezone(group.timezone.as_deref(), default_tz);
        let cutoff = cutoff_at(date, group.default_end_time, tz);

        let assignments = match sqlx::query_as::<_, AssignedUser>(
            r#"
            SELECT u.id, u.employee_id, u.full_name, u.email
            FROM user_work_group_assignments a
            JOIN users u ON u.id = a.user_id
            WHERE a.work_group_id = $1
            AND a.is_active = TRUE
            AND u.status = 'active'
            "#,
        )
        .bind(group.id)
        .fetch_all(pool)
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, work_group = %group.name, "Failed to fetch assignments");
                continue;
            }
        };

        for user in &assignments {
            processed_users += 1;

            // Already-processed users are never overwritten
            let has_record = match sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM attendance_records WHERE user_id = $1 AND date = $2)",
            )
            .bind(user.id)
            .bind(date)
            .fetch_one(pool)
            .await
            {
                Ok(v) => v,
                Err(e) => {
                    error!(error = %e, user = %user.full_name, "Failed to check existing record");
                    continue;
                }
            };

            if has_record {
                continue;
            }

            if !should_mark(now, cutoff, dry_run) {
                continue;
            }

            let reason = format!("No check-in by {}", group.default_end_time.format("%H:%M"));

            if !dry_run {
                let insert = sqlx::query(
                    r#"
                    INSERT INTO attendance_records
                        (id, user_id, institution_id, work_group_id, date, status,
                         check_in_time, check_out_time, notes, verification_method)
                    VALUES ($1, $2, $3, $4, $5, $6, NULL, NULL, $7, $8)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(user.id)
                .bind(group.institution_id)
                .bind(group.id)
                .bind(date)
                .bind(AttendanceStatus::Absent.to_string())
                .bind(format!(
                    "Automatically marked absent - no check-in by end of work day ({})",
                    group.default_end_time.format("%H:%M")
                ))
                .bind(VerificationMethod::SystemAuto.to_string())
                .execute(pool)
                .await;

                if let Err(e) = insert {
                    warn!(error = %e, user = %user.full_name, "Failed to mark absent, skipping");
                    continue;
                }
            }

            marked_absent += 1;
            results.push(SweepEntry {
                user_id: user.id,
                employee_id: user.employee_id.clone(),
                full_name: user.full_name.clone(),
                email: user.email.clone(),
                work_group: group.name.clone(),
                institution: group.institution_name.clone(),
                action: if dry_run {
                    "would_mark_absent".to_string()
                } else {
                    "marked_absent".to_string()
                },
                reason,
            });
        }
    }

    info!(
        processed_users,
        marked_absent, dry_run, "Absence marking completed"
    );

    Ok(SweepOutcome {
        stats: SweepStats {
            processed_users,
            marked_absent,
            date,
            dry_run,
        },
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn unknown_timezone_falls_back_to_default() {
        let tz = resolve_timezone(Some("Not/AZone"), "Asia/Kuala_Lumpur");
        assert_eq!(tz, chrono_tz::Asia::Kuala_Lumpur);

        let tz = resolve_timezone(None, "Asia/Singapore");
        assert_eq!(tz, chrono_tz::Asia::Singapore);
    }

    #[test]
    fn cutoff_converts_local_end_time_to_utc() {
        // 17:00 in Kuala Lumpur (UTC+8) is 09:00 UTC
        let cutoff = cutoff_at(
            date(2026, 1, 5),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            chrono_tz::Asia::Kuala_Lumpur,
        );
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap());
    }

    #[test]
    fn marking_waits_for_the_cutoff() {
        let cutoff = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2026, 1, 5, 8, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 5, 9, 1, 0).unwrap();

        assert!(!should_mark(before, cutoff, false));
        assert!(should_mark(after, cutoff, false));
    }

    #[test]
    fn dry_run_ignores_the_clock() {
        let cutoff = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2026, 1, 5, 7, 0, 0).unwrap();

        assert!(should_mark(before, cutoff, true));
    }
}
