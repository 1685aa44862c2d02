use crate::error::ApiError;
use crate::model::leave_quota::UserLeaveQuota;
use sqlx::PgConnection;
use uuid::Uuid;

/// `used += days; remaining = allocated - used`
pub fn apply_debit(allocated: i32, used: i32, days: i32) -> (i32, i32) {
    let new_used = used + days;
    (new_used, allocated - new_used)
}

/// Fetch the (user, leave type, year) quota row, creating it from the leave
/// type's default allocation when absent. Two callers racing on the insert
/// is resolved by `ON CONFLICT DO NOTHING` + re-fetch: the loser adopts the
/// winner's row.
pub async fn ensure_quota(
    conn: &mut PgConnection,
    user_id: Uuid,
    leave_type_id: Uuid,
    year: i32,
) -> Result<UserLeaveQuota, ApiError> {
    if let Some(quota) = fetch_quota(conn, user_id, leave_type_id, year).await? {
        return Ok(quota);
    }

    let default_days = sqlx::query_scalar::<_, i32>(
        "SELECT default_quota_days FROM leave_types WHERE id = $1",
    )
    .bind(leave_type_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| ApiError::not_found("Leave type not found"))?;

    sqlx::query(
        r#"
        INSERT INTO user_leave_quotas
            (id, user_id, leave_type_id, quota_year, allocated_days, used_days, remaining_days)
        VALUES ($1, $2, $3, $4, $5, 0, $5)
        ON CONFLICT (user_id, leave_type_id, quota_year) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(leave_type_id)
    .bind(year)
    .bind(default_days)
    .execute(&mut *conn)
    .await?;

    fetch_quota(conn, user_id, leave_type_id, year)
        .await?
        .ok_or(ApiError::Upstream)
}

async fn fetch_quota(
    conn: &mut PgConnection,
    user_id: Uuid,
    leave_type_id: Uuid,
    year: i32,
) -> Result<Option<UserLeaveQuota>, ApiError> {
    let quota = sqlx::query_as::<_, UserLeaveQuota>(
        r#"
        SELECT id, user_id, leave_type_id, quota_year,
               allocated_days, used_days, remaining_days
        FROM user_leave_quotas
        WHERE user_id = $1
        AND leave_type_id = $2
        AND quota_year = $3
        "#,
    )
    .bind(user_id)
    .bind(leave_type_id)
    .bind(year)
    .fetch_optional(conn)
    .await?;

    Ok(quota)
}

/// Debit `days` working days from the quota row. Runs on the caller's
/// connection so a surrounding transaction covers it.
pub async fn debit(
    conn: &mut PgConnection,
    quota: &UserLeaveQuota,
    days: i32,
) -> Result<(), ApiError> {
    let (used_days, remaining_days) = apply_debit(quota.allocated_days, quota.used_days, days);

    sqlx::query(
        r#"
        UPDATE user_leave_quotas
        SET used_days = $2,
            remaining_days = $3,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(quota.id)
    .bind(used_days)
    .bind(remaining_days)
    .execute(conn)
    .await?;

    Ok(())
}

/// Lazily materialize quota rows for every active leave type of the
/// institution, returning them alongside the type names for display.
pub async fn ensure_quotas_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
    institution_id: Uuid,
    year: i32,
) -> Result<Vec<(String, String, UserLeaveQuota)>, ApiError> {
    let leave_types = sqlx::query_as::<_, (Uuid, String, String)>(
        r#"
        SELECT id, name, code
        FROM leave_types
        WHERE institution_id = $1
        AND is_active = TRUE
        ORDER BY name
        "#,
    )
    .bind(institution_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut quotas = Vec::with_capacity(leave_types.len());
    for (leave_type_id, name, code) in leave_types {
        let quota = ensure_quota(conn, user_id, leave_type_id, year).await?;
        quotas.push((name, code, quota));
    }

    Ok(quotas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_keeps_the_invariant() {
        let (used, remaining) = apply_debit(14, 2, 3);
        assert_eq!(used, 5);
        assert_eq!(remaining, 9);
        assert_eq!(remaining, 14 - used);
    }

    #[test]
    fn zero_day_debit_is_a_noop() {
        assert_eq!(apply_debit(10, 4, 0), (4, 6));
    }

    #[test]
    fn overdraw_goes_negative_rather_than_clamping() {
        // remaining must stay honest so an overdrawn quota is visible
        assert_eq!(apply_debit(5, 4, 3), (7, -2));
    }
}
