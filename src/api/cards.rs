use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::smart_card::SmartCard;
use crate::utils::{card_cache, card_filter};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct EnrollCard {
    pub user_id: Uuid,
    #[schema(example = "04:A1:B2:C3")]
    pub card_uid: String,
}

/// Enroll a card for a user. The filter and cache are updated in the same
/// request so a freshly enrolled card scans immediately (the filter gives
/// authoritative negatives, it must never miss an enrollment).
#[utoipa::path(
    post,
    path = "/api/v1/cards",
    request_body = EnrollCard,
    responses(
        (status = 200, description = "Card enrolled", body = Object, example = json!({
            "success": true,
            "data": { "id": "5f6a2d9e-8f1b-4f7c-9f3e-0a1b2c3d4e5f" }
        })),
        (status = 400, description = "Bad request or card already enrolled"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Card"
)]
pub async fn enroll_card(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<EnrollCard>,
) -> Result<HttpResponse, ApiError> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    let card_uid = card_filter::normalize(&payload.card_uid);
    if card_uid.is_empty() {
        return Err(ApiError::validation("card_uid must not be empty"));
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

    let id = Uuid::new_v4();

    let result = sqlx::query(
        r#"
        INSERT INTO smart_cards (id, user_id, card_uid, status)
        VALUES ($1, $2, $3, 'active')
        "#,
    )
    .bind(id)
    .bind(payload.user_id)
    .bind(&card_uid)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            // keep the scan fast path coherent with the database
            card_filter::insert(&card_uid);
            card_cache::mark_enrolled(&card_uid, payload.user_id).await;

            info!(%card_uid, user_id = %payload.user_id, "Card enrolled");

            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": { "id": id }
            })))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23505") {
                    return Err(ApiError::state("Card already enrolled"));
                }
            }

            error!(error = %e, %card_uid, "Failed to enroll card");
            Err(ApiError::Upstream)
        }
    }
}

/// List a user's cards
#[utoipa::path(
    get,
    path = "/api/v1/cards/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "Card holder's user ID")
    ),
    responses(
        (status = 200, description = "Cards of the user", body = Vec<SmartCard>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Card"
)]
pub async fn list_cards(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    let user_id = path.into_inner();

    let cards = sqlx::query_as::<_, SmartCard>(
        r#"
        SELECT sc.id, sc.user_id, sc.card_uid, sc.status
        FROM smart_cards sc
        JOIN users u ON u.id = sc.user_id
        WHERE sc.user_id = $1
        AND u.institution_id = $2
        ORDER BY sc.card_uid
        "#,
    )
    .bind(user_id)
    .bind(institution_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": cards
    })))
}

/// Deactivate a card; the filter and cache drop it in the same request so
/// the next scan is refused.
#[utoipa::path(
    delete,
    path = "/api/v1/cards/{card_uid}",
    params(
        ("card_uid" = String, Path, description = "Card UID to deactivate")
    ),
    responses(
        (status = 200, description = "Card deactivated"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Card"
)]
pub async fn deactivate_card(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    auth.require_institution_admin()?;
    let institution_id = auth.institution()?;

    let card_uid = card_filter::normalize(&path.into_inner());

    let result = sqlx::query(
        r#"
        UPDATE smart_cards sc
        SET status = 'inactive'
        FROM users u
        WHERE u.id = sc.user_id
        AND sc.card_uid = $1
        AND sc.status = 'active'
        AND u.institution_id = $2
        "#,
    )
    .bind(&card_uid)
    .bind(institution_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Card not found or already inactive"));
    }

    card_filter::remove(&card_uid);
    card_cache::evict(&card_uid).await;

    info!(%card_uid, "Card deactivated");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Card deactivated"
    })))
}
