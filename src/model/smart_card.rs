use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Card enrollment for device check-in. `card_uid` is the normalized
/// (uppercase hex) UID read off the card.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SmartCard {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "04:A1:B2:C3")]
    pub card_uid: String,
    #[schema(example = "active")]
    pub status: String,
}
