use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

/// card UID -> owning user id; repeat scans of the same card (the common
/// case at a gate reader) skip the smart_cards lookup entirely.
pub static CARD_CACHE: Lazy<Cache<String, Uuid>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000) // tune based on memory
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Remember which user a card resolves to
pub async fn mark_enrolled(card_uid: &str, user_id: Uuid) {
    CARD_CACHE
        .insert(crate::utils::card_filter::normalize(card_uid), user_id)
        .await;
}

/// Resolve a card UID from the cache
pub async fn lookup(card_uid: &str) -> Option<Uuid> {
    CARD_CACHE
        .get(&crate::utils::card_filter::normalize(card_uid))
        .await
}

/// Drop a card from the cache (deactivated or re-assigned)
pub async fn evict(card_uid: &str) {
    CARD_CACHE
        .invalidate(&crate::utils::card_filter::normalize(card_uid))
        .await;
}

/// Batch load card -> user mappings
async fn batch_mark(cards: &[(String, Uuid)]) {
    let futures: Vec<_> = cards
        .iter()
        .map(|(uid, user_id)| {
            CARD_CACHE.insert(crate::utils::card_filter::normalize(uid), *user_id)
        })
        .collect();

    // Await all insertions concurrently
    futures::future::join_all(futures).await;
}

/// Load RECENTLY SEEN cards into the in-memory cache (batched) - cards whose
/// owner checked in during the window are the ones a reader will see again.
pub async fn warmup_card_cache(pool: &PgPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String, Uuid)>(
        r#"
        SELECT DISTINCT sc.card_uid, sc.user_id
        FROM smart_cards sc
        JOIN attendance_records ar ON ar.user_id = sc.user_id
        WHERE sc.status = 'active'
        AND ar.date >= CURRENT_DATE - $1::int
        "#,
    )
    .bind(days as i32)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (card_uid, user_id) = row?;
        batch.push((card_uid, user_id));
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    // Insert any remaining cards
    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    log::info!(
        "Card cache warmup complete: {} recently used cards (last {} days)",
        total_count,
        days
    );

    Ok(())
}
