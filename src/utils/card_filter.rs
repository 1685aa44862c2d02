use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::PgPool;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on real enrollment counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Membership filter over enrolled card UIDs: a scan of an unknown card is
/// rejected without touching the database.
static CARD_FILTER: Lazy<RwLock<CuckooFilter<String>>> = Lazy::new(|| {
    RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE))
});

#[inline]
pub fn normalize(card_uid: &str) -> String {
    card_uid.trim().to_uppercase()
}

/// Check if a card UID might be enrolled (false positives possible)
pub fn might_exist(card_uid: &str) -> bool {
    let card_uid = normalize(card_uid);
    CARD_FILTER
        .read()
        .expect("card filter poisoned")
        .contains(&card_uid)
}

/// Insert a single card UID into the filter
pub fn insert(card_uid: &str) {
    let card_uid = normalize(card_uid);
    CARD_FILTER
        .write()
        .expect("card filter poisoned")
        .add(&card_uid);
}

/// Remove a card UID from the filter (card deactivated)
pub fn remove(card_uid: &str) {
    let card_uid = normalize(card_uid);
    CARD_FILTER
        .write()
        .expect("card filter poisoned")
        .remove(&card_uid);
}

/// Warm up the card filter using streaming + batching
pub async fn warmup_card_filter(pool: &PgPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        "SELECT card_uid FROM smart_cards WHERE status = 'active'",
    )
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (card_uid,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&card_uid));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("Card filter warmup complete: {} cards", total);
    Ok(())
}

/// Insert a batch of normalized card UIDs
fn insert_batch(card_uids: &[String]) {
    let mut filter = CARD_FILTER.write().expect("card filter poisoned");

    for card_uid in card_uids {
        filter.add(card_uid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_contains_then_remove() {
        insert("04:a1:b2:c3");
        assert!(might_exist("04:A1:B2:C3")); // lookup is case-insensitive

        remove("04:a1:b2:c3");
        assert!(!might_exist("04:a1:b2:c3"));
    }

    #[test]
    fn unknown_uid_is_negative() {
        assert!(!might_exist("ff:ff:ff:ff:never-enrolled"));
    }
}
