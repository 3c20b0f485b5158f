use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::{get_pool, models::GuardCredential, utils::sql};

/// Replace the guard's credential. The previous hash stops matching the
/// moment this commits.
pub async fn upsert_credential(
    guard_id: Uuid,
    pin_hash: &str,
    pin_plaintext: &str,
) -> Result<DateTime<Utc>, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_scalar::<_, DateTime<Utc>>(&sql(r#"
        INSERT INTO
            guard_credentials (guard_id, pin_hash, pin_plaintext, issued_at)
        VALUES
            (?, ?, ?, ?)
        ON CONFLICT (guard_id) DO UPDATE
        SET
            pin_hash = EXCLUDED.pin_hash,
            pin_plaintext = EXCLUDED.pin_plaintext,
            issued_at = EXCLUDED.issued_at
        RETURNING issued_at
    "#))
    .bind(guard_id)
    .bind(pin_hash)
    .bind(pin_plaintext)
    .bind(now)
    .fetch_one(get_pool()?)
    .await
}

pub async fn find_credential(guard_id: Uuid) -> Result<Option<GuardCredential>, sqlx::Error> {
    sqlx::query_as::<_, GuardCredential>(&sql(r#"
        SELECT guard_id, pin_hash, issued_at
        FROM guard_credentials
        WHERE guard_id = ?
    "#))
    .bind(guard_id)
    .fetch_optional(get_pool()?)
    .await
}
