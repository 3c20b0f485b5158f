use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{NewPendingNotification, PendingNotification},
    utils::sql,
};

const NOTIFICATION_COLUMNS: &str = r#"
    id,
    tenant_id,
    kind,
    payload,
    send_after,
    marcacion_event_id,
    attempts,
    last_error,
    claimed_until,
    created_at
"#;

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    notification: &NewPendingNotification,
) -> Result<PendingNotification, sqlx::Error> {
    sqlx::query_as::<_, PendingNotification>(&sql(&format!(
        r#"
        INSERT INTO
            pending_notifications (
                tenant_id,
                kind,
                payload,
                send_after,
                marcacion_event_id,
                attempts,
                created_at
            )
        VALUES
            (?, ?, ?, ?, ?, 0, ?)
        RETURNING {NOTIFICATION_COLUMNS}
        "#
    )))
    .bind(notification.tenant_id)
    .bind(&notification.kind)
    .bind(&notification.payload)
    .bind(notification.send_after)
    .bind(notification.marcacion_event_id)
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await
}

/// Lease up to `limit` due, unclaimed rows outside `exclude` to the caller
/// until `lease_until`. Rows already locked by another sweeper are skipped,
/// not waited on.
pub async fn claim_due(
    now: DateTime<Utc>,
    lease_until: DateTime<Utc>,
    limit: i64,
    exclude: &[Uuid],
) -> Result<Vec<PendingNotification>, sqlx::Error> {
    sqlx::query_as::<_, PendingNotification>(&sql(&format!(
        r#"
        UPDATE pending_notifications
        SET claimed_until = ?
        WHERE id IN (
            SELECT id
            FROM pending_notifications
            WHERE
                send_after <= ?
                AND (claimed_until IS NULL OR claimed_until < ?)
                AND NOT (id = ANY(?))
            ORDER BY send_after
            LIMIT ?
            FOR UPDATE SKIP LOCKED
        )
        RETURNING {NOTIFICATION_COLUMNS}
        "#
    )))
    .bind(lease_until)
    .bind(now)
    .bind(now)
    .bind(exclude)
    .bind(limit)
    .fetch_all(get_pool()?)
    .await
}

pub async fn delete(id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(&sql("DELETE FROM pending_notifications WHERE id = ?"))
        .bind(id)
        .execute(get_pool()?)
        .await?;

    Ok(())
}

/// Drop the lease so the next sweep retries, keeping the failure reason.
pub async fn release_failed(id: Uuid, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query(&sql(r#"
        UPDATE pending_notifications
        SET
            claimed_until = NULL,
            attempts = attempts + 1,
            last_error = ?
        WHERE id = ?
    "#))
    .bind(error)
    .bind(id)
    .execute(get_pool()?)
    .await?;

    Ok(())
}
