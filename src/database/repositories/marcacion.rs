use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{MarcacionEvent, NewMarcacionEvent},
    utils::sql,
};

const EVENT_COLUMNS: &str = r#"
    id,
    tenant_id,
    guard_id,
    installation_id,
    direction,
    marked_at,
    latitude,
    longitude,
    geo_validated,
    geo_distance_m,
    integrity_hash,
    method,
    created_by,
    note,
    created_at
"#;

pub async fn insert_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &NewMarcacionEvent,
) -> Result<MarcacionEvent, sqlx::Error> {
    sqlx::query_as::<_, MarcacionEvent>(&sql(&format!(
        r#"
        INSERT INTO
            marcacion_events (
                tenant_id,
                guard_id,
                installation_id,
                direction,
                marked_at,
                latitude,
                longitude,
                geo_validated,
                geo_distance_m,
                integrity_hash,
                method,
                created_by,
                note,
                created_at
            )
        VALUES
            (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {EVENT_COLUMNS}
        "#
    )))
    .bind(event.tenant_id)
    .bind(event.guard_id)
    .bind(event.installation_id)
    .bind(event.direction)
    .bind(event.marked_at)
    .bind(event.latitude)
    .bind(event.longitude)
    .bind(event.geo_validated)
    .bind(event.geo_distance_m)
    .bind(&event.integrity_hash)
    .bind(event.method)
    .bind(event.created_by)
    .bind(&event.note)
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_id(tenant_id: Uuid, id: Uuid) -> Result<Option<MarcacionEvent>, sqlx::Error> {
    sqlx::query_as::<_, MarcacionEvent>(&sql(&format!(
        r#"
        SELECT {EVENT_COLUMNS}
        FROM marcacion_events
        WHERE id = ? AND tenant_id = ?
        "#
    )))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(get_pool()?)
    .await
}

pub async fn find_for_update(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<Option<MarcacionEvent>, sqlx::Error> {
    sqlx::query_as::<_, MarcacionEvent>(&sql(&format!(
        r#"
        SELECT {EVENT_COLUMNS}
        FROM marcacion_events
        WHERE id = ? AND tenant_id = ?
        FOR UPDATE
        "#
    )))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Newest first, bounded below by `since`.
pub async fn list_for_guard(
    guard_id: Uuid,
    installation_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<MarcacionEvent>, sqlx::Error> {
    sqlx::query_as::<_, MarcacionEvent>(&sql(&format!(
        r#"
        SELECT {EVENT_COLUMNS}
        FROM marcacion_events
        WHERE guard_id = ? AND installation_id = ? AND marked_at >= ?
        ORDER BY marked_at DESC
        "#
    )))
    .bind(guard_id)
    .bind(installation_id)
    .bind(since)
    .fetch_all(get_pool()?)
    .await
}

pub async fn delete_event(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&sql("DELETE FROM marcacion_events WHERE id = ?"))
        .bind(id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn exists(id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(&sql(
        "SELECT EXISTS (SELECT 1 FROM marcacion_events WHERE id = ?)",
    ))
    .bind(id)
    .fetch_one(get_pool()?)
    .await
}
