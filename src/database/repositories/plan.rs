use chrono::{NaiveDate, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{NewPlanEntry, PlanEntry, PlanStatus, PlanUpsertItem},
    utils::sql,
};

const PLAN_COLUMNS: &str = r#"
    id,
    tenant_id,
    installation_id,
    post_id,
    date,
    guard_id,
    status,
    notes,
    created_at,
    updated_at
"#;

pub async fn delete_range(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    installation_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(&sql(r#"
        DELETE FROM plan_entries
        WHERE
            tenant_id = ?
            AND installation_id = ?
            AND date BETWEEN ? AND ?
    "#))
    .bind(tenant_id)
    .bind(installation_id)
    .bind(from)
    .bind(to)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// Insert unless the (post, date) key already exists. Returns whether a row
/// was written; a concurrent duplicate is skipped, never an error.
pub async fn insert_if_absent(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    entry: &NewPlanEntry,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now();

    let result = sqlx::query(&sql(r#"
        INSERT INTO
            plan_entries (
                tenant_id,
                installation_id,
                post_id,
                date,
                guard_id,
                status,
                created_at,
                updated_at
            )
        VALUES
            (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (post_id, date) DO NOTHING
    "#))
    .bind(tenant_id)
    .bind(entry.installation_id)
    .bind(entry.post_id)
    .bind(entry.date)
    .bind(entry.guard_id)
    .bind(PlanStatus::Planned)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn upsert(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    installation_id: Uuid,
    item: &PlanUpsertItem,
) -> Result<PlanEntry, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, PlanEntry>(&sql(&format!(
        r#"
        INSERT INTO
            plan_entries (
                tenant_id,
                installation_id,
                post_id,
                date,
                guard_id,
                status,
                notes,
                created_at,
                updated_at
            )
        VALUES
            (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (post_id, date) DO UPDATE
        SET
            guard_id = EXCLUDED.guard_id,
            status = EXCLUDED.status,
            notes = EXCLUDED.notes,
            updated_at = EXCLUDED.updated_at
        RETURNING {PLAN_COLUMNS}
        "#
    )))
    .bind(tenant_id)
    .bind(installation_id)
    .bind(item.post_id)
    .bind(item.date)
    .bind(item.guard_id)
    .bind(item.status.unwrap_or_default())
    .bind(&item.notes)
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}

pub async fn list_range(
    tenant_id: Uuid,
    installation_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<PlanEntry>, sqlx::Error> {
    sqlx::query_as::<_, PlanEntry>(&sql(&format!(
        r#"
        SELECT {PLAN_COLUMNS}
        FROM plan_entries
        WHERE
            tenant_id = ?
            AND installation_id = ?
            AND date BETWEEN ? AND ?
        ORDER BY date, post_id
        "#
    )))
    .bind(tenant_id)
    .bind(installation_id)
    .bind(from)
    .bind(to)
    .fetch_all(get_pool()?)
    .await
}

/// Plan rows that should seed a day's attendance; cancelled rows do not.
pub async fn list_day_for_attendance(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    installation_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<PlanEntry>, sqlx::Error> {
    sqlx::query_as::<_, PlanEntry>(&sql(&format!(
        r#"
        SELECT {PLAN_COLUMNS}
        FROM plan_entries
        WHERE
            tenant_id = ?
            AND installation_id = ?
            AND date = ?
            AND status <> ?
        ORDER BY post_id
        "#
    )))
    .bind(tenant_id)
    .bind(installation_id)
    .bind(date)
    .bind(PlanStatus::Cancelled)
    .fetch_all(&mut **tx)
    .await
}
