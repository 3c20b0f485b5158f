use chrono::{NaiveDate, Utc};
use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{OvertimeQuery, OvertimeShift, OvertimeShiftInput, OvertimeStatus},
    utils::sql,
};

const SHIFT_COLUMNS: &str = r#"
    id,
    tenant_id,
    guard_id,
    post_id,
    installation_id,
    date,
    amount,
    status,
    rejection_reason,
    notes,
    created_by,
    approved_at,
    paid_at,
    created_at,
    updated_at
"#;

pub async fn create_shift(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    installation_id: Uuid,
    input: &OvertimeShiftInput,
    created_by: Uuid,
) -> Result<OvertimeShift, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, OvertimeShift>(&sql(&format!(
        r#"
        INSERT INTO
            overtime_shifts (
                tenant_id,
                guard_id,
                post_id,
                installation_id,
                date,
                amount,
                status,
                notes,
                created_by,
                created_at,
                updated_at
            )
        VALUES
            (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {SHIFT_COLUMNS}
        "#
    )))
    .bind(tenant_id)
    .bind(input.guard_id)
    .bind(input.post_id)
    .bind(installation_id)
    .bind(input.date)
    .bind(&input.amount)
    .bind(OvertimeStatus::Pending)
    .bind(&input.notes)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_for_update(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<Option<OvertimeShift>, sqlx::Error> {
    sqlx::query_as::<_, OvertimeShift>(&sql(&format!(
        r#"
        SELECT {SHIFT_COLUMNS}
        FROM overtime_shifts
        WHERE id = ? AND tenant_id = ?
        FOR UPDATE
        "#
    )))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Whether the shift is already part of any payment batch.
pub async fn is_batched(
    tx: &mut Transaction<'_, Postgres>,
    shift_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(&sql(
        "SELECT EXISTS (SELECT 1 FROM payment_batch_items WHERE shift_id = ?)",
    ))
    .bind(shift_id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn update_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: OvertimeStatus,
    rejection_reason: Option<&str>,
) -> Result<OvertimeShift, sqlx::Error> {
    let now = Utc::now();
    let approved_at = (status == OvertimeStatus::Approved).then_some(now);

    sqlx::query_as::<_, OvertimeShift>(&sql(&format!(
        r#"
        UPDATE overtime_shifts
        SET
            status = ?,
            rejection_reason = ?,
            approved_at = ?,
            updated_at = ?
        WHERE id = ?
        RETURNING {SHIFT_COLUMNS}
        "#
    )))
    .bind(status)
    .bind(rejection_reason)
    .bind(approved_at)
    .bind(now)
    .bind(id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn list_shifts(
    tenant_id: Uuid,
    filter: &OvertimeQuery,
) -> Result<Vec<OvertimeShift>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {SHIFT_COLUMNS} FROM overtime_shifts WHERE tenant_id = "
    ));
    builder.push_bind(tenant_id);

    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(from) = filter.from {
        builder.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND date <= ").push_bind(to);
    }
    builder.push(" ORDER BY date DESC, created_at DESC");

    builder
        .build_query_as::<OvertimeShift>()
        .fetch_all(get_pool()?)
        .await
}

pub async fn list_by_installation_date(
    tenant_id: Uuid,
    installation_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<OvertimeShift>, sqlx::Error> {
    sqlx::query_as::<_, OvertimeShift>(&sql(&format!(
        r#"
        SELECT {SHIFT_COLUMNS}
        FROM overtime_shifts
        WHERE tenant_id = ? AND installation_id = ? AND date = ?
        ORDER BY created_at
        "#
    )))
    .bind(tenant_id)
    .bind(installation_id)
    .bind(date)
    .fetch_all(get_pool()?)
    .await
}

/// Approved shifts in the week that no batch holds yet, locked against a
/// concurrent batch run.
pub async fn select_batchable_for_update(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    week_start: NaiveDate,
    week_end: NaiveDate,
) -> Result<Vec<OvertimeShift>, sqlx::Error> {
    sqlx::query_as::<_, OvertimeShift>(&sql(&format!(
        r#"
        SELECT {SHIFT_COLUMNS}
        FROM overtime_shifts s
        WHERE
            s.tenant_id = ?
            AND s.status = ?
            AND s.date BETWEEN ? AND ?
            AND NOT EXISTS (
                SELECT 1 FROM payment_batch_items i WHERE i.shift_id = s.id
            )
        ORDER BY s.date, s.created_at
        FOR UPDATE
        "#
    )))
    .bind(tenant_id)
    .bind(OvertimeStatus::Approved)
    .bind(week_start)
    .bind(week_end)
    .fetch_all(&mut **tx)
    .await
}

pub async fn mark_paid_for_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let now = Utc::now();

    let result = sqlx::query(&sql(r#"
        UPDATE overtime_shifts
        SET status = ?, paid_at = ?, updated_at = ?
        WHERE id IN (SELECT shift_id FROM payment_batch_items WHERE batch_id = ?)
    "#))
    .bind(OvertimeStatus::Paid)
    .bind(now)
    .bind(now)
    .bind(batch_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}
