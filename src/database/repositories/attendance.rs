use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{AttendanceRecord, AttendanceRow, AttendanceStatus},
    utils::sql,
};

const RECORD_COLUMNS: &str = r#"
    id,
    tenant_id,
    installation_id,
    post_id,
    date,
    planned_guard_id,
    actual_guard_id,
    replacement_guard_id,
    status,
    status_override,
    check_in_at,
    check_out_at,
    notes,
    created_at,
    updated_at
"#;

const ROW_SELECT: &str = r#"
    SELECT
        a.id,
        a.tenant_id,
        a.installation_id,
        a.post_id,
        a.date,
        a.planned_guard_id,
        a.actual_guard_id,
        a.replacement_guard_id,
        a.status,
        a.status_override,
        a.check_in_at,
        a.check_out_at,
        a.notes,
        a.created_at,
        a.updated_at,
        p.name AS post_name,
        pg.first_name || ' ' || pg.last_name AS planned_guard_name,
        ag.first_name || ' ' || ag.last_name AS actual_guard_name,
        rg.first_name || ' ' || rg.last_name AS replacement_guard_name
    FROM attendance_records a
    JOIN posts p ON p.id = a.post_id
    LEFT JOIN guards pg ON pg.id = a.planned_guard_id
    LEFT JOIN guards ag ON ag.id = a.actual_guard_id
    LEFT JOIN guards rg ON rg.id = a.replacement_guard_id
"#;

pub async fn count_day(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    installation_id: Uuid,
    date: NaiveDate,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&sql(r#"
        SELECT COUNT(*)
        FROM attendance_records
        WHERE tenant_id = ? AND installation_id = ? AND date = ?
    "#))
    .bind(tenant_id)
    .bind(installation_id)
    .bind(date)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_if_absent(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    installation_id: Uuid,
    post_id: Uuid,
    date: NaiveDate,
    planned_guard_id: Option<Uuid>,
    status: AttendanceStatus,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now();

    let result = sqlx::query(&sql(r#"
        INSERT INTO
            attendance_records (
                tenant_id,
                installation_id,
                post_id,
                date,
                planned_guard_id,
                status,
                created_at,
                updated_at
            )
        VALUES
            (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (post_id, date) DO NOTHING
    "#))
    .bind(tenant_id)
    .bind(installation_id)
    .bind(post_id)
    .bind(date)
    .bind(planned_guard_id)
    .bind(status)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn list_rows(
    tenant_id: Uuid,
    date: NaiveDate,
    installation_id: Option<Uuid>,
) -> Result<Vec<AttendanceRow>, sqlx::Error> {
    let rows = match installation_id {
        Some(installation_id) => {
            sqlx::query_as::<_, AttendanceRow>(&sql(&format!(
                r#"
                {ROW_SELECT}
                WHERE a.tenant_id = ? AND a.date = ? AND a.installation_id = ?
                ORDER BY p.name
                "#
            )))
            .bind(tenant_id)
            .bind(date)
            .bind(installation_id)
            .fetch_all(get_pool()?)
            .await?
        }
        None => {
            sqlx::query_as::<_, AttendanceRow>(&sql(&format!(
                r#"
                {ROW_SELECT}
                WHERE a.tenant_id = ? AND a.date = ?
                ORDER BY a.installation_id, p.name
                "#
            )))
            .bind(tenant_id)
            .bind(date)
            .fetch_all(get_pool()?)
            .await?
        }
    };

    Ok(rows)
}

pub async fn find_for_update(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
        r#"
        SELECT {RECORD_COLUMNS}
        FROM attendance_records
        WHERE id = ? AND tenant_id = ?
        FOR UPDATE
        "#
    )))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut **tx)
    .await
}

/// The day's record this guard is planned on or already covering.
pub async fn find_guard_record(
    tx: &mut Transaction<'_, Postgres>,
    installation_id: Uuid,
    date: NaiveDate,
    guard_id: Uuid,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
        r#"
        SELECT {RECORD_COLUMNS}
        FROM attendance_records
        WHERE
            installation_id = ?
            AND date = ?
            AND (planned_guard_id = ? OR actual_guard_id = ? OR replacement_guard_id = ?)
        ORDER BY check_in_at NULLS FIRST, created_at
        LIMIT 1
        FOR UPDATE
        "#
    )))
    .bind(installation_id)
    .bind(date)
    .bind(guard_id)
    .bind(guard_id)
    .bind(guard_id)
    .fetch_optional(&mut **tx)
    .await
}

/// A post-day nobody is planned on or covering yet.
pub async fn find_uncovered_record(
    tx: &mut Transaction<'_, Postgres>,
    installation_id: Uuid,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
        r#"
        SELECT {RECORD_COLUMNS}
        FROM attendance_records
        WHERE
            installation_id = ?
            AND date = ?
            AND planned_guard_id IS NULL
            AND actual_guard_id IS NULL
            AND replacement_guard_id IS NULL
        ORDER BY created_at
        LIMIT 1
        FOR UPDATE
        "#
    )))
    .bind(installation_id)
    .bind(date)
    .fetch_optional(&mut **tx)
    .await
}

/// Latest record on `from..=to` where the guard checked in but never out.
pub async fn find_open_check_in(
    tx: &mut Transaction<'_, Postgres>,
    installation_id: Uuid,
    guard_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
        r#"
        SELECT {RECORD_COLUMNS}
        FROM attendance_records
        WHERE
            installation_id = ?
            AND actual_guard_id = ?
            AND date BETWEEN ? AND ?
            AND check_in_at IS NOT NULL
            AND check_out_at IS NULL
        ORDER BY date DESC
        LIMIT 1
        FOR UPDATE
        "#
    )))
    .bind(installation_id)
    .bind(guard_id)
    .bind(from)
    .bind(to)
    .fetch_optional(&mut **tx)
    .await
}

/// Record whose check-in or check-out was set by the given marking.
pub async fn find_by_marking(
    tx: &mut Transaction<'_, Postgres>,
    installation_id: Uuid,
    guard_id: Uuid,
    marked_at: DateTime<Utc>,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
        r#"
        SELECT {RECORD_COLUMNS}
        FROM attendance_records
        WHERE
            installation_id = ?
            AND actual_guard_id = ?
            AND (check_in_at = ? OR check_out_at = ?)
        LIMIT 1
        FOR UPDATE
        "#
    )))
    .bind(installation_id)
    .bind(guard_id)
    .bind(marked_at)
    .bind(marked_at)
    .fetch_optional(&mut **tx)
    .await
}

/// Persist the mutable half of a record as computed by the caller.
pub async fn save(
    tx: &mut Transaction<'_, Postgres>,
    record: &AttendanceRecord,
) -> Result<AttendanceRecord, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
        r#"
        UPDATE attendance_records
        SET
            actual_guard_id = ?,
            replacement_guard_id = ?,
            status = ?,
            status_override = ?,
            check_in_at = ?,
            check_out_at = ?,
            notes = ?,
            updated_at = ?
        WHERE id = ?
        RETURNING {RECORD_COLUMNS}
        "#
    )))
    .bind(record.actual_guard_id)
    .bind(record.replacement_guard_id)
    .bind(record.status)
    .bind(record.status_override)
    .bind(record.check_in_at)
    .bind(record.check_out_at)
    .bind(&record.notes)
    .bind(Utc::now())
    .bind(record.id)
    .fetch_one(&mut **tx)
    .await
}
