use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{BankExportRow, PaymentBatch, PaymentBatchItem, PaymentBatchStatus, PaymentItemStatus},
    utils::sql,
};

const BATCH_COLUMNS: &str = r#"
    id,
    tenant_id,
    code,
    week_start,
    week_end,
    status,
    total_amount,
    created_by,
    exported_at,
    paid_at,
    created_at,
    updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id,
    batch_id,
    shift_id,
    guard_id,
    amount,
    status,
    paid_at,
    created_at
"#;

/// Existing codes for the tenant that start with `prefix`.
pub async fn codes_with_prefix(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    prefix: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(&sql(r#"
        SELECT code
        FROM payment_batches
        WHERE tenant_id = ? AND code LIKE ?
    "#))
    .bind(tenant_id)
    .bind(format!("{prefix}%"))
    .fetch_all(&mut **tx)
    .await
}

pub async fn insert_batch(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    code: &str,
    week_start: NaiveDate,
    week_end: NaiveDate,
    total_amount: &BigDecimal,
    created_by: Uuid,
) -> Result<PaymentBatch, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, PaymentBatch>(&sql(&format!(
        r#"
        INSERT INTO
            payment_batches (
                tenant_id,
                code,
                week_start,
                week_end,
                status,
                total_amount,
                created_by,
                created_at,
                updated_at
            )
        VALUES
            (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {BATCH_COLUMNS}
        "#
    )))
    .bind(tenant_id)
    .bind(code)
    .bind(week_start)
    .bind(week_end)
    .bind(PaymentBatchStatus::Draft)
    .bind(total_amount)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_item(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: Uuid,
    shift_id: Uuid,
    guard_id: Uuid,
    amount: &BigDecimal,
) -> Result<PaymentBatchItem, sqlx::Error> {
    sqlx::query_as::<_, PaymentBatchItem>(&sql(&format!(
        r#"
        INSERT INTO
            payment_batch_items (batch_id, shift_id, guard_id, amount, status, created_at)
        VALUES
            (?, ?, ?, ?, ?, ?)
        RETURNING {ITEM_COLUMNS}
        "#
    )))
    .bind(batch_id)
    .bind(shift_id)
    .bind(guard_id)
    .bind(amount)
    .bind(PaymentItemStatus::Pending)
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_id(tenant_id: Uuid, id: Uuid) -> Result<Option<PaymentBatch>, sqlx::Error> {
    sqlx::query_as::<_, PaymentBatch>(&sql(&format!(
        r#"
        SELECT {BATCH_COLUMNS}
        FROM payment_batches
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
) -> Result<Option<PaymentBatch>, sqlx::Error> {
    sqlx::query_as::<_, PaymentBatch>(&sql(&format!(
        r#"
        SELECT {BATCH_COLUMNS}
        FROM payment_batches
        WHERE id = ? AND tenant_id = ?
        FOR UPDATE
        "#
    )))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn list_items(batch_id: Uuid) -> Result<Vec<PaymentBatchItem>, sqlx::Error> {
    sqlx::query_as::<_, PaymentBatchItem>(&sql(&format!(
        r#"
        SELECT {ITEM_COLUMNS}
        FROM payment_batch_items
        WHERE batch_id = ?
        ORDER BY created_at, id
        "#
    )))
    .bind(batch_id)
    .fetch_all(get_pool()?)
    .await
}

pub async fn list_batches(tenant_id: Uuid) -> Result<Vec<PaymentBatch>, sqlx::Error> {
    sqlx::query_as::<_, PaymentBatch>(&sql(&format!(
        r#"
        SELECT {BATCH_COLUMNS}
        FROM payment_batches
        WHERE tenant_id = ?
        ORDER BY week_start DESC, code DESC
        "#
    )))
    .bind(tenant_id)
    .fetch_all(get_pool()?)
    .await
}

pub async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: PaymentBatchStatus,
    at: DateTime<Utc>,
) -> Result<PaymentBatch, sqlx::Error> {
    let exported_at = (status == PaymentBatchStatus::Exported).then_some(at);
    let paid_at = (status == PaymentBatchStatus::Paid).then_some(at);

    sqlx::query_as::<_, PaymentBatch>(&sql(&format!(
        r#"
        UPDATE payment_batches
        SET
            status = ?,
            exported_at = COALESCE(?, exported_at),
            paid_at = COALESCE(?, paid_at),
            updated_at = ?
        WHERE id = ?
        RETURNING {BATCH_COLUMNS}
        "#
    )))
    .bind(status)
    .bind(exported_at)
    .bind(paid_at)
    .bind(at)
    .bind(id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn mark_items_paid(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: Uuid,
    at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(&sql(r#"
        UPDATE payment_batch_items
        SET status = ?, paid_at = ?
        WHERE batch_id = ?
    "#))
    .bind(PaymentItemStatus::Paid)
    .bind(at)
    .bind(batch_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// One row per item; account columns are NULL for guards without a default
/// account.
pub async fn export_rows(batch_id: Uuid) -> Result<Vec<BankExportRow>, sqlx::Error> {
    sqlx::query_as::<_, BankExportRow>(&sql(r#"
        SELECT
            g.rut,
            g.first_name,
            g.last_name,
            b.bank_name,
            b.account_type,
            b.account_number,
            i.amount
        FROM payment_batch_items i
        JOIN guards g ON g.id = i.guard_id
        LEFT JOIN guard_bank_accounts b ON b.guard_id = g.id AND b.is_default = TRUE
        WHERE i.batch_id = ?
        ORDER BY g.last_name, g.first_name, i.created_at
    "#))
    .bind(batch_id)
    .fetch_all(get_pool()?)
    .await
}
