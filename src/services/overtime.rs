use bigdecimal::{BigDecimal, Zero};
use chrono::{Datelike, NaiveDate, Utc};
use uuid::Uuid;

use crate::database::{
    models::{
        CreateBatchInput, OvertimeQuery, OvertimeShift, OvertimeShiftInput, OvertimeStatus,
        PaymentBatch, PaymentBatchDetail, PaymentBatchStatus,
    },
    repositories::{
        guard as guard_repo, installation as installation_repo, overtime as overtime_repo,
        payment_batch as batch_repo,
    },
    transaction::DatabaseTransaction,
};
use crate::error::AppError;
use crate::services::bank_export::render_bank_csv;

pub async fn create_shift(
    tenant_id: Uuid,
    created_by: Uuid,
    input: OvertimeShiftInput,
) -> Result<OvertimeShift, AppError> {
    if input.amount <= BigDecimal::zero() {
        return Err(AppError::validation("Overtime amount must be positive"));
    }

    guard_repo::find_by_id(tenant_id, input.guard_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Guard {} not found", input.guard_id)))?;
    let post = installation_repo::find_post(tenant_id, input.post_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Post {} not found", input.post_id)))?;

    let shift = DatabaseTransaction::run(move |tx| {
        Box::pin(async move {
            Ok(overtime_repo::create_shift(tx, tenant_id, post.installation_id, &input, created_by)
                .await?)
        })
    })
    .await?;

    log::info!(
        "Overtime shift {} recorded for guard {} on {} ({} CLP)",
        shift.id,
        shift.guard_id,
        shift.date,
        shift.amount
    );
    Ok(shift)
}

async fn change_status(
    tenant_id: Uuid,
    id: Uuid,
    next: OvertimeStatus,
    reason: Option<String>,
) -> Result<OvertimeShift, AppError> {
    DatabaseTransaction::run(move |tx| {
        Box::pin(async move {
            let shift = overtime_repo::find_for_update(tx, tenant_id, id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Overtime shift {} not found", id)))?;

            let next = shift.status.transition_to(next)?;

            if overtime_repo::is_batched(tx, shift.id).await? {
                return Err(AppError::conflict(
                    "Overtime shift is already in a payment batch",
                ));
            }

            let reason = match next {
                OvertimeStatus::Rejected => reason.as_deref(),
                _ => None,
            };
            Ok(overtime_repo::update_status(tx, shift.id, next, reason).await?)
        })
    })
    .await
}

pub async fn approve(tenant_id: Uuid, id: Uuid) -> Result<OvertimeShift, AppError> {
    let shift = change_status(tenant_id, id, OvertimeStatus::Approved, None).await?;
    log::info!("Overtime shift {} approved", shift.id);
    Ok(shift)
}

pub async fn reject(
    tenant_id: Uuid,
    id: Uuid,
    reason: Option<String>,
) -> Result<OvertimeShift, AppError> {
    let shift = change_status(tenant_id, id, OvertimeStatus::Rejected, reason).await?;
    log::info!("Overtime shift {} rejected", shift.id);
    Ok(shift)
}

pub async fn list_shifts(
    tenant_id: Uuid,
    filter: OvertimeQuery,
) -> Result<Vec<OvertimeShift>, AppError> {
    Ok(overtime_repo::list_shifts(tenant_id, &filter).await?)
}

/// `HE-{ISO year}-W{ISO week}` for the week holding `week_start`.
pub fn batch_code_prefix(week_start: NaiveDate) -> String {
    let iso = week_start.iso_week();
    format!("HE-{}-W{:02}", iso.year(), iso.week())
}

/// The week's prefix, with a `-2`, `-3`, ... suffix when it is taken.
pub fn batch_code(week_start: NaiveDate, existing: &[String]) -> String {
    let prefix = batch_code_prefix(week_start);

    if !existing.iter().any(|code| code == &prefix) {
        return prefix;
    }

    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", prefix, n);
        if !existing.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Gather every approved, unbatched shift dated in the range into a new
/// draft batch.
pub async fn create_batch(
    tenant_id: Uuid,
    created_by: Uuid,
    input: CreateBatchInput,
) -> Result<PaymentBatchDetail, AppError> {
    let CreateBatchInput {
        week_start,
        week_end,
    } = input;
    if week_start > week_end {
        return Err(AppError::validation(
            "weekStart must not be after weekEnd",
        ));
    }

    let detail = DatabaseTransaction::run(move |tx| {
        Box::pin(async move {
            let shifts =
                overtime_repo::select_batchable_for_update(tx, tenant_id, week_start, week_end)
                    .await?;
            if shifts.is_empty() {
                return Err(AppError::conflict(
                    "Nothing to batch: no approved, unbatched overtime in this range",
                ));
            }

            let total = shifts
                .iter()
                .fold(BigDecimal::zero(), |acc, shift| acc + &shift.amount);

            let prefix = batch_code_prefix(week_start);
            let existing = batch_repo::codes_with_prefix(tx, tenant_id, &prefix).await?;
            let code = batch_code(week_start, &existing);

            let batch = batch_repo::insert_batch(
                tx, tenant_id, &code, week_start, week_end, &total, created_by,
            )
            .await?;

            let mut items = Vec::with_capacity(shifts.len());
            for shift in &shifts {
                items.push(
                    batch_repo::insert_item(tx, batch.id, shift.id, shift.guard_id, &shift.amount)
                        .await?,
                );
            }

            Ok(PaymentBatchDetail { batch, items })
        })
    })
    .await?;

    log::info!(
        "Payment batch {} created with {} items totalling {}",
        detail.batch.code,
        detail.items.len(),
        detail.batch.total_amount
    );
    Ok(detail)
}

pub async fn get_batch(tenant_id: Uuid, id: Uuid) -> Result<PaymentBatchDetail, AppError> {
    let batch = batch_repo::find_by_id(tenant_id, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Payment batch {} not found", id)))?;
    let items = batch_repo::list_items(batch.id).await?;

    Ok(PaymentBatchDetail { batch, items })
}

pub async fn list_batches(tenant_id: Uuid) -> Result<Vec<PaymentBatch>, AppError> {
    Ok(batch_repo::list_batches(tenant_id).await?)
}

/// Bank-transfer CSV for the batch, with its code as the filename stem.
/// Read-only.
pub async fn export_bank_file(tenant_id: Uuid, id: Uuid) -> Result<(String, String), AppError> {
    let batch = batch_repo::find_by_id(tenant_id, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Payment batch {} not found", id)))?;
    let rows = batch_repo::export_rows(batch.id).await?;

    let csv = render_bank_csv(&batch.code, &rows)?;
    Ok((batch.code, csv))
}

async fn advance_batch(
    tenant_id: Uuid,
    id: Uuid,
    next: PaymentBatchStatus,
) -> Result<PaymentBatch, AppError> {
    DatabaseTransaction::run(move |tx| {
        Box::pin(async move {
            let batch = batch_repo::find_for_update(tx, tenant_id, id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Payment batch {} not found", id)))?;

            let next = batch.status.transition_to(next)?;
            let now = Utc::now();
            let batch = batch_repo::set_status(tx, batch.id, next, now).await?;

            if next == PaymentBatchStatus::Paid {
                batch_repo::mark_items_paid(tx, batch.id, now).await?;
                overtime_repo::mark_paid_for_batch(tx, batch.id).await?;
            }
            Ok(batch)
        })
    })
    .await
}

pub async fn mark_exported(tenant_id: Uuid, id: Uuid) -> Result<PaymentBatch, AppError> {
    let batch = advance_batch(tenant_id, id, PaymentBatchStatus::Exported).await?;
    log::info!("Payment batch {} marked exported", batch.code);
    Ok(batch)
}

/// Batch, items and every referenced shift become paid together.
pub async fn mark_paid(tenant_id: Uuid, id: Uuid) -> Result<PaymentBatchDetail, AppError> {
    let batch = advance_batch(tenant_id, id, PaymentBatchStatus::Paid).await?;
    log::info!("Payment batch {} marked paid", batch.code);

    let items = batch_repo::list_items(batch.id).await?;
    Ok(PaymentBatchDetail { batch, items })
}
