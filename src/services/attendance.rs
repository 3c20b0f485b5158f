use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{
        AttendanceDay, AttendanceRecord, AttendanceRow, AttendanceStatus, AttendanceUpdateInput,
        MarcacionEvent, MarkDirection, OvertimeShift,
    },
    repositories::{
        attendance as attendance_repo, guard as guard_repo, installation as installation_repo,
        overtime as overtime_repo, plan as plan_repo,
    },
    transaction::DatabaseTransaction,
};
use crate::error::AppError;
use crate::services::settings;

/// Derive a post-day outcome from who was planned, who showed up and who
/// replaced whom. A supervisor override always wins.
pub fn classify(
    planned_guard_id: Option<Uuid>,
    actual_guard_id: Option<Uuid>,
    replacement_guard_id: Option<Uuid>,
    status_override: Option<AttendanceStatus>,
) -> AttendanceStatus {
    if let Some(status) = status_override {
        return status;
    }

    match (planned_guard_id, actual_guard_id, replacement_guard_id) {
        (_, _, Some(_)) => AttendanceStatus::Replaced,
        (_, Some(_), None) => AttendanceStatus::Attended,
        (Some(_), None, None) => AttendanceStatus::Pending,
        (None, None, None) => AttendanceStatus::OpenPost,
    }
}

/// Rows a dispatcher still has to cover.
pub fn needs_dispatch(record: &AttendanceRecord) -> bool {
    match record.status {
        AttendanceStatus::OpenPost | AttendanceStatus::Absent => true,
        AttendanceStatus::Pending => {
            record.actual_guard_id.is_none() && record.replacement_guard_id.is_none()
        }
        AttendanceStatus::Attended | AttendanceStatus::Replaced => false,
    }
}

fn reclassify(record: &mut AttendanceRecord) {
    record.status = classify(
        record.planned_guard_id,
        record.actual_guard_id,
        record.replacement_guard_id,
        record.status_override,
    );
}

/// Seed the day's attendance from the plan unless the day already has rows.
/// Returns how many rows were written.
pub async fn ensure_day_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    installation_id: Uuid,
    date: NaiveDate,
) -> Result<u64, AppError> {
    if attendance_repo::count_day(tx, tenant_id, installation_id, date).await? > 0 {
        return Ok(0);
    }

    let plan = plan_repo::list_day_for_attendance(tx, tenant_id, installation_id, date).await?;

    let mut inserted = 0;
    for entry in &plan {
        let status = classify(entry.guard_id, None, None, None);
        if attendance_repo::insert_if_absent(
            tx,
            tenant_id,
            installation_id,
            entry.post_id,
            date,
            entry.guard_id,
            status,
        )
        .await?
        {
            inserted += 1;
        }
    }

    if inserted > 0 {
        log::debug!(
            "Materialized {} attendance rows for installation {} on {}",
            inserted,
            installation_id,
            date
        );
    }
    Ok(inserted)
}

pub async fn ensure_day(
    tenant_id: Uuid,
    installation_id: Uuid,
    date: NaiveDate,
) -> Result<u64, AppError> {
    DatabaseTransaction::run(move |tx| {
        Box::pin(async move { ensure_day_tx(tx, tenant_id, installation_id, date).await })
    })
    .await
}

/// Attach each post-day's overtime shifts to its row.
pub fn join_overtime(rows: Vec<AttendanceRow>, shifts: Vec<OvertimeShift>) -> Vec<AttendanceDay> {
    let mut by_post: HashMap<Uuid, Vec<OvertimeShift>> = HashMap::new();
    for shift in shifts {
        by_post.entry(shift.post_id).or_default().push(shift);
    }

    rows.into_iter()
        .map(|row| {
            let overtime_shifts = by_post.remove(&row.record.post_id).unwrap_or_default();
            AttendanceDay {
                row,
                overtime_shifts,
            }
        })
        .collect()
}

pub async fn list_day(
    tenant_id: Uuid,
    installation_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<AttendanceDay>, AppError> {
    installation_repo::find_by_id(tenant_id, installation_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Installation {} not found", installation_id)))?;

    ensure_day(tenant_id, installation_id, date).await?;

    let rows = attendance_repo::list_rows(tenant_id, date, Some(installation_id)).await?;
    let shifts =
        overtime_repo::list_by_installation_date(tenant_id, installation_id, date).await?;

    Ok(join_overtime(rows, shifts))
}

/// The open-post (PPC) queue for one day, across one or all installations.
pub async fn list_open_posts(
    tenant_id: Uuid,
    date: NaiveDate,
    installation_id: Option<Uuid>,
) -> Result<Vec<AttendanceRow>, AppError> {
    let installations = match installation_id {
        Some(id) => {
            installation_repo::find_by_id(tenant_id, id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Installation {} not found", id)))?;
            vec![id]
        }
        None => installation_repo::list_active_installation_ids(tenant_id).await?,
    };

    for id in installations {
        ensure_day(tenant_id, id, date).await?;
    }

    let rows = attendance_repo::list_rows(tenant_id, date, installation_id).await?;
    Ok(rows
        .into_iter()
        .filter(|row| needs_dispatch(&row.record))
        .collect())
}

/// Supervisor edit. The submitted guard fields and override replace the
/// stored ones; the status is then re-derived.
pub async fn update_record(
    tenant_id: Uuid,
    id: Uuid,
    input: AttendanceUpdateInput,
) -> Result<AttendanceRecord, AppError> {
    if input.replacement_guard_id.is_some() && !settings::load(tenant_id).await?.allow_replacements
    {
        return Err(AppError::validation(
            "Replacements are disabled for this tenant",
        ));
    }

    for guard_id in [input.actual_guard_id, input.replacement_guard_id]
        .into_iter()
        .flatten()
    {
        let guard = guard_repo::find_by_id(tenant_id, guard_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Guard {} not found", guard_id)))?;
        if !guard.is_assignable() {
            return Err(AppError::validation(format!(
                "Guard {} is inactive or blacklisted",
                guard_id
            )));
        }
    }

    let record = DatabaseTransaction::run(move |tx| {
        Box::pin(async move {
            let mut record = attendance_repo::find_for_update(tx, tenant_id, id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Attendance record {} not found", id)))?;

            record.actual_guard_id = input.actual_guard_id;
            record.replacement_guard_id = input.replacement_guard_id;
            record.status_override = input.status_override;
            record.notes = input.notes;
            reclassify(&mut record);

            Ok(attendance_repo::save(tx, &record).await?)
        })
    })
    .await?;

    log::info!(
        "Attendance record {} updated to {}",
        record.id,
        record.status
    );
    Ok(record)
}

/// Apply an in/out marking to the right row of `date`, the tenant-local day
/// the marking falls on. Returns the updated row, or `None` when the guard
/// has nothing to cover that day.
pub async fn reconcile_marking(
    tx: &mut Transaction<'_, Postgres>,
    event: &MarcacionEvent,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, AppError> {

    let target = match event.direction {
        MarkDirection::In => {
            match attendance_repo::find_guard_record(tx, event.installation_id, date, event.guard_id)
                .await?
            {
                Some(record) => Some(record),
                None => attendance_repo::find_uncovered_record(tx, event.installation_id, date).await?,
            }
        }
        MarkDirection::Out => {
            let previous_day = date.checked_sub_days(Days::new(1)).unwrap_or(date);
            match attendance_repo::find_open_check_in(
                tx,
                event.installation_id,
                event.guard_id,
                previous_day,
                date,
            )
            .await?
            {
                Some(record) => Some(record),
                None => {
                    attendance_repo::find_guard_record(tx, event.installation_id, date, event.guard_id)
                        .await?
                }
            }
        }
    };

    let Some(mut record) = target else {
        log::info!(
            "Marking {} by guard {} matched no attendance row on {}",
            event.id,
            event.guard_id,
            date
        );
        return Ok(None);
    };

    apply_marking(&mut record, event);
    Ok(Some(attendance_repo::save(tx, &record).await?))
}

/// Pure half of `reconcile_marking`.
pub fn apply_marking(record: &mut AttendanceRecord, event: &MarcacionEvent) {
    match event.direction {
        MarkDirection::In => {
            if record.check_in_at.is_none_or(|at| event.marked_at < at) {
                record.check_in_at = Some(event.marked_at);
            }
        }
        MarkDirection::Out => {
            record.check_out_at = Some(event.marked_at);
        }
    }

    if record.actual_guard_id.is_none() && record.replacement_guard_id != Some(event.guard_id) {
        record.actual_guard_id = Some(event.guard_id);
    }
    reclassify(record);
}

/// Undo what a marking set on its attendance row, if anything.
pub async fn clear_marking(
    tx: &mut Transaction<'_, Postgres>,
    event: &MarcacionEvent,
) -> Result<Option<AttendanceRecord>, AppError> {
    let Some(mut record) = attendance_repo::find_by_marking(
        tx,
        event.installation_id,
        event.guard_id,
        event.marked_at,
    )
    .await?
    else {
        return Ok(None);
    };

    remove_marking(&mut record, event);
    Ok(Some(attendance_repo::save(tx, &record).await?))
}

/// Pure half of `clear_marking`. A row left with no clock times loses the
/// actual guard the marking gave it.
pub fn remove_marking(record: &mut AttendanceRecord, event: &MarcacionEvent) {
    if record.check_in_at == Some(event.marked_at) {
        record.check_in_at = None;
    }
    if record.check_out_at == Some(event.marked_at) {
        record.check_out_at = None;
    }
    if record.check_in_at.is_none()
        && record.check_out_at.is_none()
        && record.actual_guard_id == Some(event.guard_id)
    {
        record.actual_guard_id = None;
    }
    reclassify(record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::MarkMethod;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn record(planned: Option<Uuid>) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            installation_id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            planned_guard_id: planned,
            actual_guard_id: None,
            replacement_guard_id: None,
            status: classify(planned, None, None, None),
            status_override: None,
            check_in_at: None,
            check_out_at: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn event(guard: Uuid, direction: MarkDirection, hour: u32) -> MarcacionEvent {
        MarcacionEvent {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            guard_id: guard,
            installation_id: Uuid::new_v4(),
            direction,
            marked_at: Utc.with_ymd_and_hms(2025, 6, 2, hour, 0, 0).unwrap(),
            latitude: None,
            longitude: None,
            geo_validated: false,
            geo_distance_m: None,
            integrity_hash: String::new(),
            method: MarkMethod::SelfService,
            created_by: None,
            note: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_classify_precedence() {
        let a = Some(Uuid::new_v4());
        let b = Some(Uuid::new_v4());

        assert_eq!(classify(None, None, None, None), AttendanceStatus::OpenPost);
        assert_eq!(classify(a, None, None, None), AttendanceStatus::Pending);
        assert_eq!(classify(a, a, None, None), AttendanceStatus::Attended);
        assert_eq!(classify(None, b, None, None), AttendanceStatus::Attended);
        assert_eq!(classify(a, None, b, None), AttendanceStatus::Replaced);
        assert_eq!(classify(a, a, b, None), AttendanceStatus::Replaced);
        assert_eq!(
            classify(a, a, None, Some(AttendanceStatus::Absent)),
            AttendanceStatus::Absent
        );
    }

    #[test]
    fn test_open_post_queue_membership() {
        let guard = Uuid::new_v4();

        assert!(needs_dispatch(&record(None)));
        assert!(needs_dispatch(&record(Some(guard))));

        let mut attended = record(Some(guard));
        attended.actual_guard_id = Some(guard);
        reclassify(&mut attended);
        assert!(!needs_dispatch(&attended));

        let mut absent = attended.clone();
        absent.status_override = Some(AttendanceStatus::Absent);
        reclassify(&mut absent);
        assert!(needs_dispatch(&absent));
    }

    #[test]
    fn test_check_in_then_out_marks_attended() {
        let guard = Uuid::new_v4();
        let mut row = record(Some(guard));

        apply_marking(&mut row, &event(guard, MarkDirection::In, 8));
        assert_eq!(row.status, AttendanceStatus::Attended);
        assert_eq!(row.actual_guard_id, Some(guard));

        apply_marking(&mut row, &event(guard, MarkDirection::Out, 20));
        assert_eq!(
            row.check_out_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 2, 20, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unplanned_guard_covers_open_post() {
        let guard = Uuid::new_v4();
        let mut row = record(None);
        assert_eq!(row.status, AttendanceStatus::OpenPost);

        apply_marking(&mut row, &event(guard, MarkDirection::In, 8));
        assert_eq!(row.status, AttendanceStatus::Attended);
    }

    #[test]
    fn test_earliest_check_in_wins() {
        let guard = Uuid::new_v4();
        let mut row = record(Some(guard));

        apply_marking(&mut row, &event(guard, MarkDirection::In, 9));
        apply_marking(&mut row, &event(guard, MarkDirection::In, 8));
        apply_marking(&mut row, &event(guard, MarkDirection::In, 10));

        assert_eq!(
            row.check_in_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_removing_only_marking_restores_pending() {
        let guard = Uuid::new_v4();
        let mut row = record(Some(guard));
        let check_in = event(guard, MarkDirection::In, 8);

        apply_marking(&mut row, &check_in);
        remove_marking(&mut row, &check_in);

        assert_eq!(row.check_in_at, None);
        assert_eq!(row.actual_guard_id, None);
        assert_eq!(row.status, AttendanceStatus::Pending);
    }

    #[test]
    fn test_join_overtime_groups_by_post() {
        let guard = Uuid::new_v4();
        let base = record(Some(guard));
        let row = AttendanceRow {
            record: base.clone(),
            post_name: "Portería".to_string(),
            planned_guard_name: Some("Ana Soto".to_string()),
            actual_guard_name: None,
            replacement_guard_name: None,
        };
        let shift = OvertimeShift {
            id: Uuid::new_v4(),
            tenant_id: base.tenant_id,
            guard_id: guard,
            post_id: base.post_id,
            installation_id: base.installation_id,
            date: base.date,
            amount: bigdecimal::BigDecimal::from(42_000),
            status: crate::database::models::OvertimeStatus::Pending,
            rejection_reason: None,
            notes: None,
            created_by: None,
            approved_at: None,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let mut other = shift.clone();
        other.post_id = Uuid::new_v4();

        let days = join_overtime(vec![row], vec![shift, other]);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].overtime_shifts.len(), 1);
    }
}
