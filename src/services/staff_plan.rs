use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::database::{
    models::{
        GeneratePlanInput, GeneratePlanResult, NewPlanEntry, PlanEntry, PlanMonthQuery,
        PlanUpsertItem, Post,
    },
    repositories::{guard as guard_repo, installation as installation_repo, plan as plan_repo},
    transaction::DatabaseTransaction,
};
use crate::error::AppError;

/// Every calendar date of the month, in order.
pub fn month_dates(year: i32, month: u32) -> Result<Vec<NaiveDate>, AppError> {
    if !(1..=12).contains(&month) {
        return Err(AppError::validation(format!(
            "Month must be between 1 and 12, got {}",
            month
        )));
    }

    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::validation(format!("Invalid year: {}", year)))?;

    Ok(first
        .iter_days()
        .take_while(|date| date.month() == month)
        .collect())
}

/// Rows for every (post, date) where the post works that weekday.
pub fn expand_month(
    posts: &[Post],
    year: i32,
    month: u32,
    default_guard_id: Option<Uuid>,
) -> Result<Vec<NewPlanEntry>, AppError> {
    let dates = month_dates(year, month)?;

    Ok(posts
        .iter()
        .filter(|post| post.active)
        .flat_map(|post| {
            dates
                .iter()
                .filter(|date| post.is_active_on(date.weekday()))
                .map(move |date| NewPlanEntry {
                    installation_id: post.installation_id,
                    post_id: post.id,
                    date: *date,
                    guard_id: default_guard_id,
                })
        })
        .collect())
}

async fn ensure_assignable_guard(tenant_id: Uuid, guard_id: Uuid) -> Result<(), AppError> {
    let guard = guard_repo::find_by_id(tenant_id, guard_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Guard {} not found", guard_id)))?;

    if !guard.is_assignable() {
        return Err(AppError::validation(format!(
            "Guard {} is inactive or blacklisted and cannot be planned",
            guard_id
        )));
    }
    Ok(())
}

pub async fn generate(
    tenant_id: Uuid,
    input: GeneratePlanInput,
) -> Result<GeneratePlanResult, AppError> {
    let GeneratePlanInput {
        installation_id,
        year,
        month,
        overwrite,
        default_guard_id,
    } = input;
    month_dates(year, month)?;

    installation_repo::find_by_id(tenant_id, installation_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Installation {} not found", installation_id)))?;

    if let Some(guard_id) = default_guard_id {
        ensure_assignable_guard(tenant_id, guard_id).await?;
    }

    let result = DatabaseTransaction::run(move |tx| {
        Box::pin(async move {
            let (from, to) = month_bounds(year, month)?;

            let deleted = if overwrite {
                plan_repo::delete_range(tx, tenant_id, installation_id, from, to).await?
            } else {
                0
            };

            let posts = installation_repo::list_active_posts(tx, tenant_id, installation_id).await?;
            let entries = expand_month(&posts, year, month, default_guard_id)?;

            if entries.is_empty() {
                return Ok(GeneratePlanResult {
                    deleted,
                    message: Some(
                        "No active posts with working weekdays in this installation".to_string(),
                    ),
                    ..Default::default()
                });
            }

            let mut result = GeneratePlanResult {
                deleted,
                ..Default::default()
            };
            for entry in &entries {
                if plan_repo::insert_if_absent(tx, tenant_id, entry).await? {
                    result.created += 1;
                } else {
                    result.skipped += 1;
                }
            }
            Ok(result)
        })
    })
    .await?;

    log::info!(
        "Generated plan for installation {} {}-{:02}: {} created, {} skipped, {} deleted",
        installation_id,
        year,
        month,
        result.created,
        result.skipped,
        result.deleted
    );

    Ok(result)
}

fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let dates = month_dates(year, month)?;
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => Ok((*first, *last)),
        _ => Err(AppError::validation("Month has no dates")),
    }
}

/// Upsert each item on its (post, date) key. A single foreign post fails
/// the whole call before anything is written.
pub async fn bulk_upsert(tenant_id: Uuid, items: Vec<PlanUpsertItem>) -> Result<u64, AppError> {
    if items.is_empty() {
        return Ok(0);
    }

    let guard_ids: HashSet<Uuid> = items.iter().filter_map(|item| item.guard_id).collect();
    for guard_id in guard_ids {
        guard_repo::find_by_id(tenant_id, guard_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Guard {} not found", guard_id)))?;
    }

    let count = DatabaseTransaction::run(move |tx| {
        Box::pin(async move {
            let mut post_ids: Vec<Uuid> = items.iter().map(|item| item.post_id).collect();
            post_ids.sort();
            post_ids.dedup();

            let owned: HashMap<Uuid, Uuid> =
                installation_repo::tenant_post_installations(tx, tenant_id, &post_ids)
                    .await?
                    .into_iter()
                    .collect();

            if let Some(foreign) = post_ids.iter().find(|id| !owned.contains_key(*id)) {
                return Err(AppError::not_found(format!("Post {} not found", foreign)));
            }

            let mut count = 0u64;
            for item in &items {
                let installation_id = owned[&item.post_id];
                plan_repo::upsert(tx, tenant_id, installation_id, item).await?;
                count += 1;
            }
            Ok(count)
        })
    })
    .await?;

    log::info!("Bulk upserted {} plan entries for tenant {}", count, tenant_id);
    Ok(count)
}

pub async fn list_month(tenant_id: Uuid, query: PlanMonthQuery) -> Result<Vec<PlanEntry>, AppError> {
    let (from, to) = month_bounds(query.year, query.month)?;

    installation_repo::find_by_id(tenant_id, query.installation_id)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("Installation {} not found", query.installation_id))
        })?;

    Ok(plan_repo::list_range(tenant_id, query.installation_id, from, to).await?)
}
