use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{NewPendingNotification, PendingNotification, SweepReport},
    repositories::{marcacion as marcacion_repo, notification as notification_repo},
};
use crate::error::AppError;

const CLAIM_LEASE_SECS: i64 = 120;
const CLAIM_BATCH_SIZE: i64 = 100;

/// Outbound email/SMS transport. Failures are reported as
/// `AppError::DependencyFailure` and retried on the next sweep.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &PendingNotification) -> Result<(), AppError>;
}

/// Durable side of the scheduler.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Up to `CLAIM_BATCH_SIZE` due rows not listed in `exclude`, leased to
    /// this caller so no concurrent sweep sees them.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        exclude: &[Uuid],
    ) -> Result<Vec<PendingNotification>, AppError>;
    async fn event_exists(&self, event_id: Uuid) -> Result<bool, AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
    async fn release_failed(&self, id: Uuid, error: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct PgNotificationStore;

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        exclude: &[Uuid],
    ) -> Result<Vec<PendingNotification>, AppError> {
        let lease_until = now + Duration::seconds(CLAIM_LEASE_SECS);
        Ok(notification_repo::claim_due(now, lease_until, CLAIM_BATCH_SIZE, exclude).await?)
    }

    async fn event_exists(&self, event_id: Uuid) -> Result<bool, AppError> {
        Ok(marcacion_repo::exists(event_id).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        Ok(notification_repo::delete(id).await?)
    }

    async fn release_failed(&self, id: Uuid, error: &str) -> Result<(), AppError> {
        Ok(notification_repo::release_failed(id, error).await?)
    }
}

/// Sender that only writes the notification to the log. Stands in until a
/// real email/SMS gateway is wired.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, notification: &PendingNotification) -> Result<(), AppError> {
        let recipient = notification
            .payload
            .get("email")
            .and_then(|v| v.as_str())
            .or_else(|| notification.payload.get("phone").and_then(|v| v.as_str()));

        match recipient {
            Some(recipient) => log::info!(
                "Notification {} ({}) delivered to {}",
                notification.id,
                notification.kind,
                recipient
            ),
            None => log::warn!(
                "Notification {} ({}) has no contact channel; logged only",
                notification.id,
                notification.kind
            ),
        }
        Ok(())
    }
}

pub async fn enqueue(
    tx: &mut Transaction<'_, Postgres>,
    notification: &NewPendingNotification,
) -> Result<PendingNotification, AppError> {
    let stored = notification_repo::insert(tx, notification).await?;
    log::debug!(
        "Queued {} notification {} for {}",
        stored.kind,
        stored.id,
        stored.send_after
    );
    Ok(stored)
}

/// Send everything due at `now`, one claimed batch at a time until nothing
/// due is left. A notification whose marking has since been deleted is
/// dropped unsent. A row is removed only after a successful send; a failed
/// row is not retried within the same sweep.
pub async fn sweep_due(
    store: &dyn NotificationStore,
    sender: &dyn NotificationSender,
    now: DateTime<Utc>,
) -> Result<SweepReport, AppError> {
    let mut report = SweepReport::default();
    let mut failed: Vec<Uuid> = Vec::new();

    loop {
        let due = store.claim_due(now, &failed).await?;
        if due.is_empty() {
            break;
        }
        process_batch(store, sender, due, &mut report, &mut failed).await?;
    }

    if report != SweepReport::default() {
        log::info!(
            "Notification sweep: {} sent, {} skipped, {} errored",
            report.sent,
            report.skipped,
            report.errored
        );
    }
    Ok(report)
}

async fn process_batch(
    store: &dyn NotificationStore,
    sender: &dyn NotificationSender,
    due: Vec<PendingNotification>,
    report: &mut SweepReport,
    failed: &mut Vec<Uuid>,
) -> Result<(), AppError> {
    for notification in due {
        if let Some(event_id) = notification.marcacion_event_id {
            match store.event_exists(event_id).await {
                Ok(true) => {}
                Ok(false) => {
                    store.delete(notification.id).await?;
                    log::info!(
                        "Dropped notification {}: marking {} was reset",
                        notification.id,
                        event_id
                    );
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    store.release_failed(notification.id, &e.to_string()).await?;
                    failed.push(notification.id);
                    report.errored += 1;
                    continue;
                }
            }
        }

        match sender.send(&notification).await {
            Ok(()) => {
                store.delete(notification.id).await?;
                report.sent += 1;
            }
            Err(e) => {
                log::warn!(
                    "Notification {} failed (attempt {}): {}",
                    notification.id,
                    notification.attempts + 1,
                    e
                );
                store.release_failed(notification.id, &e.to_string()).await?;
                failed.push(notification.id);
                report.errored += 1;
            }
        }
    }
    Ok(())
}

/// Periodic sweep on the runtime. The first tick fires immediately.
pub fn spawn_sweeper(
    interval_secs: u64,
    sender: Arc<dyn NotificationSender>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let store = PgNotificationStore;
        let mut interval = tokio::time::interval(StdDuration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            if let Err(e) = sweep_due(&store, sender.as_ref(), Utc::now()).await {
                log::error!("Notification sweep failed: {}", e);
            }
        }
    })
}
