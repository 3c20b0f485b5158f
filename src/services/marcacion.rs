use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::database::{
    models::{
        Guard, Installation, IntegrityReport, MANUAL_MARK_DISCLOSURE, ManualMarkInput,
        MarcacionEvent, MarcacionEventSummary, MarkDirection, MarkMethod, MarkRequest,
        NewMarcacionEvent, NewPendingNotification, OwnEventsQuery, TenantSettings, normalize_rut,
    },
    repositories::{
        guard as guard_repo, installation as installation_repo, marcacion as marcacion_repo,
    },
    transaction::DatabaseTransaction,
};
use crate::error::AppError;
use crate::services::{
    attendance, credentials,
    integrity::{
        IntegrityFields, compute_integrity_hash, haversine_distance, normalize_timestamp,
        truncate_hash,
    },
    notifications, settings,
};

pub const MAX_OWN_EVENTS_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceResult {
    pub validated: bool,
    pub distance_m: Option<f64>,
}

/// A marking is validated only when both sides have coordinates and the
/// distance is within the radius.
pub fn evaluate_geofence(
    installation: &Installation,
    lat: Option<f64>,
    lng: Option<f64>,
) -> GeofenceResult {
    match (installation.coordinates(), lat, lng) {
        (Some((site_lat, site_lng)), Some(lat), Some(lng)) => {
            let distance = haversine_distance(site_lat, site_lng, lat, lng);
            GeofenceResult {
                validated: distance <= installation.geofence_radius_m,
                distance_m: Some(distance),
            }
        }
        _ => GeofenceResult {
            validated: false,
            distance_m: None,
        },
    }
}

pub fn clamp_window_days(days: Option<i64>) -> i64 {
    days.unwrap_or(MAX_OWN_EVENTS_WINDOW_DAYS)
        .clamp(1, MAX_OWN_EVENTS_WINDOW_DAYS)
}

pub fn summarize(event: &MarcacionEvent) -> MarcacionEventSummary {
    MarcacionEventSummary {
        id: event.id,
        direction: event.direction,
        marked_at: event.marked_at,
        geo_validated: event.geo_validated,
        geo_distance_m: event.geo_distance_m,
        method: event.method,
        hash_preview: truncate_hash(&event.integrity_hash),
    }
}

/// Resolve the installation by code and the guard by RUT within its tenant,
/// then check the PIN. Every guard-side failure is the same error and costs
/// the same lookups and hash check.
pub async fn authenticate(
    code: &str,
    rut: &str,
    pin: &str,
) -> Result<(Installation, Guard), AppError> {
    let installation = installation_repo::find_active_by_code(code)
        .await?
        .ok_or_else(|| AppError::not_found("Installation code not found"))?;

    let tenant_settings = settings::load(installation.tenant_id).await?;
    if tenant_settings.code_expired(installation.code_rotated_at, Utc::now()) {
        log::warn!(
            "Marking rejected at {}: code older than {}h",
            installation.code,
            tenant_settings.code_rotation_hours
        );
        return Err(AppError::not_found("Installation code not found"));
    }

    let normalized = normalize_rut(rut).unwrap_or_default();
    let guard = guard_repo::find_by_rut(installation.tenant_id, &normalized)
        .await?
        .filter(Guard::is_assignable);

    let guard_id = guard.as_ref().map_or(Uuid::nil(), |g| g.id);
    let pin_ok = credentials::verify_pin(guard_id, pin).await?;

    match guard {
        Some(guard) if pin_ok => Ok((installation, guard)),
        Some(guard) => {
            log::warn!(
                "Marking rejected at {}: PIN mismatch for guard {}",
                installation.code,
                guard.id
            );
            Err(AppError::InvalidCredentials)
        }
        None => {
            log::warn!(
                "Marking rejected at {}: unknown, malformed or inactive RUT",
                installation.code
            );
            Err(AppError::InvalidCredentials)
        }
    }
}

/// Public self-service marking.
pub async fn mark(request: MarkRequest) -> Result<MarcacionEventSummary, AppError> {
    let (installation, guard) = authenticate(&request.code, &request.rut, &request.pin).await?;

    let event = record_marking(MarkingDraft {
        installation,
        guard,
        direction: request.direction,
        marked_at: Utc::now(),
        latitude: request.lat,
        longitude: request.lng,
        method: MarkMethod::SelfService,
        created_by: None,
        note: None,
    })
    .await?;

    Ok(summarize(&event))
}

/// Supervisor-entered correction; always `manual`.
pub async fn manual_mark(
    tenant_id: Uuid,
    supervisor_id: Uuid,
    input: ManualMarkInput,
) -> Result<MarcacionEvent, AppError> {
    let now = Utc::now();
    let marked_at = input.marked_at.unwrap_or(now);
    if marked_at > now {
        return Err(AppError::validation("Marking time cannot be in the future"));
    }

    let installation = installation_repo::find_by_id(tenant_id, input.installation_id)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("Installation {} not found", input.installation_id))
        })?;
    let guard = guard_repo::find_by_id(tenant_id, input.guard_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Guard {} not found", input.guard_id)))?;

    record_marking(MarkingDraft {
        installation,
        guard,
        direction: input.direction,
        marked_at,
        latitude: input.lat,
        longitude: input.lng,
        method: MarkMethod::Manual,
        created_by: Some(supervisor_id),
        note: input.note,
    })
    .await
}

/// Everything a marking needs before its digest is computed.
#[derive(Debug, Clone)]
pub struct MarkingDraft {
    pub installation: Installation,
    pub guard: Guard,
    pub direction: MarkDirection,
    pub marked_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub method: MarkMethod,
    pub created_by: Option<Uuid>,
    pub note: Option<String>,
}

impl MarkingDraft {
    /// Finalize geofence and digest. The timestamp is normalized first so
    /// the stored row reproduces the digest.
    pub fn finalize(&self) -> NewMarcacionEvent {
        let marked_at = normalize_timestamp(self.marked_at);
        let geofence = evaluate_geofence(&self.installation, self.latitude, self.longitude);

        let integrity_hash = compute_integrity_hash(&IntegrityFields {
            guard_id: self.guard.id,
            installation_id: self.installation.id,
            direction: self.direction,
            marked_at,
            latitude: self.latitude,
            longitude: self.longitude,
            method: self.method,
            tenant_id: self.installation.tenant_id,
        });

        NewMarcacionEvent {
            tenant_id: self.installation.tenant_id,
            guard_id: self.guard.id,
            installation_id: self.installation.id,
            direction: self.direction,
            marked_at,
            latitude: self.latitude,
            longitude: self.longitude,
            geo_validated: geofence.validated,
            geo_distance_m: geofence.distance_m,
            integrity_hash,
            method: self.method,
            created_by: self.created_by,
            note: self.note.clone(),
        }
    }
}

/// Disclosure sent to the guard after a supervisor marks on their behalf.
pub fn manual_mark_notification(
    draft: &MarkingDraft,
    event: &MarcacionEvent,
    settings: &TenantSettings,
) -> NewPendingNotification {
    let delay = Duration::minutes(i64::from(settings.manual_mark_notification_delay_minutes));

    NewPendingNotification {
        tenant_id: event.tenant_id,
        kind: MANUAL_MARK_DISCLOSURE.to_string(),
        payload: json!({
            "guardId": draft.guard.id,
            "guardName": draft.guard.full_name(),
            "email": draft.guard.email,
            "phone": draft.guard.phone,
            "installationName": draft.installation.name,
            "direction": event.direction,
            "markedAt": event.marked_at,
            "eventId": event.id,
            "disclosure": settings.legal_disclosure_text,
            "disputeWindowHours": settings.correction_dispute_window_hours,
        }),
        send_after: event.created_at + delay,
        marcacion_event_id: Some(event.id),
    }
}

/// Persist the event, reconcile attendance and queue the disclosure in one
/// transaction.
pub async fn record_marking(draft: MarkingDraft) -> Result<MarcacionEvent, AppError> {
    let tenant_settings = settings::load(draft.installation.tenant_id).await?;
    let new_event = draft.finalize();
    let work_date = tenant_settings.local_date(new_event.marked_at);

    let event = DatabaseTransaction::run(move |tx| {
        Box::pin(async move {
            attendance::ensure_day_tx(
                tx,
                new_event.tenant_id,
                new_event.installation_id,
                work_date,
            )
            .await?;

            let event = marcacion_repo::insert_event(tx, &new_event).await?;
            attendance::reconcile_marking(tx, &event, work_date).await?;

            if event.method == MarkMethod::Manual && tenant_settings.notify_on_manual_mark {
                let notification = manual_mark_notification(&draft, &event, &tenant_settings);
                notifications::enqueue(tx, &notification).await?;
            }
            Ok(event)
        })
    })
    .await?;

    log::info!(
        "Recorded {} {} marking {} for guard {} at installation {} (geo validated: {})",
        event.method,
        event.direction,
        event.id,
        event.guard_id,
        event.installation_id,
        event.geo_validated
    );
    Ok(event)
}

pub async fn list_own_events(query: OwnEventsQuery) -> Result<Vec<MarcacionEventSummary>, AppError> {
    let (installation, guard) = authenticate(&query.code, &query.rut, &query.pin).await?;

    let since = Utc::now() - Duration::days(clamp_window_days(query.days));
    let events = marcacion_repo::list_for_guard(guard.id, installation.id, since).await?;

    Ok(events.iter().map(summarize).collect())
}

/// Delete a manual correction and undo what it set on attendance. Any
/// disclosure still queued for it is dropped by the next sweep.
pub async fn reset_manual_mark(tenant_id: Uuid, event_id: Uuid) -> Result<MarcacionEvent, AppError> {
    let event = DatabaseTransaction::run(move |tx| {
        Box::pin(async move {
            let event = marcacion_repo::find_for_update(tx, tenant_id, event_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Marking {} not found", event_id)))?;

            if event.method != MarkMethod::Manual {
                return Err(AppError::conflict(
                    "Self-service markings are permanent and cannot be deleted",
                ));
            }

            attendance::clear_marking(tx, &event).await?;
            marcacion_repo::delete_event(tx, event.id).await?;
            Ok(event)
        })
    })
    .await?;

    log::info!(
        "Manual marking {} for guard {} was reset",
        event.id,
        event.guard_id
    );
    Ok(event)
}

pub fn integrity_report(event: &MarcacionEvent) -> IntegrityReport {
    let recomputed_hash = compute_integrity_hash(&IntegrityFields::from(event));
    IntegrityReport {
        event_id: event.id,
        valid: recomputed_hash == event.integrity_hash,
        stored_hash: event.integrity_hash.clone(),
        recomputed_hash,
    }
}

pub async fn verify_event(tenant_id: Uuid, event_id: Uuid) -> Result<IntegrityReport, AppError> {
    let event = marcacion_repo::find_by_id(tenant_id, event_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Marking {} not found", event_id)))?;

    let report = integrity_report(&event);
    if !report.valid {
        log::error!("Integrity mismatch on marking {}", event.id);
    }
    Ok(report)
}
