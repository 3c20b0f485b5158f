use actix_web::{HttpRequest, HttpResponse, web};
use uuid::Uuid;

use crate::database::models::{ManualMarkInput, MarkRequest, OwnEventsQuery};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::middleware::{CredentialThrottle, RequestIdExt};
use crate::services::{Claims, marcacion};

// Public: authenticated by installation code, RUT and PIN, not by session.
pub async fn mark(
    req: HttpRequest,
    input: web::Json<MarkRequest>,
    throttle: web::Data<CredentialThrottle>,
) -> Result<HttpResponse, AppError> {
    throttle.check(&input.code, &input.rut)?;
    let summary = marcacion::mark(input.into_inner()).await?;
    log::info!(
        "Self-service marking {} accepted (correlation_id={})",
        summary.id,
        req.correlation_id().unwrap_or_default()
    );
    Ok(ApiResponse::created(summary))
}

pub async fn own_events(
    query: web::Query<OwnEventsQuery>,
    throttle: web::Data<CredentialThrottle>,
) -> Result<HttpResponse, AppError> {
    throttle.check(&query.code, &query.rut)?;
    let events = marcacion::list_own_events(query.into_inner()).await?;
    Ok(ApiResponse::ok(events))
}

pub async fn manual_mark(
    claims: Claims,
    input: web::Json<ManualMarkInput>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let event =
        marcacion::manual_mark(claims.tenant_id, claims.user_id(), input.into_inner()).await?;
    Ok(ApiResponse::created(event))
}

pub async fn reset_manual_mark(
    claims: Claims,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let event = marcacion::reset_manual_mark(claims.tenant_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(event.id),
        "Manual marking deleted",
    )))
}

pub async fn verify(claims: Claims, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let report = marcacion::verify_event(claims.tenant_id, path.into_inner()).await?;
    Ok(ApiResponse::ok(report))
}
