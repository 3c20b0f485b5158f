use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::GuardInput;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{Claims, credentials, guards};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardFlagsRequest {
    pub active: bool,
    pub blacklisted: bool,
}

pub async fn create_guard(
    claims: Claims,
    input: web::Json<GuardInput>,
) -> Result<HttpResponse, AppError> {
    claims.requires_admin()?;
    let guard = guards::create_guard(claims.tenant_id, input.into_inner()).await?;
    Ok(ApiResponse::created(guard))
}

pub async fn list_guards(claims: Claims) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    Ok(ApiResponse::ok(guards::list_guards(claims.tenant_id).await?))
}

pub async fn update_flags(
    claims: Claims,
    path: web::Path<Uuid>,
    input: web::Json<GuardFlagsRequest>,
) -> Result<HttpResponse, AppError> {
    claims.requires_admin()?;
    let guard = guards::set_flags(
        claims.tenant_id,
        path.into_inner(),
        input.active,
        input.blacklisted,
    )
    .await?;
    Ok(ApiResponse::ok(guard))
}

/// Issue or reset the marking PIN. The plaintext is in this response only.
pub async fn issue_pin(claims: Claims, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let issued = credentials::issue_or_reset_pin(claims.tenant_id, path.into_inner()).await?;
    log::info!(
        "PIN issued for guard {} by {}",
        issued.guard_id,
        claims.user_id()
    );
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(issued),
        "Share this PIN with the guard now; it cannot be shown again",
    )))
}

pub async fn pin_status(claims: Claims, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let status = credentials::pin_status(claims.tenant_id, path.into_inner()).await?;
    Ok(ApiResponse::ok(status))
}
