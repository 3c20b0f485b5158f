use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::database::models::{OvertimeQuery, OvertimeShiftInput, RejectOvertimeRequest};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{Claims, overtime};

pub async fn create_shift(
    claims: Claims,
    input: web::Json<OvertimeShiftInput>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let shift =
        overtime::create_shift(claims.tenant_id, claims.user_id(), input.into_inner()).await?;
    Ok(ApiResponse::created(shift))
}

pub async fn list_shifts(
    claims: Claims,
    query: web::Query<OvertimeQuery>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let shifts = overtime::list_shifts(claims.tenant_id, query.into_inner()).await?;
    Ok(ApiResponse::ok(shifts))
}

pub async fn approve(claims: Claims, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let shift = overtime::approve(claims.tenant_id, path.into_inner()).await?;
    Ok(ApiResponse::ok(shift))
}

pub async fn reject(
    claims: Claims,
    path: web::Path<Uuid>,
    input: Option<web::Json<RejectOvertimeRequest>>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let reason = input.and_then(|body| body.into_inner().reason);
    let shift = overtime::reject(claims.tenant_id, path.into_inner(), reason).await?;
    Ok(ApiResponse::ok(shift))
}
