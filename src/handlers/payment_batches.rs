use actix_web::{HttpResponse, http::header, web};
use uuid::Uuid;

use crate::database::models::CreateBatchInput;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{Claims, overtime};

pub async fn create_batch(
    claims: Claims,
    input: web::Json<CreateBatchInput>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let detail =
        overtime::create_batch(claims.tenant_id, claims.user_id(), input.into_inner()).await?;
    Ok(ApiResponse::created(detail))
}

pub async fn list_batches(claims: Claims) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    Ok(ApiResponse::ok(overtime::list_batches(claims.tenant_id).await?))
}

pub async fn get_batch(claims: Claims, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let detail = overtime::get_batch(claims.tenant_id, path.into_inner()).await?;
    Ok(ApiResponse::ok(detail))
}

/// The bank file, as a download named after the batch code.
pub async fn export(claims: Claims, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let (code, csv) = overtime::export_bank_file(claims.tenant_id, path.into_inner()).await?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.csv\"", code),
        ))
        .body(csv))
}

pub async fn mark_exported(
    claims: Claims,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let batch = overtime::mark_exported(claims.tenant_id, path.into_inner()).await?;
    Ok(ApiResponse::ok(batch))
}

pub async fn mark_paid(claims: Claims, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let detail = overtime::mark_paid(claims.tenant_id, path.into_inner()).await?;
    Ok(ApiResponse::ok(detail))
}
