use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::database::models::{InstallationInput, PostInput};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{Claims, installations};

pub async fn create_installation(
    claims: Claims,
    input: web::Json<InstallationInput>,
) -> Result<HttpResponse, AppError> {
    claims.requires_admin()?;
    let installation =
        installations::create_installation(claims.tenant_id, input.into_inner()).await?;
    Ok(ApiResponse::created(installation))
}

pub async fn list_installations(claims: Claims) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    Ok(ApiResponse::ok(
        installations::list_installations(claims.tenant_id).await?,
    ))
}

pub async fn rotate_code(claims: Claims, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    claims.requires_admin()?;
    let installation = installations::rotate_code(claims.tenant_id, path.into_inner()).await?;
    Ok(ApiResponse::ok(installation))
}

pub async fn list_posts(claims: Claims, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    Ok(ApiResponse::ok(
        installations::list_posts(claims.tenant_id, path.into_inner()).await?,
    ))
}

pub async fn create_post(
    claims: Claims,
    input: web::Json<PostInput>,
) -> Result<HttpResponse, AppError> {
    claims.requires_admin()?;
    let post = installations::create_post(claims.tenant_id, input.into_inner()).await?;
    Ok(ApiResponse::created(post))
}

pub async fn deactivate_post(
    claims: Claims,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    claims.requires_admin()?;
    let post = installations::deactivate_post(claims.tenant_id, path.into_inner()).await?;
    Ok(ApiResponse::ok(post))
}
