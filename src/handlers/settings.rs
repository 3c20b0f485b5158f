use actix_web::{HttpResponse, web};
use serde_json::Value;

use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{Claims, settings};

pub async fn get_settings(claims: Claims) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    Ok(ApiResponse::ok(settings::load(claims.tenant_id).await?))
}

pub async fn update_settings(
    claims: Claims,
    patch: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    claims.requires_admin()?;
    let updated = settings::update(claims.tenant_id, patch.into_inner()).await?;
    log::info!(
        "Settings for tenant {} updated to version {} by {}",
        claims.tenant_id,
        updated.version,
        claims.user_id()
    );
    Ok(ApiResponse::ok(updated))
}
