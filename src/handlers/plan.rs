use actix_web::{HttpResponse, web};

use crate::database::models::{GeneratePlanInput, PlanMonthQuery, PlanUpsertItem};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{Claims, staff_plan};

pub async fn generate(
    claims: Claims,
    input: web::Json<GeneratePlanInput>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let result = staff_plan::generate(claims.tenant_id, input.into_inner()).await?;
    Ok(ApiResponse::ok(result))
}

pub async fn bulk_upsert(
    claims: Claims,
    input: web::Json<Vec<PlanUpsertItem>>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let updated = staff_plan::bulk_upsert(claims.tenant_id, input.into_inner()).await?;
    Ok(ApiResponse::ok(serde_json::json!({ "updated": updated })))
}

pub async fn list_month(
    claims: Claims,
    query: web::Query<PlanMonthQuery>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let entries = staff_plan::list_month(claims.tenant_id, query.into_inner()).await?;
    Ok(ApiResponse::ok(entries))
}
