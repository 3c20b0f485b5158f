use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::database::models::{AttendanceDayQuery, AttendanceUpdateInput, OpenPostsQuery};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{Claims, attendance};

pub async fn list_day(
    claims: Claims,
    query: web::Query<AttendanceDayQuery>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let AttendanceDayQuery {
        installation_id,
        date,
    } = query.into_inner();
    let days = attendance::list_day(claims.tenant_id, installation_id, date).await?;
    Ok(ApiResponse::ok(days))
}

pub async fn list_open_posts(
    claims: Claims,
    query: web::Query<OpenPostsQuery>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let OpenPostsQuery {
        date,
        installation_id,
    } = query.into_inner();
    let rows = attendance::list_open_posts(claims.tenant_id, date, installation_id).await?;
    Ok(ApiResponse::ok(rows))
}

pub async fn update_record(
    claims: Claims,
    path: web::Path<Uuid>,
    input: web::Json<AttendanceUpdateInput>,
) -> Result<HttpResponse, AppError> {
    claims.requires_supervisor()?;
    let record =
        attendance::update_record(claims.tenant_id, path.into_inner(), input.into_inner()).await?;
    log::info!(
        "Attendance record {} updated by {}",
        record.id,
        claims.user_id()
    );
    Ok(ApiResponse::ok(record))
}
