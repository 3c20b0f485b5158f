use actix_web::{HttpResponse, web};
use chrono::Utc;

use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::Claims;
use crate::services::notifications::{NotificationSender, PgNotificationStore, sweep_due};

/// On-demand sweep, for deployments that drive it from an external scheduler.
pub async fn sweep(
    claims: Claims,
    sender: web::Data<dyn NotificationSender>,
) -> Result<HttpResponse, AppError> {
    claims.requires_admin()?;
    let report = sweep_due(&PgNotificationStore, sender.get_ref(), Utc::now()).await?;
    Ok(ApiResponse::ok(report))
}
