use actix_web::web;

use crate::handlers::{health, shared};

pub mod admin;
pub mod attendance;
pub mod marcacion;
pub mod notifications;
pub mod overtime;
pub mod plan;
pub mod settings;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(shared::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(shared::query_error_handler))
        .route("/", web::get().to(health::root))
        .route("/health", web::get().to(health::health))
        .service(
            web::scope("/api/v1")
                .configure(marcacion::configure)
                .configure(admin::configure)
                .configure(plan::configure)
                .configure(attendance::configure)
                .configure(overtime::configure)
                .configure(settings::configure)
                .configure(notifications::configure),
        );
}
