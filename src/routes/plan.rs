use actix_web::web;

use crate::handlers::plan;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/plan")
            .route("", web::get().to(plan::list_month))
            .route("/generate", web::post().to(plan::generate))
            .route("/bulk", web::put().to(plan::bulk_upsert)),
    );
}
