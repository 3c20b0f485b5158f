use actix_web::web;

use crate::handlers::attendance;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attendance")
            .route("", web::get().to(attendance::list_day))
            .route("/open-posts", web::get().to(attendance::list_open_posts))
            .route("/{id}", web::put().to(attendance::update_record)),
    );
}
