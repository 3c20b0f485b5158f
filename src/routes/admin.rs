use actix_web::web;

use crate::handlers::{guards, installations};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/installations")
            .route("", web::post().to(installations::create_installation))
            .route("", web::get().to(installations::list_installations))
            .route(
                "/{id}/rotate-code",
                web::post().to(installations::rotate_code),
            )
            .route("/{id}/posts", web::get().to(installations::list_posts)),
    )
    .service(
        web::scope("/posts")
            .route("", web::post().to(installations::create_post))
            .route("/{id}", web::delete().to(installations::deactivate_post)),
    )
    .service(
        web::scope("/guards")
            .route("", web::post().to(guards::create_guard))
            .route("", web::get().to(guards::list_guards))
            .route("/{id}/flags", web::put().to(guards::update_flags))
            .route("/{id}/pin", web::post().to(guards::issue_pin))
            .route("/{id}/pin", web::get().to(guards::pin_status)),
    );
}
