use actix_web::web;

use crate::handlers::marcacion;
use crate::middleware::MarkingRateLimiter;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/marcacion")
            .app_data(web::Data::new(MarkingRateLimiter::credentials()))
            // public, PIN-gated
            .service(
                web::resource("/mark")
                    .wrap(MarkingRateLimiter::per_ip())
                    .route(web::post().to(marcacion::mark)),
            )
            .service(
                web::resource("/events")
                    .wrap(MarkingRateLimiter::per_ip())
                    .route(web::get().to(marcacion::own_events)),
            )
            // supervisor
            .route("/manual", web::post().to(marcacion::manual_mark))
            .route("/{id}", web::delete().to(marcacion::reset_manual_mark))
            .route("/{id}/verify", web::get().to(marcacion::verify)),
    );
}
