use actix_web::web;

use crate::handlers::notifications;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/notifications/sweep",
        web::post().to(notifications::sweep),
    );
}
