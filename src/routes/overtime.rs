use actix_web::web;

use crate::handlers::{overtime, payment_batches};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/overtime")
            .route("", web::post().to(overtime::create_shift))
            .route("", web::get().to(overtime::list_shifts))
            .route("/{id}/approve", web::post().to(overtime::approve))
            .route("/{id}/reject", web::post().to(overtime::reject)),
    )
    .service(
        web::scope("/payment-batches")
            .route("", web::post().to(payment_batches::create_batch))
            .route("", web::get().to(payment_batches::list_batches))
            .route("/{id}", web::get().to(payment_batches::get_batch))
            .route("/{id}/export", web::get().to(payment_batches::export))
            .route(
                "/{id}/exported",
                web::post().to(payment_batches::mark_exported),
            )
            .route("/{id}/paid", web::post().to(payment_batches::mark_paid)),
    );
}
