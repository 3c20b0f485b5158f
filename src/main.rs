use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Result;

use guardops::database::init_database;
use guardops::middleware::RequestIdMiddleware;
use guardops::services::notifications::spawn_sweeper;
use guardops::{Config, LogNotificationSender, NotificationSender, routes};

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    env_logger::init();

    let config = Config::from_env()?;
    log::info!(
        "Starting GuardOps API (environment: {})",
        config.environment
    );

    init_database(&config.database_url, config.database_max_connections).await?;
    log::info!("Database initialized");

    let sender: Arc<dyn NotificationSender> = Arc::new(LogNotificationSender);

    if config.notification_sweep_interval_secs > 0 {
        spawn_sweeper(config.notification_sweep_interval_secs, sender.clone());
        log::info!(
            "Notification sweep every {}s",
            config.notification_sweep_interval_secs
        );
    } else {
        log::info!("In-process notification sweep disabled");
    }

    let server_address = config.server_address();
    log::info!("Server starting on http://{}", server_address);

    let config_data = web::Data::new(config);
    let sender_data: web::Data<dyn NotificationSender> = web::Data::from(sender);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(sender_data.clone())
            .wrap(
                Cors::default()
                    .allowed_origin("http://localhost:3000")
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        "Authorization",
                        "Content-Type",
                        "Accept",
                        "X-Correlation-ID",
                    ])
                    .max_age(3600),
            )
            .wrap(RequestIdMiddleware)
            .wrap(Logger::new(
                r#"%a "%r" %s %b %T correlation_id=%{x-correlation-id}o"#,
            ))
            .configure(routes::configure)
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
