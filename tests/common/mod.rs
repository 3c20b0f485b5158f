#![allow(dead_code)]

use std::sync::Arc;

use actix_web::web;
use chrono::Duration;
use uuid::Uuid;

use guardops::Config;
use guardops::database::models::Role;
use guardops::services::auth::issue_token;
use guardops::{LogNotificationSender, NotificationSender};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-key-that-is-long-enough";

pub fn setup_test_env() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn test_config() -> Config {
    Config {
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://@localhost:5432/guardops_test".to_string()),
        database_max_connections: 5,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        notification_sweep_interval_secs: 0,
    }
}

pub fn config_data() -> web::Data<Config> {
    web::Data::new(test_config())
}

pub fn sender_data() -> web::Data<dyn NotificationSender> {
    let sender: Arc<dyn NotificationSender> = Arc::new(LogNotificationSender);
    web::Data::from(sender)
}

pub fn bearer(role: Role) -> String {
    let token = issue_token(
        TEST_JWT_SECRET,
        Uuid::new_v4(),
        Uuid::new_v4(),
        role,
        Duration::hours(1),
    )
    .unwrap();
    format!("Bearer {}", token)
}
