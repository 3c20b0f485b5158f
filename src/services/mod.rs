pub mod attendance;
pub mod auth;
pub mod bank_export;
pub mod credentials;
pub mod guards;
pub mod installations;
pub mod integrity;
pub mod marcacion;
pub mod notifications;
pub mod overtime;
pub mod settings;
pub mod staff_plan;

pub use auth::Claims;
