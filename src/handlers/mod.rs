pub mod attendance;
pub mod guards;
pub mod health;
pub mod installations;
pub mod marcacion;
pub mod notifications;
pub mod overtime;
pub mod payment_batches;
pub mod plan;
pub mod settings;
pub mod shared;
