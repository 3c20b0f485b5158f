pub mod attendance;
pub mod credential;
pub mod guard;
pub mod installation;
pub mod marcacion;
pub mod notification;
pub mod overtime;
pub mod payment_batch;
pub mod plan;
pub mod settings;
