pub mod attendance;
pub mod auth;
pub mod credential;
pub mod guard;
pub mod installation;
mod macros;
pub mod marcacion;
pub mod notification;
pub mod overtime;
pub mod plan;
pub mod settings;

// Re-export all models for easy importing
pub use attendance::*;
pub use auth::*;
pub use credential::*;
pub use guard::*;
pub use installation::*;
pub use marcacion::*;
pub use notification::*;
pub use overtime::*;
pub use plan::*;
pub use settings::*;
