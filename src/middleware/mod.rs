pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{CredentialThrottle, MarkingRateLimiter, RateLimitConfig, RateLimitMiddleware};
pub use request_id::{CorrelationId, RequestIdExt, RequestIdMiddleware};
