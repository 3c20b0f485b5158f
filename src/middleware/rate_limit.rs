use actix_web::{
    Error, HttpResponse, Result,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use chrono::{DateTime, Duration, Utc};
use futures_util::future::LocalBoxFuture;
use std::{
    collections::HashMap,
    future::{Ready, ready},
    rc::Rc,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{database::models::normalize_rut, error::AppError, handlers::shared::ApiResponse};

/// Trackers kept before expired ones are pruned on the next check.
const PRUNE_THRESHOLD: usize = 10_000;

/// Rate limit configuration
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window duration in seconds
    pub window_seconds: i64,
    /// Message to return when rate limit is exceeded
    pub message: String,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_seconds: i64) -> Self {
        Self {
            max_requests,
            window_seconds,
            message: "Rate limit exceeded. Please try again later.".to_string(),
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }
}

/// Track request counts for rate limiting
#[derive(Debug, Clone)]
struct RequestTracker {
    count: u32,
    window_start: DateTime<Utc>,
}

impl RequestTracker {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Utc::now(),
        }
    }

    fn is_expired(&self, window_seconds: i64) -> bool {
        let window_duration =
            Duration::try_seconds(window_seconds).unwrap_or(Duration::seconds(60));
        Utc::now() > self.window_start + window_duration
    }

    fn reset(&mut self) {
        self.count = 1;
        self.window_start = Utc::now();
    }
}

/// Fixed-window counters keyed by an arbitrary string (client IP, or
/// installation code plus RUT).
#[derive(Clone, Default)]
pub struct RateLimitStore {
    trackers: Arc<Mutex<HashMap<String, RequestTracker>>>,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RequestTracker>> {
        self.trackers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count one request against `key`. False once the window's budget is spent.
    pub fn check_and_update(&self, key: &str, config: &RateLimitConfig) -> bool {
        let mut trackers = self.lock();

        if trackers.len() >= PRUNE_THRESHOLD {
            trackers.retain(|_, tracker| !tracker.is_expired(config.window_seconds));
        }

        let tracker = trackers
            .entry(key.to_string())
            .or_insert_with(RequestTracker::new);

        if tracker.is_expired(config.window_seconds) {
            tracker.reset();
            true
        } else if tracker.count >= config.max_requests {
            false
        } else {
            tracker.count += 1;
            true
        }
    }
}

/// Per-client-IP rate limiting middleware. Requests without a peer address
/// pass through.
pub struct RateLimitMiddleware {
    store: RateLimitStore,
    config: RateLimitConfig,
}

impl RateLimitMiddleware {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            store: RateLimitStore::new(),
            config,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitService {
            service: Rc::new(service),
            store: self.store.clone(),
            config: self.config.clone(),
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    store: RateLimitStore,
    config: RateLimitConfig,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let store = self.store.clone();
        let config = self.config.clone();

        Box::pin(async move {
            if let Some(ip) = req.peer_addr().map(|addr| addr.ip()) {
                if !store.check_and_update(&format!("ip:{}", ip), &config) {
                    log::warn!("Rate limit exceeded for IP {} on {}", ip, req.path());
                    let response = HttpResponse::TooManyRequests()
                        .json(ApiResponse::<()>::error(&config.message));
                    return Ok(req.into_response(response).map_into_right_body());
                }
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

/// Attempt budget per installation code and RUT on the public marking
/// endpoints. Checked in the handler, once the code and RUT are parsed.
#[derive(Clone)]
pub struct CredentialThrottle {
    store: RateLimitStore,
    config: RateLimitConfig,
}

impl CredentialThrottle {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            store: RateLimitStore::new(),
            config,
        }
    }

    pub fn check(&self, code: &str, rut: &str) -> Result<(), AppError> {
        let rut = normalize_rut(rut).unwrap_or_else(|| rut.trim().to_uppercase());
        let key = format!("{}:{}", code.trim().to_uppercase(), rut);

        if self.store.check_and_update(&key, &self.config) {
            Ok(())
        } else {
            log::warn!("Marking attempts exhausted for {}", key);
            Err(AppError::RateLimited(self.config.message.clone()))
        }
    }
}

/// Presets for the PIN-gated public endpoints.
pub struct MarkingRateLimiter;

impl MarkingRateLimiter {
    /// Shift change at a site terminal puts many guards behind one address.
    pub fn per_ip() -> RateLimitMiddleware {
        RateLimitMiddleware::new(
            RateLimitConfig::new(30, 60) // 30 requests per minute
                .with_message("Too many marking requests. Please try again in a minute."),
        )
    }

    pub fn credentials() -> CredentialThrottle {
        CredentialThrottle::new(
            RateLimitConfig::new(5, 300) // 5 attempts per 5 minutes
                .with_message("Too many marking attempts. Please try again in 5 minutes."),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, web};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::net::SocketAddr;

    #[test]
    fn test_rate_limit_config() {
        let config = RateLimitConfig::new(10, 60);
        assert_eq!(config.max_requests, 10);
        assert_eq!(config.window_seconds, 60);

        let config_with_message = config.with_message("Custom message");
        assert_eq!(config_with_message.message, "Custom message");
    }

    #[test]
    fn test_rate_limit_store() {
        let store = RateLimitStore::new();
        let config = RateLimitConfig::new(2, 60);

        assert!(store.check_and_update("ip:127.0.0.1", &config));
        assert!(store.check_and_update("ip:127.0.0.1", &config));
        assert!(!store.check_and_update("ip:127.0.0.1", &config));

        // Other keys have their own budget.
        assert!(store.check_and_update("ip:10.0.0.1", &config));
    }

    #[test]
    fn test_expired_window_starts_over() {
        let store = RateLimitStore::new();
        let config = RateLimitConfig::new(1, 60);
        assert!(store.check_and_update("k", &config));
        assert!(!store.check_and_update("k", &config));

        store
            .lock()
            .entry("k".to_string())
            .and_modify(|t| t.window_start = Utc::now() - Duration::seconds(61));

        assert!(store.check_and_update("k", &config));
    }

    #[test]
    fn test_expired_trackers_are_pruned_at_threshold() {
        let store = RateLimitStore::new();
        let config = RateLimitConfig::new(5, 60);
        {
            let mut trackers = store.lock();
            for i in 0..PRUNE_THRESHOLD {
                trackers.insert(
                    format!("old:{}", i),
                    RequestTracker {
                        count: 1,
                        window_start: Utc::now() - Duration::seconds(120),
                    },
                );
            }
        }

        assert!(store.check_and_update("fresh", &config));
        assert_eq!(store.lock().len(), 1);
    }

    #[test]
    fn test_credential_budget_is_per_code_and_rut() {
        let throttle = CredentialThrottle::new(RateLimitConfig::new(3, 300));

        assert!(throttle.check("k7m3qx", "12.345.678-5").is_ok());
        assert!(throttle.check("K7M3QX", "12345678-5").is_ok());
        assert!(throttle.check("K7M3QX", "12345678-5").is_ok());
        // Same code and RUT, however they were typed.
        assert!(matches!(
            throttle.check("K7M3QX ", "12.345.678-5"),
            Err(AppError::RateLimited(_))
        ));

        assert!(throttle.check("K7M3QX", "11.111.111-1").is_ok());
        assert!(throttle.check("ABC234", "12.345.678-5").is_ok());
    }

    #[actix_web::test]
    async fn test_middleware_answers_429_once_ip_budget_is_spent() {
        let app = actix_web::test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(RateLimitConfig::new(2, 60)))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let peer: SocketAddr = "203.0.113.7:40000".parse().unwrap();

        for _ in 0..2 {
            let req = actix_web::test::TestRequest::get()
                .uri("/")
                .peer_addr(peer)
                .to_request();
            let res = actix_web::test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK);
        }

        let req = actix_web::test::TestRequest::get()
            .uri("/")
            .peer_addr(peer)
            .to_request();
        let res = actix_web::test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: Value = actix_web::test::read_body_json(res).await;
        assert_eq!(body["success"], false);

        // Another client is unaffected.
        let req = actix_web::test::TestRequest::get()
            .uri("/")
            .peer_addr("198.51.100.2:40000".parse().unwrap())
            .to_request();
        let res = actix_web::test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
