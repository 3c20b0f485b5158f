use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::future::{Ready, ready};
use uuid::Uuid;

use crate::config::Config;
use crate::database::models::Role;
use crate::error::AppError;

/// Bearer-token claims of a back-office user. Sessions are issued by the
/// identity provider; this service only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid, // user id
    pub tenant_id: Uuid,
    pub role: Role,
    pub exp: usize, // expiration time
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_supervisor_or_admin(&self) -> bool {
        matches!(self.role, Role::Supervisor | Role::Admin)
    }

    pub fn requires_supervisor(&self) -> Result<(), AppError> {
        if self.is_supervisor_or_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Supervisor or admin role required".to_string(),
            ))
        }
    }

    pub fn requires_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin role required".to_string()))
        }
    }
}

impl FromRequest for Claims {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "));

        let (Some(token), Some(config)) = (token, req.app_data::<Data<Config>>()) else {
            return ready(Err(AppError::Unauthorized));
        };

        ready(decode_token(&config.jwt_secret, token))
    }
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        log::debug!("Rejected bearer token: {}", e);
        AppError::Unauthorized
    })
}

/// Sign a token the way the identity provider does. Used by tooling and
/// tests; production sessions come from outside this service.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    tenant_id: Uuid,
    role: Role,
    ttl: Duration,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        tenant_id,
        role,
        exp: (Utc::now() + ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| AppError::internal_server_error_message(format!("Failed to sign token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_issued_token_decodes_to_same_claims() {
        let user = Uuid::new_v4();
        let tenant = Uuid::new_v4();
        let token = issue_token(SECRET, user, tenant, Role::Supervisor, Duration::hours(1)).unwrap();

        let claims = decode_token(SECRET, &token).unwrap();
        assert_eq!(claims.user_id(), user);
        assert_eq!(claims.tenant_id, tenant);
        assert_eq!(claims.role, Role::Supervisor);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = issue_token(
            SECRET,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Role::Admin,
            Duration::hours(1),
        )
        .unwrap();

        assert!(matches!(
            decode_token("other-secret", &token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let token = issue_token(
            SECRET,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Role::Admin,
            Duration::hours(-2),
        )
        .unwrap();

        assert!(matches!(
            decode_token(SECRET, &token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_role_guards() {
        let claims = |role| Claims {
            sub: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            role,
            exp: 0,
        };

        assert!(claims(Role::Admin).requires_supervisor().is_ok());
        assert!(claims(Role::Supervisor).requires_supervisor().is_ok());
        assert!(matches!(
            claims(Role::Viewer).requires_supervisor(),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            claims(Role::Supervisor).requires_admin(),
            Err(AppError::Forbidden(_))
        ));
    }
}
