use bigdecimal::{BigDecimal, Zero};
use uuid::Uuid;

use crate::database::{
    models::{Installation, InstallationInput, Post, PostInput, parse_weekdays},
    repositories::installation as installation_repo,
    transaction::DatabaseTransaction,
};
use crate::error::AppError;
use crate::services::integrity::generate_short_code;

const CODE_ATTEMPTS: usize = 5;

pub fn validate_installation(input: &InstallationInput) -> Result<(), AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::validation("Installation name is required"));
    }
    if input.latitude.is_some() != input.longitude.is_some() {
        return Err(AppError::validation(
            "Latitude and longitude must be given together",
        ));
    }
    if let Some(lat) = input.latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::validation("Latitude out of range"));
        }
    }
    if let Some(lng) = input.longitude {
        if !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::validation("Longitude out of range"));
        }
    }
    if input.geofence_radius_m.is_some_and(|r| r <= 0.0) {
        return Err(AppError::validation("Geofence radius must be positive"));
    }
    Ok(())
}

/// Create the installation with a fresh marking code, drawing again if the
/// code collides with an existing one.
pub async fn create_installation(
    tenant_id: Uuid,
    input: InstallationInput,
) -> Result<Installation, AppError> {
    validate_installation(&input)?;

    for attempt in 1..=CODE_ATTEMPTS {
        let code = generate_short_code();
        let input = input.clone();

        let result = DatabaseTransaction::run(move |tx| {
            Box::pin(async move {
                Ok(installation_repo::create_installation(tx, tenant_id, &input, &code).await?)
            })
        })
        .await;

        match result {
            Ok(installation) => {
                log::info!(
                    "Installation {} created with code {}",
                    installation.id,
                    installation.code
                );
                return Ok(installation);
            }
            Err(AppError::Conflict(_)) => {
                log::warn!("Marking code collision (attempt {})", attempt);
            }
            Err(e) => return Err(e),
        }
    }

    Err(AppError::internal_server_error_message(
        "Could not allocate a unique marking code",
    ))
}

pub async fn list_installations(tenant_id: Uuid) -> Result<Vec<Installation>, AppError> {
    Ok(installation_repo::list_installations(tenant_id).await?)
}

/// Replace the marking code; the old code stops working immediately.
pub async fn rotate_code(tenant_id: Uuid, id: Uuid) -> Result<Installation, AppError> {
    for attempt in 1..=CODE_ATTEMPTS {
        match installation_repo::update_code(tenant_id, id, &generate_short_code()).await {
            Ok(Some(installation)) => {
                log::info!("Installation {} marking code rotated", installation.id);
                return Ok(installation);
            }
            Ok(None) => {
                return Err(AppError::not_found(format!("Installation {} not found", id)));
            }
            Err(e) => match AppError::from(e) {
                AppError::Conflict(_) => {
                    log::warn!("Marking code collision on rotation (attempt {})", attempt)
                }
                other => return Err(other),
            },
        }
    }

    Err(AppError::internal_server_error_message(
        "Could not allocate a unique marking code",
    ))
}

pub async fn create_post(tenant_id: Uuid, input: PostInput) -> Result<Post, AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::validation("Post name is required"));
    }
    if input.required_guards.is_some_and(|n| n < 1) {
        return Err(AppError::validation("requiredGuards must be at least 1"));
    }
    if input.overtime_rate < BigDecimal::zero() {
        return Err(AppError::validation("overtimeRate cannot be negative"));
    }
    let weekdays = parse_weekdays(&input.active_weekdays).map_err(AppError::Validation)?;

    installation_repo::find_by_id(tenant_id, input.installation_id)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("Installation {} not found", input.installation_id))
        })?;

    let post = DatabaseTransaction::run(move |tx| {
        Box::pin(async move {
            Ok(installation_repo::create_post(tx, tenant_id, &input, &weekdays).await?)
        })
    })
    .await?;

    log::info!("Post {} created at installation {}", post.id, post.installation_id);
    Ok(post)
}

pub async fn list_posts(tenant_id: Uuid, installation_id: Uuid) -> Result<Vec<Post>, AppError> {
    Ok(installation_repo::list_posts(tenant_id, installation_id).await?)
}

pub async fn deactivate_post(tenant_id: Uuid, id: Uuid) -> Result<Post, AppError> {
    let post = installation_repo::set_post_active(tenant_id, id, false)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Post {} not found", id)))?;

    log::info!("Post {} deactivated", post.id);
    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> InstallationInput {
        InstallationInput {
            name: "Centro de distribución".to_string(),
            address: None,
            latitude: Some(-33.45),
            longitude: Some(-70.66),
            geofence_radius_m: None,
        }
    }

    #[test]
    fn test_valid_installation_passes() {
        assert!(validate_installation(&input()).is_ok());
    }

    #[test]
    fn test_half_coordinates_are_rejected() {
        let half = InstallationInput {
            longitude: None,
            ..input()
        };
        assert!(matches!(
            validate_installation(&half),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_out_of_range_and_radius_are_rejected() {
        let bad_lat = InstallationInput {
            latitude: Some(91.0),
            ..input()
        };
        let bad_radius = InstallationInput {
            geofence_radius_m: Some(0.0),
            ..input()
        };
        assert!(validate_installation(&bad_lat).is_err());
        assert!(validate_installation(&bad_radius).is_err());
    }
}
