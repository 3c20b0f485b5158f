use serde_json::Value;
use uuid::Uuid;

use crate::database::{models::TenantSettings, repositories::settings as settings_repo};
use crate::error::AppError;

/// Effective settings: the stored document overlaid on the defaults.
pub async fn load(tenant_id: Uuid) -> Result<TenantSettings, AppError> {
    let stored = settings_repo::find_document(tenant_id).await?;

    match stored {
        None => Ok(TenantSettings::default()),
        Some(document) => TenantSettings::merge_with_defaults(&document).or_else(|e| {
            log::error!("Stored settings for tenant {} are unreadable: {}", tenant_id, e);
            Ok(TenantSettings::default())
        }),
    }
}

/// Overlay `patch` on the current settings and persist the result with the
/// version bumped.
pub async fn update(tenant_id: Uuid, patch: Value) -> Result<TenantSettings, AppError> {
    let current = load(tenant_id).await?;
    let next = apply_patch(&current, &patch)?;

    let document = serde_json::to_value(&next)
        .map_err(|e| AppError::internal_server_error_message(e.to_string()))?;
    settings_repo::upsert_document(tenant_id, &document).await?;

    log::info!(
        "Tenant {} settings updated to version {}",
        tenant_id,
        next.version
    );
    Ok(next)
}

/// Pure merge step of `update`. A client-supplied `version` is ignored.
pub fn apply_patch(current: &TenantSettings, patch: &Value) -> Result<TenantSettings, AppError> {
    let Value::Object(fields) = patch else {
        return Err(AppError::validation("Settings must be a JSON object"));
    };

    let mut base = serde_json::to_value(current)
        .map_err(|e| AppError::internal_server_error_message(e.to_string()))?;
    if let Value::Object(target) = &mut base {
        for (key, value) in fields {
            if key != "version" {
                target.insert(key.clone(), value.clone());
            }
        }
    }

    let mut next = TenantSettings::merge_with_defaults(&base).map_err(AppError::Validation)?;
    next.version = current.version + 1;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_patch_bumps_version_and_keeps_other_keys() {
        let current = TenantSettings::default();
        let next = apply_patch(
            &current,
            &json!({ "manualMarkNotificationDelayMinutes": 30, "version": 99 }),
        )
        .unwrap();

        assert_eq!(next.version, current.version + 1);
        assert_eq!(next.manual_mark_notification_delay_minutes, 30);
        assert_eq!(next.late_tolerance_minutes, current.late_tolerance_minutes);
    }

    #[test]
    fn test_patch_rejects_wrong_types() {
        let result = apply_patch(
            &TenantSettings::default(),
            &json!({ "notifyOnManualMark": "yes" }),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_patch_must_be_an_object() {
        let result = apply_patch(&TenantSettings::default(), &json!([1, 2]));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
