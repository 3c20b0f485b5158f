use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TIMEZONE: &str = "America/Santiago";

pub const DEFAULT_LEGAL_DISCLOSURE: &str = "Se registró una marcación manual a su nombre. \
Si no está de acuerdo con la corrección, puede objetarla ante su empleador dentro del plazo indicado.";

/// Tenant-scoped attendance settings. Stored as one JSON document; any key
/// missing from the stored document takes the default below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantSettings {
    pub version: u32,
    /// IANA zone the tenant operates in; attendance days are local days.
    pub timezone: String,
    pub late_tolerance_minutes: u32,
    /// 0 means installation codes never rotate.
    pub code_rotation_hours: u32,
    pub correction_dispute_window_hours: u32,
    pub notify_on_manual_mark: bool,
    pub notify_on_correction: bool,
    /// 0 sends the manual-marking disclosure on the next sweep.
    pub manual_mark_notification_delay_minutes: u32,
    pub legal_disclosure_text: String,
    pub round_polling_interval_seconds: u32,
    pub round_start_tolerance_before_minutes: u32,
    pub round_start_tolerance_after_minutes: u32,
    pub require_photo_evidence: bool,
    pub allow_replacements: bool,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            version: 1,
            timezone: DEFAULT_TIMEZONE.to_string(),
            late_tolerance_minutes: 15,
            code_rotation_hours: 0,
            correction_dispute_window_hours: 48,
            notify_on_manual_mark: true,
            notify_on_correction: true,
            manual_mark_notification_delay_minutes: 0,
            legal_disclosure_text: DEFAULT_LEGAL_DISCLOSURE.to_string(),
            round_polling_interval_seconds: 60,
            round_start_tolerance_before_minutes: 15,
            round_start_tolerance_after_minutes: 30,
            require_photo_evidence: false,
            allow_replacements: true,
        }
    }
}

impl TenantSettings {
    /// Overlay a partial document on the defaults. Unknown keys are dropped;
    /// known keys with the wrong JSON type are rejected.
    pub fn merge_with_defaults(partial: &Value) -> Result<Self, String> {
        let mut merged = serde_json::to_value(Self::default()).map_err(|e| e.to_string())?;

        match partial {
            Value::Null => {}
            Value::Object(fields) => {
                if let Value::Object(target) = &mut merged {
                    for (key, value) in fields {
                        if target.contains_key(key) && !value.is_null() {
                            target.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            _ => return Err("Settings must be a JSON object".to_string()),
        }

        let settings: Self =
            serde_json::from_value(merged).map_err(|e| format!("Invalid settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| format!("Invalid timezone {:?}: {}", self.timezone, e))?;
        if self.legal_disclosure_text.trim().is_empty() {
            return Err("legalDisclosureText cannot be empty".to_string());
        }
        if self.round_polling_interval_seconds == 0 {
            return Err("roundPollingIntervalSeconds must be positive".to_string());
        }
        Ok(())
    }

    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }

    /// The post-day an instant belongs to, in the tenant's local time.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.tz()).date_naive()
    }

    /// Whether a marking code last rotated at `rotated_at` is past its
    /// lifetime at `now`. Never true when rotation is disabled.
    pub fn code_expired(&self, rotated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.code_rotation_hours > 0
            && now - rotated_at > Duration::hours(i64::from(self.code_rotation_hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_empty_document_yields_defaults() {
        let settings = TenantSettings::merge_with_defaults(&json!({})).unwrap();
        assert_eq!(settings, TenantSettings::default());

        let settings = TenantSettings::merge_with_defaults(&Value::Null).unwrap();
        assert_eq!(settings, TenantSettings::default());
    }

    #[test]
    fn test_partial_document_overrides_only_given_keys() {
        let settings = TenantSettings::merge_with_defaults(&json!({
            "manualMarkNotificationDelayMinutes": 30,
            "notifyOnManualMark": false,
            "somethingElse": "ignored"
        }))
        .unwrap();

        assert_eq!(settings.manual_mark_notification_delay_minutes, 30);
        assert!(!settings.notify_on_manual_mark);
        assert_eq!(settings.late_tolerance_minutes, 15);
        assert_eq!(settings.legal_disclosure_text, DEFAULT_LEGAL_DISCLOSURE);
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let result = TenantSettings::merge_with_defaults(&json!({
            "lateToleranceMinutes": "fifteen"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(TenantSettings::merge_with_defaults(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let result = TenantSettings::merge_with_defaults(&json!({ "timezone": "Mars/Olympus" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_late_evening_instant_maps_to_the_local_day() {
        use chrono::TimeZone;

        let settings = TenantSettings::default();
        // 21:00 on 2 June in Santiago (UTC-4) is 01:00 UTC on 3 June.
        let at = Utc.with_ymd_and_hms(2025, 6, 3, 1, 0, 0).unwrap();

        assert_eq!(settings.local_date(at), NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());

        let utc = TenantSettings {
            timezone: "UTC".to_string(),
            ..TenantSettings::default()
        };
        assert_eq!(utc.local_date(at), NaiveDate::from_ymd_opt(2025, 6, 3).unwrap());
    }

    #[test]
    fn test_code_expiry_follows_rotation_hours() {
        let now = Utc::now();
        let rotated = now - Duration::hours(25);

        assert!(!TenantSettings::default().code_expired(rotated, now));

        let daily = TenantSettings {
            code_rotation_hours: 24,
            ..TenantSettings::default()
        };
        assert!(daily.code_expired(rotated, now));
        assert!(!daily.code_expired(now - Duration::hours(23), now));
    }

    #[test]
    fn test_blank_disclosure_is_rejected() {
        let result = TenantSettings::merge_with_defaults(&json!({ "legalDisclosureText": "  " }));
        assert!(result.is_err());
    }
}
