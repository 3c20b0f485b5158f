use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_GEOFENCE_RADIUS_M: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    /// Short public code guards type on the marking page.
    pub code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geofence_radius_m: f64,
    pub active: bool,
    pub code_rotated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installation {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationInput {
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geofence_radius_m: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub installation_id: Uuid,
    pub name: String,
    pub shift_start: NaiveTime,
    pub shift_end: NaiveTime,
    /// Lowercase English weekday names, e.g. `["monday", "wednesday"]`.
    pub active_weekdays: Vec<String>,
    pub required_guards: i32,
    pub overtime_rate: BigDecimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_active_on(&self, weekday: Weekday) -> bool {
        let name = weekday_name(weekday);
        self.active_weekdays
            .iter()
            .any(|day| day.trim().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInput {
    pub installation_id: Uuid,
    pub name: String,
    pub shift_start: NaiveTime,
    pub shift_end: NaiveTime,
    pub active_weekdays: Vec<String>,
    pub required_guards: Option<i32>,
    pub overtime_rate: BigDecimal,
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Normalizes a list of weekday names, rejecting anything that is not one.
pub fn parse_weekdays(days: &[String]) -> Result<Vec<String>, String> {
    let mut parsed = Vec::with_capacity(days.len());
    for day in days {
        let weekday = day
            .trim()
            .parse::<Weekday>()
            .map_err(|_| format!("Invalid weekday: {}", day))?;
        let name = weekday_name(weekday).to_string();
        if !parsed.contains(&name) {
            parsed.push(name);
        }
    }
    Ok(parsed)
}
