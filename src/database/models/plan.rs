use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
    pub enum PlanStatus {
        #[default]
        Planned => "planned",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub installation_id: Uuid,
    pub post_id: Uuid,
    pub date: NaiveDate,
    pub guard_id: Option<Uuid>,
    pub status: PlanStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row the generator wants to exist, keyed by (post, date).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlanEntry {
    pub installation_id: Uuid,
    pub post_id: Uuid,
    pub date: NaiveDate,
    pub guard_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanInput {
    pub installation_id: Uuid,
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub overwrite: bool,
    pub default_guard_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanResult {
    pub created: u64,
    pub skipped: u64,
    pub deleted: u64,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanUpsertItem {
    pub post_id: Uuid,
    pub date: NaiveDate,
    pub guard_id: Option<Uuid>,
    pub status: Option<PlanStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMonthQuery {
    pub installation_id: Uuid,
    pub year: i32,
    pub month: u32,
}
