use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MANUAL_MARK_DISCLOSURE: &str = "manual_mark_disclosure";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PendingNotification {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub send_after: DateTime<Utc>,
    /// Event whose continued existence is re-checked before sending.
    pub marcacion_event_id: Option<Uuid>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub claimed_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPendingNotification {
    pub tenant_id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub send_after: DateTime<Utc>,
    pub marcacion_event_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub sent: u32,
    pub skipped: u32,
    pub errored: u32,
}
