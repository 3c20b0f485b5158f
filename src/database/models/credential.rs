use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored marking credential. The plaintext shadow column is written at
/// issuance only and is intentionally absent from this read model.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GuardCredential {
    pub guard_id: Uuid,
    pub pin_hash: String,
    pub issued_at: DateTime<Utc>,
}

/// Issuance response: the only place a plaintext PIN ever leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinIssued {
    pub guard_id: Uuid,
    pub pin: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinStatus {
    pub guard_id: Uuid,
    pub has_pin: bool,
    pub issued_at: Option<DateTime<Utc>>,
}
