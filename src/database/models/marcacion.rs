use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum MarkDirection {
        In => "in",
        Out => "out",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum MarkMethod {
        Manual => "manual",
        SelfService => "self_service",
    }
}

/// Append-only clock event. Only manual events may ever be removed, and
/// only through the correction reset.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MarcacionEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub guard_id: Uuid,
    pub installation_id: Uuid,
    pub direction: MarkDirection,
    pub marked_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geo_validated: bool,
    pub geo_distance_m: Option<f64>,
    pub integrity_hash: String,
    pub method: MarkMethod,
    pub created_by: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMarcacionEvent {
    pub tenant_id: Uuid,
    pub guard_id: Uuid,
    pub installation_id: Uuid,
    pub direction: MarkDirection,
    pub marked_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geo_validated: bool,
    pub geo_distance_m: Option<f64>,
    pub integrity_hash: String,
    pub method: MarkMethod,
    pub created_by: Option<Uuid>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkRequest {
    pub code: String,
    pub rut: String,
    pub pin: String,
    pub direction: MarkDirection,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnEventsQuery {
    pub code: String,
    pub rut: String,
    pub pin: String,
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualMarkInput {
    pub guard_id: Uuid,
    pub installation_id: Uuid,
    pub direction: MarkDirection,
    pub marked_at: Option<DateTime<Utc>>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub note: Option<String>,
}

/// What a guard sees about their own events: never the full digest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarcacionEventSummary {
    pub id: Uuid,
    pub direction: MarkDirection,
    pub marked_at: DateTime<Utc>,
    pub geo_validated: bool,
    pub geo_distance_m: Option<f64>,
    pub method: MarkMethod,
    pub hash_preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub event_id: Uuid,
    pub stored_hash: String,
    pub recomputed_hash: String,
    pub valid: bool,
}
