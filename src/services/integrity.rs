use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::database::models::{MarcacionEvent, MarkDirection, MarkMethod};

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const SHORT_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const SHORT_CODE_LEN: usize = 6;
const HASH_PREVIEW_LEN: usize = 12;

/// Every field the integrity digest covers, in digest order.
#[derive(Debug, Clone, Copy)]
pub struct IntegrityFields {
    pub guard_id: Uuid,
    pub installation_id: Uuid,
    pub direction: MarkDirection,
    pub marked_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub method: MarkMethod,
    pub tenant_id: Uuid,
}

impl From<&MarcacionEvent> for IntegrityFields {
    fn from(event: &MarcacionEvent) -> Self {
        Self {
            guard_id: event.guard_id,
            installation_id: event.installation_id,
            direction: event.direction,
            marked_at: event.marked_at,
            latitude: event.latitude,
            longitude: event.longitude,
            method: event.method,
            tenant_id: event.tenant_id,
        }
    }
}

/// Truncate to the precision Postgres stores, so a digest computed before
/// insert can be reproduced from the persisted row.
pub fn normalize_timestamp(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

fn coordinate(value: Option<f64>) -> String {
    value.map_or_else(|| "null".to_string(), |v| v.to_string())
}

/// Hex SHA-256 over the `|`-joined fields.
pub fn compute_integrity_hash(fields: &IntegrityFields) -> String {
    let canonical = [
        fields.guard_id.to_string(),
        fields.installation_id.to_string(),
        fields.direction.as_str().to_string(),
        normalize_timestamp(fields.marked_at).to_rfc3339_opts(SecondsFormat::Micros, true),
        coordinate(fields.latitude),
        coordinate(fields.longitude),
        fields.method.as_str().to_string(),
        fields.tenant_id.to_string(),
    ]
    .join("|");

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Great-circle distance in meters.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Installation marking code; no 0/O/1/I so it can be read aloud.
pub fn generate_short_code() -> String {
    let mut rng = rand::rng();

    (0..SHORT_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..SHORT_CODE_ALPHABET.len());
            SHORT_CODE_ALPHABET[idx] as char
        })
        .collect()
}

pub fn generate_pin() -> String {
    let value: u16 = rand::rng().random_range(0..10_000);
    format!("{:04}", value)
}

pub fn truncate_hash(hash: &str) -> String {
    let preview: String = hash.chars().take(HASH_PREVIEW_LEN).collect();
    format!("{}…", preview)
}
