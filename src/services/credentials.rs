use std::sync::LazyLock;

use bcrypt::{DEFAULT_COST, hash, verify};
use uuid::Uuid;

use crate::database::{
    models::{PinIssued, PinStatus},
    repositories::{credential as credential_repo, guard as guard_repo},
};
use crate::error::AppError;
use crate::services::integrity::generate_pin;

pub const PIN_HASH_COST: u32 = DEFAULT_COST;

/// Checked whenever there is no real hash to compare against, so a rejected
/// marking costs one bcrypt verify at `PIN_HASH_COST` on every path.
static MISS_PIN_HASH: LazyLock<String> = LazyLock::new(|| {
    hash("0000", PIN_HASH_COST).unwrap_or_else(|e| {
        log::error!("Failed to build the miss-path PIN hash: {}", e);
        String::new()
    })
});

pub fn is_well_formed_pin(candidate: &str) -> bool {
    candidate.len() == 4 && candidate.chars().all(|c| c.is_ascii_digit())
}

/// Never errors: malformed candidates and corrupt hashes simply do not match.
pub fn pin_matches(candidate: &str, pin_hash: &str) -> bool {
    is_well_formed_pin(candidate) && verify(candidate, pin_hash).unwrap_or(false)
}

/// Run `verifier` exactly once whatever the inputs: against the stored hash
/// when there is one and the candidate is well formed, otherwise against
/// `miss_hash` with the result discarded.
pub fn check_pin_with<F>(
    candidate: &str,
    stored_hash: Option<&str>,
    miss_hash: &str,
    mut verifier: F,
) -> bool
where
    F: FnMut(&str, &str) -> bool,
{
    match stored_hash {
        Some(pin_hash) if is_well_formed_pin(candidate) => verifier(candidate, pin_hash),
        _ => {
            verifier(candidate, miss_hash);
            false
        }
    }
}

pub fn check_pin(candidate: &str, stored_hash: Option<&str>) -> bool {
    check_pin_with(candidate, stored_hash, &MISS_PIN_HASH, |pin, pin_hash| {
        verify(pin, pin_hash).unwrap_or(false)
    })
}

/// Draw a PIN that does not verify against `previous_hash`, and hash it.
pub fn fresh_pin(previous_hash: Option<&str>, cost: u32) -> Result<(String, String), AppError> {
    let pin = loop {
        let candidate = generate_pin();
        match previous_hash {
            Some(previous) if pin_matches(&candidate, previous) => continue,
            _ => break candidate,
        }
    };

    let pin_hash = hash(&pin, cost)?;
    Ok((pin, pin_hash))
}

/// Issue a new PIN for the guard, replacing any existing one. The returned
/// plaintext is not retrievable again through any read path.
pub async fn issue_or_reset_pin(tenant_id: Uuid, guard_id: Uuid) -> Result<PinIssued, AppError> {
    guard_repo::find_by_id(tenant_id, guard_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Guard {} not found", guard_id)))?;

    let previous = credential_repo::find_credential(guard_id).await?;
    let (pin, pin_hash) = fresh_pin(previous.as_ref().map(|c| c.pin_hash.as_str()), PIN_HASH_COST)?;

    let issued_at = credential_repo::upsert_credential(guard_id, &pin_hash, &pin).await?;

    log::info!(
        "Issued marking PIN for guard {} (replaced existing: {})",
        guard_id,
        previous.is_some()
    );

    Ok(PinIssued {
        guard_id,
        pin,
        issued_at,
    })
}

/// Fails closed when the guard has no credential. Pass `Uuid::nil()` for a
/// guard that could not be resolved; the lookup and the hash check still run.
pub async fn verify_pin(guard_id: Uuid, candidate: &str) -> Result<bool, AppError> {
    let credential = credential_repo::find_credential(guard_id).await?;
    Ok(check_pin(
        candidate,
        credential.as_ref().map(|c| c.pin_hash.as_str()),
    ))
}

pub async fn pin_status(tenant_id: Uuid, guard_id: Uuid) -> Result<PinStatus, AppError> {
    guard_repo::find_by_id(tenant_id, guard_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Guard {} not found", guard_id)))?;

    let credential = credential_repo::find_credential(guard_id).await?;

    Ok(PinStatus {
        guard_id,
        has_pin: credential.is_some(),
        issued_at: credential.map(|c| c.issued_at),
    })
}
