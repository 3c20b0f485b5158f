use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static RUT_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{7,8})([0-9K])$").expect("RUT pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Guard {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Normalized `12345678-K` form.
    pub rut: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub installation_id: Option<Uuid>,
    pub active: bool,
    pub blacklisted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Guard {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Guards that may be scheduled or may mark attendance.
    pub fn is_assignable(&self) -> bool {
        self.active && !self.blacklisted
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardInput {
    pub rut: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub installation_id: Option<Uuid>,
    pub bank_account: Option<BankAccountInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: Uuid,
    pub guard_id: Uuid,
    pub bank_name: String,
    pub account_type: String,
    pub account_number: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountInput {
    pub bank_name: String,
    pub account_type: String,
    pub account_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardWithAccount {
    #[serde(flatten)]
    pub guard: Guard,
    pub bank_account: Option<BankAccount>,
}

/// Strips formatting from a Chilean RUT, checks its verifier digit and
/// returns it as `body-dv`. `None` for anything malformed.
pub fn normalize_rut(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .collect::<String>()
        .to_uppercase();

    let captures = RUT_SHAPE.captures(&compact)?;
    let body = captures.get(1)?.as_str();
    let verifier = captures.get(2)?.as_str().chars().next()?;

    if rut_verifier(body)? != verifier {
        return None;
    }

    Some(format!("{}-{}", body, verifier))
}

fn rut_verifier(body: &str) -> Option<char> {
    let mut sum = 0u32;
    for (position, digit) in body.chars().rev().enumerate() {
        sum += digit.to_digit(10)? * (2 + (position as u32 % 6));
    }

    match 11 - (sum % 11) {
        11 => Some('0'),
        10 => Some('K'),
        n => char::from_digit(n, 10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_rut_accepts_common_spellings() {
        assert_eq!(normalize_rut("12.345.678-5"), Some("12345678-5".to_string()));
        assert_eq!(normalize_rut("123456785"), Some("12345678-5".to_string()));
        assert_eq!(normalize_rut(" 11111111-1 "), Some("11111111-1".to_string()));
    }

    #[test]
    fn test_normalize_rut_rejects_wrong_verifier() {
        assert_eq!(normalize_rut("12.345.678-9"), None);
    }

    #[test]
    fn test_normalize_rut_rejects_garbage() {
        assert_eq!(normalize_rut(""), None);
        assert_eq!(normalize_rut("abc"), None);
        assert_eq!(normalize_rut("1-9"), None);
    }

    #[test]
    fn test_verifier_k_is_uppercased() {
        // 10.000.013-K: digits reversed 3,1,0,0,0,0,0,1 weigh 2,3,4,5,6,7,2,3
        // sum = 6 + 3 + 3 = 12, 11 - (12 % 11) = 10 -> K
        assert_eq!(normalize_rut("10.000.013-k"), Some("10000013-K".to_string()));
    }
}
