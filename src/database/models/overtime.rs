use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use crate::error::AppError;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum OvertimeStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Paid => "paid",
    }
}

impl OvertimeStatus {
    pub fn can_transition_to(&self, next: OvertimeStatus) -> bool {
        use OvertimeStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, Rejected)
                | (Rejected, Approved)
                | (Approved, Paid)
        )
    }

    /// Single gate for every overtime status change.
    pub fn transition_to(&self, next: OvertimeStatus) -> Result<OvertimeStatus, AppError> {
        if *self == OvertimeStatus::Paid {
            return Err(AppError::conflict(
                "Overtime shift is already paid and can no longer change status",
            ));
        }
        if !self.can_transition_to(next) {
            return Err(AppError::conflict(format!(
                "Overtime shift cannot move from {} to {}",
                self, next
            )));
        }
        Ok(next)
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum PaymentBatchStatus {
        Draft => "draft",
        Exported => "exported",
        Paid => "paid",
    }
}

impl PaymentBatchStatus {
    pub fn transition_to(&self, next: PaymentBatchStatus) -> Result<PaymentBatchStatus, AppError> {
        use PaymentBatchStatus::*;
        match (self, next) {
            (Paid, _) => Err(AppError::conflict("Payment batch is already paid")),
            (Draft, Exported) | (Draft, Paid) | (Exported, Paid) => Ok(next),
            (current, next) => Err(AppError::conflict(format!(
                "Payment batch cannot move from {} to {}",
                current, next
            ))),
        }
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum PaymentItemStatus {
        Pending => "pending",
        Paid => "paid",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeShift {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub guard_id: Uuid,
    pub post_id: Uuid,
    pub installation_id: Uuid,
    pub date: NaiveDate,
    /// Opaque amount in CLP supplied when the shift is recorded.
    pub amount: BigDecimal,
    pub status: OvertimeStatus,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeShiftInput {
    pub guard_id: Uuid,
    pub post_id: Uuid,
    pub date: NaiveDate,
    pub amount: BigDecimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeQuery {
    pub status: Option<OvertimeStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectOvertimeRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBatch {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub status: PaymentBatchStatus,
    pub total_amount: BigDecimal,
    pub created_by: Option<Uuid>,
    pub exported_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBatchItem {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub shift_id: Uuid,
    pub guard_id: Uuid,
    pub amount: BigDecimal,
    pub status: PaymentItemStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBatchDetail {
    #[serde(flatten)]
    pub batch: PaymentBatch,
    pub items: Vec<PaymentBatchItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchInput {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
}

/// One bank-transfer line, joined from item, guard and default account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BankExportRow {
    pub rut: String,
    pub first_name: String,
    pub last_name: String,
    pub bank_name: Option<String>,
    pub account_type: Option<String>,
    pub account_number: Option<String>,
    pub amount: BigDecimal,
}
