use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use super::overtime::OvertimeShift;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum AttendanceStatus {
        Pending => "pending",
        Attended => "attended",
        Absent => "absent",
        Replaced => "replaced",
        OpenPost => "open_post",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub installation_id: Uuid,
    pub post_id: Uuid,
    pub date: NaiveDate,
    pub planned_guard_id: Option<Uuid>,
    pub actual_guard_id: Option<Uuid>,
    pub replacement_guard_id: Option<Uuid>,
    pub status: AttendanceStatus,
    /// Supervisor decision that wins over the derived status until cleared.
    pub status_override: Option<AttendanceStatus>,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attendance row joined with the names a dispatcher needs to act on it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub post_name: String,
    pub planned_guard_name: Option<String>,
    pub actual_guard_name: Option<String>,
    pub replacement_guard_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDay {
    #[serde(flatten)]
    pub row: AttendanceRow,
    pub overtime_shifts: Vec<OvertimeShift>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceUpdateInput {
    pub actual_guard_id: Option<Uuid>,
    pub replacement_guard_id: Option<Uuid>,
    pub status_override: Option<AttendanceStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDayQuery {
    pub installation_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPostsQuery {
    pub date: NaiveDate,
    pub installation_id: Option<Uuid>,
}
