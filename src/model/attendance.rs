use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Status decided once at clock-in and stored with the record.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "PascalCase")]
#[strum(ascii_case_insensitive)]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = 23.8103)]
    pub lat: f64,
    #[schema(example = 90.4125)]
    pub lng: f64,
}

/// One row of the attendance table. `attendance_date` is the calendar key,
/// timestamps are server-local wall time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub staff_id: u64,
    pub supervisor_id: u64,
    pub location_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub attendance_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_in_at: Option<NaiveDateTime>,
    pub clock_in_lat: Option<f64>,
    pub clock_in_lng: Option<f64>,
    pub clock_in_photo: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_out_at: Option<NaiveDateTime>,
    pub clock_out_lat: Option<f64>,
    pub clock_out_lng: Option<f64>,
    pub clock_out_photo: Option<String>,
    #[schema(example = "Present")]
    pub status: String,
    #[schema(example = "pending")]
    pub approval_status: String,
    pub is_overtime: bool,
    pub is_double_duty: bool,
    pub is_override: bool,
    pub clocked_in_by: Option<u64>,
    pub clocked_out_by: Option<u64>,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.clock_in_at.is_some() && self.clock_out_at.is_none()
    }

    pub fn approval(&self) -> Option<ApprovalStatus> {
        self.approval_status.trim().parse().ok()
    }
}

/// Everything needed to insert a freshly clocked-in record.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub staff_id: u64,
    pub supervisor_id: u64,
    pub location_id: u64,
    pub attendance_date: NaiveDate,
    pub clock_in_at: NaiveDateTime,
    pub geo: Option<GeoPoint>,
    pub photo: Option<String>,
    pub status: AttendanceStatus,
    pub is_overtime: bool,
    pub is_double_duty: bool,
    pub is_override: bool,
    pub clocked_in_by: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ClockOutUpdate {
    pub clock_out_at: NaiveDateTime,
    pub geo: Option<GeoPoint>,
    pub photo: Option<String>,
    pub clocked_out_by: Option<u64>,
    pub is_override: bool,
}

/// Result of a conditional insert: either the new row or the open row that blocked it.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Created(AttendanceRecord),
    Existing(AttendanceRecord),
}
