//! Repository contracts the engine is written against. Implementations return
//! resolved rows or `None`; they never hand back bare identifiers in place of rows.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::{
    assignment::{Assignment, SupervisorLocation},
    attendance::{AttendanceRecord, ClockOutUpdate, InsertOutcome, NewAttendance},
    leave_request::{LeaveRequest, LeaveStatus, LeaveType},
    location::Location,
    staff::{Credential, StaffMember},
    system_config::SystemConfig,
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_staff(&self, id: u64) -> Result<Option<StaffMember>>;
    async fn find_staff_many(&self, ids: &[u64]) -> Result<Vec<StaffMember>>;
    async fn find_credential(&self, username: &str) -> Result<Option<Credential>>;
}

#[async_trait]
pub trait LocationCatalog: Send + Sync {
    async fn find_location(&self, id: u64) -> Result<Option<Location>>;
    async fn find_locations(&self, ids: &[u64]) -> Result<Vec<Location>>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn active_assignment(
        &self,
        staff_id: u64,
        supervisor_id: u64,
        location_id: u64,
    ) -> Result<Option<Assignment>>;
    async fn active_supervisor_location(
        &self,
        supervisor_id: u64,
        location_id: u64,
    ) -> Result<Option<SupervisorLocation>>;
    /// Any assignment row for the staff member, active or not.
    async fn staff_has_any_assignment(&self, staff_id: u64) -> Result<bool>;
    /// Any supervisor-location row for the supervisor, active or not.
    async fn supervisor_has_any_location(&self, supervisor_id: u64) -> Result<bool>;
    async fn active_assignments(&self) -> Result<Vec<Assignment>>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_open(&self, staff_id: u64, date: NaiveDate) -> Result<Option<AttendanceRecord>>;
    /// Open record for the key if one exists, otherwise the latest closed one.
    async fn find_for_day(
        &self,
        staff_id: u64,
        supervisor_id: u64,
        location_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>>;
    /// Inserts unless an open record already exists for `(staff_id, attendance_date)`.
    async fn insert_if_no_open(&self, new: NewAttendance) -> Result<InsertOutcome>;
    /// Closes the record. `None` when it was already closed by someone else.
    async fn close(&self, id: u64, update: ClockOutUpdate) -> Result<Option<AttendanceRecord>>;
    async fn find_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>>;
    async fn in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        supervisor_id: Option<u64>,
        location_id: Option<u64>,
    ) -> Result<Vec<AttendanceRecord>>;
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn approved_overlapping(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<LeaveRequest>>;
    async fn find_leave(&self, id: u64) -> Result<Option<LeaveRequest>>;
    async fn create_leave(
        &self,
        staff_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        leave_type: LeaveType,
    ) -> Result<LeaveRequest>;
    /// Moves a pending request to `status`. `None` if it was not pending.
    async fn decide_leave(&self, id: u64, status: LeaveStatus) -> Result<Option<LeaveRequest>>;
}

#[async_trait]
pub trait HolidayCalendar: Send + Sync {
    async fn holidays_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>>;
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load_config(&self) -> Result<Option<SystemConfig>>;
    async fn save_config(&self, config: &SystemConfig) -> Result<()>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn leave_status_changed(&self, leave: &LeaveRequest) -> Result<()>;
}

/// Every collaborator the engines read or write.
#[derive(Clone)]
pub struct Repositories {
    pub directory: Arc<dyn Directory>,
    pub locations: Arc<dyn LocationCatalog>,
    pub assignments: Arc<dyn AssignmentStore>,
    pub attendance: Arc<dyn AttendanceStore>,
    pub leaves: Arc<dyn LeaveStore>,
    pub holidays: Arc<dyn HolidayCalendar>,
    pub config: Arc<dyn ConfigStore>,
    pub notifications: Arc<dyn NotificationSink>,
}

impl Repositories {
    /// One backend serving every store, plus a separate notification sink.
    pub fn from_backend<B>(backend: Arc<B>, notifications: Arc<dyn NotificationSink>) -> Self
    where
        B: Directory
            + LocationCatalog
            + AssignmentStore
            + AttendanceStore
            + LeaveStore
            + HolidayCalendar
            + ConfigStore
            + 'static,
    {
        Self {
            directory: backend.clone(),
            locations: backend.clone(),
            assignments: backend.clone(),
            attendance: backend.clone(),
            leaves: backend.clone(),
            holidays: backend.clone(),
            config: backend,
            notifications,
        }
    }
}

/// Delivery is somebody else's job; this sink records the event in the log.
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn leave_status_changed(&self, leave: &LeaveRequest) -> Result<()> {
        tracing::info!(
            leave_id = leave.id,
            staff_id = leave.staff_id,
            status = %leave.status,
            "Leave status notification queued"
        );
        Ok(())
    }
}
