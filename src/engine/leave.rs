use std::sync::Arc;
use std::time::Duration;

use actix_web::rt;
use chrono::NaiveDate;
use tracing::{info, warn};

use super::{
    bounded,
    error::{AttendanceError, EngineResult},
    hierarchy::{check_department_access, has_management_privileges},
};
use crate::model::{
    leave_request::{LeaveRequest, LeaveStatus, LeaveType},
    staff::StaffMember,
};
use crate::store::{Directory, LeaveStore, NotificationSink};

/// Leave submission and the approve/reject decision.
pub struct LeaveService {
    leaves: Arc<dyn LeaveStore>,
    directory: Arc<dyn Directory>,
    notifications: Arc<dyn NotificationSink>,
    io_timeout: Duration,
}

impl LeaveService {
    pub fn new(
        leaves: Arc<dyn LeaveStore>,
        directory: Arc<dyn Directory>,
        notifications: Arc<dyn NotificationSink>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            leaves,
            directory,
            notifications,
            io_timeout,
        }
    }

    pub async fn submit(
        &self,
        actor: &StaffMember,
        start: NaiveDate,
        end: NaiveDate,
        leave_type: LeaveType,
    ) -> EngineResult<LeaveRequest> {
        if start > end {
            return Err(AttendanceError::date_range("start_date cannot be after end_date"));
        }
        let leave = bounded(
            self.io_timeout,
            "create_leave",
            self.leaves.create_leave(actor.id, start, end, leave_type),
        )
        .await?;
        info!(leave_id = leave.id, staff_id = actor.id, "Leave request submitted");
        Ok(leave)
    }

    pub async fn get(&self, id: u64) -> EngineResult<LeaveRequest> {
        bounded(self.io_timeout, "find_leave", self.leaves.find_leave(id))
            .await?
            .ok_or_else(|| AttendanceError::not_found("leave request", id))
    }

    /// A request as seen by `actor`: the owner or management.
    pub async fn view(&self, actor: &StaffMember, id: u64) -> EngineResult<LeaveRequest> {
        let leave = self.get(id).await?;
        if leave.staff_id != actor.id && !has_management_privileges(&actor.role) {
            return Err(AttendanceError::unauthorized("leave requests are visible to their owner and management"));
        }
        Ok(leave)
    }

    /// Approves or rejects a pending request, then notifies in the background.
    pub async fn decide(
        &self,
        actor: &StaffMember,
        id: u64,
        decision: LeaveStatus,
    ) -> EngineResult<LeaveRequest> {
        if decision == LeaveStatus::Pending {
            return Err(AttendanceError::policy("a decision must approve or reject"));
        }
        if !has_management_privileges(&actor.role) {
            return Err(AttendanceError::unauthorized("only managers and above decide leave"));
        }

        let leave = self.get(id).await?;
        if leave.staff_id == actor.id {
            return Err(AttendanceError::unauthorized("nobody decides their own leave"));
        }
        let owner = bounded(
            self.io_timeout,
            "find_staff",
            self.directory.find_staff(leave.staff_id),
        )
        .await?
        .ok_or_else(|| AttendanceError::not_found("staff", leave.staff_id))?;
        if !check_department_access(actor, owner.department.as_deref()) {
            return Err(AttendanceError::unauthorized(format!(
                "no access to department of staff {}",
                owner.id
            )));
        }

        let updated = bounded(
            self.io_timeout,
            "decide_leave",
            self.leaves.decide_leave(id, decision),
        )
        .await?
        .ok_or_else(|| {
            AttendanceError::policy(format!("leave request {id} is already {}", leave.status))
        })?;
        info!(leave_id = id, actor_id = actor.id, status = %updated.status, "Leave decided");

        let sink = self.notifications.clone();
        let notice = updated.clone();
        rt::spawn(async move {
            if let Err(e) = sink.leave_status_changed(&notice).await {
                warn!(error = %e, leave_id = notice.id, "Leave notification failed");
            }
        });

        Ok(updated)
    }
}
