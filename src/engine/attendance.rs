//! Clock-in / clock-out for one staff member on one calendar day.
//!
//! `NoRecord -> OpenClockedIn -> Closed`. Repeating either action against a
//! settled state returns the existing record untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as Span, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use super::{
    Clock, bounded,
    error::{AttendanceError, EngineResult},
    geotime::{distance, is_late, is_weekly_off, shift_start_minutes},
    hierarchy::has_management_privileges,
    locks::KeyLocks,
    resolver::{AssignmentResolver, CheckScope},
    settings::Settings,
};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, ClockOutUpdate, GeoPoint, InsertOutcome, NewAttendance},
    location::Location,
    role::Role,
    staff::StaffMember,
};
use crate::store::Repositories;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ClockInRequest {
    #[schema(example = 1)]
    pub staff_id: Option<u64>,
    #[schema(example = 10)]
    pub supervisor_id: Option<u64>,
    #[schema(example = 100)]
    pub location_id: Option<u64>,
    pub geo: Option<GeoPoint>,
    #[schema(example = "photos/2026/01/01/1.jpg")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub overtime: bool,
    #[serde(default)]
    pub double_duty: bool,
    #[serde(default)]
    pub is_override: bool,
    /// `YYYY-MM-DD`; defaults to today.
    #[schema(example = "2026-01-01")]
    pub attendance_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ClockOutRequest {
    #[schema(example = 1)]
    pub staff_id: Option<u64>,
    #[schema(example = 10)]
    pub supervisor_id: Option<u64>,
    #[schema(example = 100)]
    pub location_id: Option<u64>,
    pub geo: Option<GeoPoint>,
    #[schema(example = "photos/2026/01/01/1-out.jpg")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub is_override: bool,
    #[schema(example = "2026-01-01")]
    pub attendance_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceResult {
    pub message: String,
    pub record: AttendanceRecord,
    /// True when the call found the state already settled and changed nothing.
    pub already_processed: bool,
    /// Name of whoever acted, when that was not the staff member.
    pub performed_by: Option<String>,
}

/// Validated facts shared by both actions.
struct Prepared {
    staff: StaffMember,
    supervisor_id: u64,
    location_id: u64,
    date: NaiveDate,
    self_action: bool,
    override_mode: bool,
}

pub struct AttendanceEngine {
    repos: Repositories,
    resolver: AssignmentResolver,
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
    locks: KeyLocks,
    io_timeout: Duration,
}

impl AttendanceEngine {
    pub fn new(
        repos: Repositories,
        settings: Arc<Settings>,
        clock: Arc<dyn Clock>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            resolver: AssignmentResolver::new(repos.assignments.clone(), io_timeout),
            repos,
            settings,
            clock,
            locks: KeyLocks::new(),
            io_timeout,
        }
    }

    #[instrument(name = "clock_in", skip_all, fields(actor_id = actor.id, staff_id = ?req.staff_id))]
    pub async fn clock_in(
        &self,
        actor: &StaffMember,
        req: ClockInRequest,
    ) -> EngineResult<AttendanceResult> {
        let (staff_id, supervisor_id, location_id) =
            required_keys(req.staff_id, req.supervisor_id, req.location_id)?;
        let ctx = self
            .prepare(
                actor,
                (staff_id, supervisor_id, location_id),
                req.is_override,
                req.geo,
                req.attendance_date.as_deref(),
                CheckScope::ClockIn,
            )
            .await?;

        let _guard = self.locks.acquire(staff_id, ctx.date).await;

        let open = bounded(
            self.io_timeout,
            "find_open",
            self.repos.attendance.find_open(staff_id, ctx.date),
        )
        .await?;
        if let Some(record) = open {
            debug!(record_id = record.id, date = %ctx.date, "Already clocked in");
            return Ok(self.result("Already clocked in", record, true, actor, &ctx));
        }

        let config = self.settings.current().await?;
        let now = self.clock.now();
        let status = if is_late(
            now.time(),
            shift_start_minutes(ctx.staff.shift_start.as_deref()),
            config.grace_period_minutes,
        ) {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        };

        let holidays = bounded(
            self.io_timeout,
            "holidays_between",
            self.repos.holidays.holidays_between(ctx.date, ctx.date),
        )
        .await?;
        let forced_overtime = is_weekly_off(ctx.staff.shift_days, ctx.date) || !holidays.is_empty();
        if forced_overtime && !req.overtime {
            debug!(date = %ctx.date, "Overtime forced for weekly off or holiday");
        }

        let new = NewAttendance {
            staff_id,
            supervisor_id: ctx.supervisor_id,
            location_id: ctx.location_id,
            attendance_date: ctx.date,
            clock_in_at: now,
            geo: req.geo,
            photo: req.photo_url,
            status,
            is_overtime: req.overtime || forced_overtime,
            is_double_duty: req.double_duty,
            is_override: ctx.override_mode,
            clocked_in_by: (!ctx.self_action).then_some(actor.id),
        };

        match bounded(
            self.io_timeout,
            "insert_attendance",
            self.repos.attendance.insert_if_no_open(new),
        )
        .await?
        {
            InsertOutcome::Created(record) => {
                info!(
                    record_id = record.id,
                    date = %ctx.date,
                    status = %record.status,
                    is_override = record.is_override,
                    "Clocked in"
                );
                Ok(self.result("Clocked in successfully", record, false, actor, &ctx))
            }
            InsertOutcome::Existing(record) => {
                Ok(self.result("Already clocked in", record, true, actor, &ctx))
            }
        }
    }

    #[instrument(name = "clock_out", skip_all, fields(actor_id = actor.id, staff_id = ?req.staff_id))]
    pub async fn clock_out(
        &self,
        actor: &StaffMember,
        req: ClockOutRequest,
    ) -> EngineResult<AttendanceResult> {
        let (staff_id, supervisor_id, location_id) =
            required_keys(req.staff_id, req.supervisor_id, req.location_id)?;
        let ctx = self
            .prepare(
                actor,
                (staff_id, supervisor_id, location_id),
                req.is_override,
                req.geo,
                req.attendance_date.as_deref(),
                CheckScope::ClockOut,
            )
            .await?;

        let _guard = self.locks.acquire(staff_id, ctx.date).await;

        let record = bounded(
            self.io_timeout,
            "find_for_day",
            self.repos
                .attendance
                .find_for_day(staff_id, ctx.supervisor_id, ctx.location_id, ctx.date),
        )
        .await?;
        let no_open = || {
            AttendanceError::not_found(
                "open attendance record",
                format!("staff {staff_id} on {}", ctx.date),
            )
        };
        let record = record.ok_or_else(no_open)?;

        if record.clock_out_at.is_some() {
            debug!(record_id = record.id, "Already clocked out");
            return Ok(self.result("Already clocked out", record, true, actor, &ctx));
        }
        let clock_in_at = record.clock_in_at.ok_or_else(no_open)?;

        let now = self.clock.now();
        if !ctx.override_mode {
            let config = self.settings.current().await?;
            check_min_interval(clock_in_at, now, config.min_clock_interval_hours)?;
        }

        let update = ClockOutUpdate {
            clock_out_at: now,
            geo: req.geo,
            photo: req.photo_url,
            clocked_out_by: (!ctx.self_action).then_some(actor.id),
            is_override: record.is_override || ctx.override_mode,
        };

        match bounded(self.io_timeout, "close_attendance", self.repos.attendance.close(record.id, update)).await? {
            Some(closed) => {
                info!(record_id = closed.id, date = %ctx.date, "Clocked out");
                Ok(self.result("Clocked out successfully", closed, false, actor, &ctx))
            }
            None => {
                let current = bounded(
                    self.io_timeout,
                    "find_attendance",
                    self.repos.attendance.find_by_id(record.id),
                )
                .await?
                .ok_or_else(no_open)?;
                warn!(record_id = current.id, "Record closed concurrently");
                Ok(self.result("Already clocked out", current, true, actor, &ctx))
            }
        }
    }

    async fn prepare(
        &self,
        actor: &StaffMember,
        (staff_id, supervisor_id, location_id): (u64, u64, u64),
        override_requested: bool,
        geo: Option<GeoPoint>,
        explicit_date: Option<&str>,
        scope: CheckScope,
    ) -> EngineResult<Prepared> {
        let self_action = actor.id == staff_id;
        let actor_role = actor.role();
        let override_mode =
            override_requested && actor_role == Some(Role::GeneralManager) && !self_action;
        if override_requested && !override_mode {
            debug!(actor_id = actor.id, "Override requested but not permitted, running full checks");
        }

        let staff = self.staff(staff_id, "staff").await?;
        if supervisor_id != staff_id {
            self.staff(supervisor_id, "supervisor").await?;
        }
        let location = bounded(
            self.io_timeout,
            "find_location",
            self.repos.locations.find_location(location_id),
        )
        .await?
        .ok_or_else(|| AttendanceError::not_found("location", location_id))?;

        if self_action && matches!(actor_role, Some(Role::Manager | Role::GeneralManager)) {
            check_office_presence(&location, geo)?;
        }

        self.resolver
            .authorize(scope, override_mode, staff_id, supervisor_id, location_id)
            .await?;

        let date = self.resolve_date(actor, self_action, explicit_date)?;

        Ok(Prepared {
            staff,
            supervisor_id,
            location_id,
            date,
            self_action,
            override_mode,
        })
    }

    async fn staff(&self, id: u64, entity: &'static str) -> EngineResult<StaffMember> {
        bounded(self.io_timeout, "find_staff", self.repos.directory.find_staff(id))
            .await?
            .ok_or_else(|| AttendanceError::not_found(entity, id))
    }

    /// Today by default. Yesterday only for a manager acting for someone else.
    fn resolve_date(
        &self,
        actor: &StaffMember,
        self_action: bool,
        explicit: Option<&str>,
    ) -> EngineResult<NaiveDate> {
        let today = self.clock.now().date();
        let Some(raw) = explicit.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(today);
        };

        let date = parse_attendance_date(raw)?;
        if date > today {
            return Err(AttendanceError::date_range(format!(
                "attendance date {date} is in the future"
            )));
        }
        if date == today {
            return Ok(date);
        }
        if date < today - Span::days(1) {
            return Err(AttendanceError::date_range(format!(
                "attendance date {date} is older than yesterday"
            )));
        }
        if self_action || !has_management_privileges(&actor.role) {
            return Err(AttendanceError::date_range(
                "only a manager acting for another staff member may back-date attendance",
            ));
        }
        Ok(date)
    }

    fn result(
        &self,
        message: &str,
        record: AttendanceRecord,
        already_processed: bool,
        actor: &StaffMember,
        ctx: &Prepared,
    ) -> AttendanceResult {
        AttendanceResult {
            message: message.to_string(),
            record,
            already_processed,
            performed_by: (!ctx.self_action).then(|| actor.name.clone()),
        }
    }
}

fn required_keys(
    staff_id: Option<u64>,
    supervisor_id: Option<u64>,
    location_id: Option<u64>,
) -> EngineResult<(u64, u64, u64)> {
    let staff_id = staff_id.ok_or(AttendanceError::MissingRequiredField { field: "staff_id" })?;
    let supervisor_id =
        supervisor_id.ok_or(AttendanceError::MissingRequiredField { field: "supervisor_id" })?;
    let location_id =
        location_id.ok_or(AttendanceError::MissingRequiredField { field: "location_id" })?;
    Ok((staff_id, supervisor_id, location_id))
}

pub fn parse_attendance_date(raw: &str) -> EngineResult<NaiveDate> {
    let well_formed = raw.len() == 10
        && raw
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
    well_formed
        .then(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
        .flatten()
        .ok_or_else(|| AttendanceError::date_range(format!("attendance date {raw:?} is not YYYY-MM-DD")))
}

/// Managers and general managers acting for themselves must be at an office, inside its fence.
fn check_office_presence(location: &Location, geo: Option<GeoPoint>) -> EngineResult<()> {
    if !location.is_office_location() {
        return Err(AttendanceError::policy(format!(
            "managers may only clock themselves at an office location, {} is not one",
            location.name
        )));
    }
    if let (Some(point), Some((lat, lng))) = (geo, location.geocenter()) {
        let meters = distance(point.lat, point.lng, lat, lng);
        let radius = location.geofence_radius();
        if !(meters <= radius) {
            return Err(AttendanceError::policy(format!(
                "outside the geofence of {}: {:.0} m from center, limit {:.0} m",
                location.name, meters, radius
            )));
        }
    }
    Ok(())
}

fn check_min_interval(clock_in_at: NaiveDateTime, now: NaiveDateTime, min_hours: f64) -> EngineResult<()> {
    let elapsed_secs = (now - clock_in_at).num_seconds() as f64;
    let required_secs = min_hours * 3600.0;
    if elapsed_secs >= required_secs {
        return Ok(());
    }
    let remaining_minutes = ((required_secs - elapsed_secs) / 60.0).ceil() as i64;
    Err(AttendanceError::RateLimited {
        min_hours,
        remaining_minutes,
    })
}
