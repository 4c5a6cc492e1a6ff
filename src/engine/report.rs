//! Rebuilds one status row per assigned staff member per day from attendance,
//! assignments, approved leave and the holiday calendar.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

use super::{
    Clock, bounded,
    attendance::parse_attendance_date,
    error::{AttendanceError, EngineResult},
    geotime::{date_range, is_late, shift_start_minutes},
    hierarchy::{has_field_leadership_privileges, has_management_privileges},
    settings::Settings,
};
use crate::model::{
    assignment::Assignment,
    attendance::{ApprovalStatus, AttendanceRecord},
    location::Location,
    staff::StaffMember,
};
use crate::store::Repositories;

pub const MAX_REPORT_DAYS: usize = 366;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, Display, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ReportStatus {
    Present,
    Late,
    Absent,
    OnLeave,
    Holiday,
}

impl ReportStatus {
    /// Folds a stored status onto present/late/absent/on-leave. Anything else is absent.
    pub fn normalize(raw: &str) -> Self {
        let folded = raw.trim().to_lowercase().replace(['_', ' '], "-");
        match folded.parse() {
            Ok(status @ (Self::Present | Self::Late | Self::OnLeave)) => status,
            _ => Self::Absent,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// Inclusive, `YYYY-MM-DD`
    #[schema(example = "2026-01-01")]
    pub date_from: Option<String>,
    /// Inclusive, `YYYY-MM-DD`
    #[schema(example = "2026-01-31")]
    pub date_to: Option<String>,
    pub supervisor_id: Option<u64>,
    pub location_id: Option<u64>,
    /// present, late, absent, on-leave or holiday
    #[schema(example = "late")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceReportRow {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub staff_id: u64,
    pub staff_name: String,
    pub supervisor_id: u64,
    pub supervisor_name: String,
    pub location_id: u64,
    pub location_name: String,
    pub status: ReportStatus,
    /// Absent for synthesized rows.
    pub record_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_in_at: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_out_at: Option<NaiveDateTime>,
    pub approval_status: Option<String>,
    pub is_overtime: bool,
    pub is_double_duty: bool,
    pub is_override: bool,
}

/// `On Leave`, `on_leave` and `on-leave` all name the same filter.
fn parse_status_filter(raw: &str) -> EngineResult<ReportStatus> {
    raw.to_lowercase()
        .replace(['_', ' '], "-")
        .parse()
        .map_err(|_| AttendanceError::InvalidParameter {
            field: "status",
            value: raw.to_string(),
        })
}

/// Lateness at report time is measured against the location's shift, not the
/// staff member's own shift used at clock-in. The two can disagree.
pub fn derive_status(record: &AttendanceRecord, location: Option<&Location>, grace_minutes: u32) -> ReportStatus {
    if record.approval() == Some(ApprovalStatus::Rejected) {
        return ReportStatus::Absent;
    }
    if let Some(clock_in) = record.clock_in_at {
        let start = shift_start_minutes(location.and_then(|l| l.morning_shift_start.as_deref()));
        return if is_late(clock_in.time(), start, grace_minutes) {
            ReportStatus::Late
        } else {
            ReportStatus::Present
        };
    }
    ReportStatus::normalize(&record.status)
}

/// Names looked up once per report.
struct Names {
    staff: HashMap<u64, StaffMember>,
    locations: HashMap<u64, Location>,
}

impl Names {
    fn person(&self, id: u64) -> String {
        self.staff
            .get(&id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    fn place(&self, id: u64) -> String {
        self.locations
            .get(&id)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    fn synthesized(&self, a: &Assignment, date: NaiveDate, status: ReportStatus) -> AttendanceReportRow {
        AttendanceReportRow {
            date,
            staff_id: a.staff_id,
            staff_name: self.person(a.staff_id),
            supervisor_id: a.supervisor_id,
            supervisor_name: self.person(a.supervisor_id),
            location_id: a.location_id,
            location_name: self.place(a.location_id),
            status,
            record_id: None,
            clock_in_at: None,
            clock_out_at: None,
            approval_status: None,
            is_overtime: false,
            is_double_duty: false,
            is_override: false,
        }
    }

    fn recorded(&self, r: &AttendanceRecord, status: ReportStatus) -> AttendanceReportRow {
        AttendanceReportRow {
            date: r.attendance_date,
            staff_id: r.staff_id,
            staff_name: self.person(r.staff_id),
            supervisor_id: r.supervisor_id,
            supervisor_name: self.person(r.supervisor_id),
            location_id: r.location_id,
            location_name: self.place(r.location_id),
            status,
            record_id: Some(r.id),
            clock_in_at: r.clock_in_at,
            clock_out_at: r.clock_out_at,
            approval_status: Some(r.approval_status.clone()),
            is_overtime: r.is_overtime,
            is_double_duty: r.is_double_duty,
            is_override: r.is_override,
        }
    }

    /// Synthesized rows only for people still on the books.
    fn is_active_staff(&self, id: u64) -> bool {
        self.staff.get(&id).is_some_and(|s| s.is_active)
    }
}

pub struct ReportEngine {
    repos: Repositories,
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
    absent_cutoff: NaiveTime,
    io_timeout: Duration,
}

impl ReportEngine {
    pub fn new(
        repos: Repositories,
        settings: Arc<Settings>,
        clock: Arc<dyn Clock>,
        absent_cutoff: NaiveTime,
        io_timeout: Duration,
    ) -> Self {
        Self {
            repos,
            settings,
            clock,
            absent_cutoff,
            io_timeout,
        }
    }

    #[instrument(name = "attendance_report", skip_all, fields(actor_id = actor.id))]
    pub async fn generate(
        &self,
        actor: &StaffMember,
        query: ReportQuery,
    ) -> EngineResult<Vec<AttendanceReportRow>> {
        let supervisor_filter = scoped_supervisor(actor, query.supervisor_id)?;
        let location_filter = query.location_id;

        let from = required_date(query.date_from.as_deref(), "date_from")?;
        let to = required_date(query.date_to.as_deref(), "date_to")?;
        if from > to {
            return Err(AttendanceError::date_range(format!(
                "date_from {from} is after date_to {to}"
            )));
        }
        let span = (to - from).num_days() + 1;
        if span > MAX_REPORT_DAYS as i64 {
            return Err(AttendanceError::date_range(format!(
                "report range spans {span} days, limit is {MAX_REPORT_DAYS}"
            )));
        }
        let dates = date_range(from, to);
        let status_filter = query
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_status_filter)
            .transpose()?;

        // one active assignment per staff member, filtered
        let assignments: HashMap<u64, Assignment> = bounded(
            self.io_timeout,
            "active_assignments",
            self.repos.assignments.active_assignments(),
        )
        .await?
        .into_iter()
        .filter(|a| supervisor_filter.is_none_or(|id| a.supervisor_id == id))
        .filter(|a| location_filter.is_none_or(|id| a.location_id == id))
        .map(|a| (a.staff_id, a))
        .collect();

        let records = bounded(
            self.io_timeout,
            "attendance_in_range",
            self.repos
                .attendance
                .in_range(from, to, supervisor_filter, location_filter),
        )
        .await?;
        let mut by_day: HashMap<(u64, NaiveDate), AttendanceRecord> = HashMap::new();
        for record in records {
            let key = (record.staff_id, record.attendance_date);
            match by_day.get(&key) {
                Some(kept) if earliest_first(kept) <= earliest_first(&record) => {}
                _ => {
                    by_day.insert(key, record);
                }
            }
        }

        let leaves = bounded(
            self.io_timeout,
            "approved_leave",
            self.repos.leaves.approved_overlapping(from, to),
        )
        .await?;
        let holidays: HashSet<NaiveDate> = bounded(
            self.io_timeout,
            "holidays_between",
            self.repos.holidays.holidays_between(from, to),
        )
        .await?
        .into_iter()
        .collect();

        let names = self.load_names(&assignments, by_day.values()).await?;
        let grace = self.settings.current().await?.grace_period_minutes;
        let now = self.clock.now();
        let today = now.date();
        let past_cutoff = now.time() >= self.absent_cutoff;

        let mut rows = Vec::with_capacity(assignments.len() * dates.len());
        let mut covered: HashSet<(u64, NaiveDate)> = HashSet::new();

        for (key, record) in &by_day {
            let status = derive_status(record, names.locations.get(&record.location_id), grace);
            rows.push(names.recorded(record, status));
            covered.insert(*key);
        }

        for leave in &leaves {
            let Some(assignment) = assignments.get(&leave.staff_id) else {
                continue;
            };
            if !names.is_active_staff(leave.staff_id) {
                continue;
            }
            let Some((start, end)) = leave.overlap(from, to) else {
                continue;
            };
            for date in date_range(start, end) {
                if covered.insert((leave.staff_id, date)) {
                    rows.push(names.synthesized(assignment, date, ReportStatus::OnLeave));
                }
            }
        }

        for (staff_id, assignment) in &assignments {
            if !names.is_active_staff(*staff_id) {
                continue;
            }
            for date in &dates {
                if covered.contains(&(*staff_id, *date)) {
                    continue;
                }
                if holidays.contains(date) {
                    rows.push(names.synthesized(assignment, *date, ReportStatus::Holiday));
                } else if *date < today || (*date == today && past_cutoff) {
                    rows.push(names.synthesized(assignment, *date, ReportStatus::Absent));
                }
            }
        }

        if let Some(wanted) = status_filter {
            rows.retain(|r| r.status == wanted);
        }
        rows.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.staff_name.cmp(&b.staff_name))
                .then_with(|| a.staff_id.cmp(&b.staff_id))
        });

        debug!(%from, %to, rows = rows.len(), "Report generated");
        Ok(rows)
    }

    async fn load_names<'a>(
        &self,
        assignments: &HashMap<u64, Assignment>,
        records: impl Iterator<Item = &'a AttendanceRecord>,
    ) -> EngineResult<Names> {
        let mut people: HashSet<u64> = HashSet::new();
        let mut places: HashSet<u64> = HashSet::new();
        for a in assignments.values() {
            people.extend([a.staff_id, a.supervisor_id]);
            places.insert(a.location_id);
        }
        for r in records {
            people.extend([r.staff_id, r.supervisor_id]);
            places.insert(r.location_id);
        }
        let people: Vec<u64> = people.into_iter().collect();
        let places: Vec<u64> = places.into_iter().collect();

        let staff = bounded(
            self.io_timeout,
            "find_staff_many",
            self.repos.directory.find_staff_many(&people),
        )
        .await?;
        let locations = bounded(
            self.io_timeout,
            "find_locations",
            self.repos.locations.find_locations(&places),
        )
        .await?;

        Ok(Names {
            staff: staff.into_iter().map(|s| (s.id, s)).collect(),
            locations: locations.into_iter().map(|l| (l.id, l)).collect(),
        })
    }
}

/// Supervisors only ever see their own people.
fn scoped_supervisor(actor: &StaffMember, requested: Option<u64>) -> EngineResult<Option<u64>> {
    if has_management_privileges(&actor.role) {
        return Ok(requested);
    }
    if !has_field_leadership_privileges(&actor.role) {
        return Err(AttendanceError::unauthorized("attendance reports need supervisor rank or above"));
    }
    match requested {
        Some(id) if id != actor.id => Err(AttendanceError::unauthorized(
            "supervisors may only report on their own staff",
        )),
        _ => Ok(Some(actor.id)),
    }
}

fn required_date(raw: Option<&str>, field: &'static str) -> EngineResult<NaiveDate> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(AttendanceError::MissingRequiredField { field })?;
    parse_attendance_date(raw)
}

/// Sort key: records with a clock-in first, earliest clock-in wins.
fn earliest_first(r: &AttendanceRecord) -> (bool, Option<NaiveDateTime>, u64) {
    (r.clock_in_at.is_none(), r.clock_in_at, r.id)
}
