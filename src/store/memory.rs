//! In-process backend for tests. Same contracts as the MySQL store.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use super::{
    AssignmentStore, AttendanceStore, ConfigStore, Directory, HolidayCalendar, LeaveStore,
    LocationCatalog,
};
use crate::model::{
    assignment::{Assignment, SupervisorLocation},
    attendance::{ApprovalStatus, AttendanceRecord, ClockOutUpdate, InsertOutcome, NewAttendance},
    leave_request::{LeaveRequest, LeaveStatus, LeaveType},
    location::Location,
    staff::{Credential, StaffMember},
    system_config::SystemConfig,
};

pub fn staff(id: u64, role: &str) -> StaffMember {
    StaffMember {
        id,
        name: format!("Person {id}"),
        role: role.to_string(),
        department: Some("operations".to_string()),
        departments: None,
        shift_days: Some(6),
        shift_start: Some("09:00".to_string()),
        shift_end: Some("17:00".to_string()),
        is_active: true,
    }
}

pub fn site(id: u64, name: &str) -> Location {
    Location {
        id,
        name: name.to_string(),
        code: None,
        latitude: None,
        longitude: None,
        radius_m: None,
        morning_shift_start: None,
        morning_shift_end: None,
        night_shift_start: None,
        night_shift_end: None,
        is_office: false,
    }
}

#[derive(Default)]
struct State {
    staff: Vec<StaffMember>,
    credentials: Vec<Credential>,
    locations: Vec<Location>,
    assignments: Vec<Assignment>,
    supervisor_locations: Vec<SupervisorLocation>,
    attendance: Vec<AttendanceRecord>,
    leaves: Vec<LeaveRequest>,
    holidays: Vec<NaiveDate>,
    config: Option<SystemConfig>,
    writes: usize,
    next_id: u64,
}

impl State {
    fn id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().expect("memory store poisoned");
        f(&mut state)
    }

    pub fn add_staff(&self, member: StaffMember) {
        self.with(|s| s.staff.push(member));
    }

    pub fn add_credential(&self, credential: Credential) {
        self.with(|s| s.credentials.push(credential));
    }

    pub fn add_location(&self, location: Location) {
        self.with(|s| s.locations.push(location));
    }

    /// New assignment deactivates every earlier one for the same staff member.
    pub fn assign(&self, staff_id: u64, supervisor_id: u64, location_id: u64) {
        self.with(|s| {
            for a in s.assignments.iter_mut().filter(|a| a.staff_id == staff_id) {
                a.is_active = false;
            }
            let id = s.id();
            s.assignments.push(Assignment {
                id,
                staff_id,
                supervisor_id,
                location_id,
                is_active: true,
            });
        });
    }

    pub fn deactivate_assignments(&self, staff_id: u64) {
        self.with(|s| {
            for a in s.assignments.iter_mut().filter(|a| a.staff_id == staff_id) {
                a.is_active = false;
            }
        });
    }

    pub fn map_supervisor(&self, supervisor_id: u64, location_id: u64) {
        self.with(|s| {
            let id = s.id();
            s.supervisor_locations.push(SupervisorLocation {
                id,
                supervisor_id,
                location_id,
                is_active: true,
            });
        });
    }

    pub fn add_leave(&self, staff_id: u64, start: NaiveDate, end: NaiveDate, status: LeaveStatus) -> u64 {
        self.with(|s| {
            let id = s.id();
            s.leaves.push(LeaveRequest {
                id,
                staff_id,
                start_date: start,
                end_date: end,
                leave_type: LeaveType::Annual.to_string(),
                status: status.to_string(),
            });
            id
        })
    }

    pub fn add_holiday(&self, date: NaiveDate) {
        self.with(|s| s.holidays.push(date));
    }

    /// Stores a record as-is, bypassing the open-record guard.
    pub fn put_record(&self, mut record: AttendanceRecord) -> u64 {
        self.with(|s| {
            record.id = s.id();
            let id = record.id;
            s.attendance.push(record);
            id
        })
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.with(|s| s.attendance.clone())
    }

    /// Number of attendance inserts and updates performed through the trait.
    pub fn attendance_writes(&self) -> usize {
        self.with(|s| s.writes)
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn find_staff(&self, id: u64) -> Result<Option<StaffMember>> {
        Ok(self.with(|s| s.staff.iter().find(|m| m.id == id).cloned()))
    }

    async fn find_staff_many(&self, ids: &[u64]) -> Result<Vec<StaffMember>> {
        Ok(self.with(|s| s.staff.iter().filter(|m| ids.contains(&m.id)).cloned().collect()))
    }

    async fn find_credential(&self, username: &str) -> Result<Option<Credential>> {
        Ok(self.with(|s| s.credentials.iter().find(|c| c.username == username).cloned()))
    }
}

#[async_trait]
impl LocationCatalog for MemoryStore {
    async fn find_location(&self, id: u64) -> Result<Option<Location>> {
        Ok(self.with(|s| s.locations.iter().find(|l| l.id == id).cloned()))
    }

    async fn find_locations(&self, ids: &[u64]) -> Result<Vec<Location>> {
        Ok(self.with(|s| s.locations.iter().filter(|l| ids.contains(&l.id)).cloned().collect()))
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn active_assignment(
        &self,
        staff_id: u64,
        supervisor_id: u64,
        location_id: u64,
    ) -> Result<Option<Assignment>> {
        Ok(self.with(|s| {
            s.assignments
                .iter()
                .find(|a| {
                    a.is_active
                        && a.staff_id == staff_id
                        && a.supervisor_id == supervisor_id
                        && a.location_id == location_id
                })
                .cloned()
        }))
    }

    async fn active_supervisor_location(
        &self,
        supervisor_id: u64,
        location_id: u64,
    ) -> Result<Option<SupervisorLocation>> {
        Ok(self.with(|s| {
            s.supervisor_locations
                .iter()
                .find(|m| m.is_active && m.supervisor_id == supervisor_id && m.location_id == location_id)
                .cloned()
        }))
    }

    async fn staff_has_any_assignment(&self, staff_id: u64) -> Result<bool> {
        Ok(self.with(|s| s.assignments.iter().any(|a| a.staff_id == staff_id)))
    }

    async fn supervisor_has_any_location(&self, supervisor_id: u64) -> Result<bool> {
        Ok(self.with(|s| s.supervisor_locations.iter().any(|m| m.supervisor_id == supervisor_id)))
    }

    async fn active_assignments(&self) -> Result<Vec<Assignment>> {
        Ok(self.with(|s| s.assignments.iter().filter(|a| a.is_active).cloned().collect()))
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_open(&self, staff_id: u64, date: NaiveDate) -> Result<Option<AttendanceRecord>> {
        Ok(self.with(|s| {
            s.attendance
                .iter()
                .find(|r| r.staff_id == staff_id && r.attendance_date == date && r.is_open())
                .cloned()
        }))
    }

    async fn find_for_day(
        &self,
        staff_id: u64,
        supervisor_id: u64,
        location_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        Ok(self.with(|s| {
            let mut matching: Vec<&AttendanceRecord> = s
                .attendance
                .iter()
                .filter(|r| {
                    r.staff_id == staff_id
                        && r.supervisor_id == supervisor_id
                        && r.location_id == location_id
                        && r.attendance_date == date
                })
                .collect();
            matching.sort_by_key(|r| (r.is_open(), r.clock_in_at));
            matching.last().map(|r| (*r).clone())
        }))
    }

    async fn insert_if_no_open(&self, new: NewAttendance) -> Result<InsertOutcome> {
        Ok(self.with(|s| {
            if let Some(open) = s
                .attendance
                .iter()
                .find(|r| r.staff_id == new.staff_id && r.attendance_date == new.attendance_date && r.is_open())
            {
                return InsertOutcome::Existing(open.clone());
            }
            let record = AttendanceRecord {
                id: s.id(),
                staff_id: new.staff_id,
                supervisor_id: new.supervisor_id,
                location_id: new.location_id,
                attendance_date: new.attendance_date,
                clock_in_at: Some(new.clock_in_at),
                clock_in_lat: new.geo.map(|g| g.lat),
                clock_in_lng: new.geo.map(|g| g.lng),
                clock_in_photo: new.photo,
                clock_out_at: None,
                clock_out_lat: None,
                clock_out_lng: None,
                clock_out_photo: None,
                status: new.status.to_string(),
                approval_status: ApprovalStatus::Pending.to_string(),
                is_overtime: new.is_overtime,
                is_double_duty: new.is_double_duty,
                is_override: new.is_override,
                clocked_in_by: new.clocked_in_by,
                clocked_out_by: None,
            };
            s.attendance.push(record.clone());
            s.writes += 1;
            InsertOutcome::Created(record)
        }))
    }

    async fn close(&self, id: u64, update: ClockOutUpdate) -> Result<Option<AttendanceRecord>> {
        Ok(self.with(|s| {
            let record = s.attendance.iter_mut().find(|r| r.id == id && r.clock_out_at.is_none())?;
            record.clock_out_at = Some(update.clock_out_at);
            record.clock_out_lat = update.geo.map(|g| g.lat);
            record.clock_out_lng = update.geo.map(|g| g.lng);
            record.clock_out_photo = update.photo;
            record.clocked_out_by = update.clocked_out_by;
            record.is_override = record.is_override || update.is_override;
            let closed = record.clone();
            s.writes += 1;
            Some(closed)
        }))
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>> {
        Ok(self.with(|s| s.attendance.iter().find(|r| r.id == id).cloned()))
    }

    async fn in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        supervisor_id: Option<u64>,
        location_id: Option<u64>,
    ) -> Result<Vec<AttendanceRecord>> {
        Ok(self.with(|s| {
            s.attendance
                .iter()
                .filter(|r| r.attendance_date >= from && r.attendance_date <= to)
                .filter(|r| supervisor_id.is_none_or(|id| r.supervisor_id == id))
                .filter(|r| location_id.is_none_or(|id| r.location_id == id))
                .cloned()
                .collect()
        }))
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn approved_overlapping(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<LeaveRequest>> {
        Ok(self.with(|s| {
            s.leaves
                .iter()
                .filter(|l| l.is_approved() && l.overlap(from, to).is_some())
                .cloned()
                .collect()
        }))
    }

    async fn find_leave(&self, id: u64) -> Result<Option<LeaveRequest>> {
        Ok(self.with(|s| s.leaves.iter().find(|l| l.id == id).cloned()))
    }

    async fn create_leave(
        &self,
        staff_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        leave_type: LeaveType,
    ) -> Result<LeaveRequest> {
        Ok(self.with(|s| {
            let leave = LeaveRequest {
                id: s.id(),
                staff_id,
                start_date: start,
                end_date: end,
                leave_type: leave_type.to_string(),
                status: LeaveStatus::Pending.to_string(),
            };
            s.leaves.push(leave.clone());
            leave
        }))
    }

    async fn decide_leave(&self, id: u64, status: LeaveStatus) -> Result<Option<LeaveRequest>> {
        Ok(self.with(|s| {
            let leave = s
                .leaves
                .iter_mut()
                .find(|l| l.id == id && l.status == LeaveStatus::Pending.to_string())?;
            leave.status = status.to_string();
            Some(leave.clone())
        }))
    }
}

#[async_trait]
impl HolidayCalendar for MemoryStore {
    async fn holidays_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>> {
        Ok(self.with(|s| s.holidays.iter().copied().filter(|d| *d >= from && *d <= to).collect()))
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn load_config(&self) -> Result<Option<SystemConfig>> {
        Ok(self.with(|s| s.config))
    }

    async fn save_config(&self, config: &SystemConfig) -> Result<()> {
        self.with(|s| s.config = Some(*config));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .and_then(|d| d.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    fn row(clock_in: Option<NaiveDateTime>, clock_out: Option<NaiveDateTime>) -> AttendanceRecord {
        AttendanceRecord {
            id: 0,
            staff_id: 1,
            supervisor_id: 10,
            location_id: 100,
            attendance_date: at(0).date(),
            clock_in_at: clock_in,
            clock_in_lat: None,
            clock_in_lng: None,
            clock_in_photo: None,
            clock_out_at: clock_out,
            clock_out_lat: None,
            clock_out_lng: None,
            clock_out_photo: None,
            status: "Present".into(),
            approval_status: "pending".into(),
            is_overtime: false,
            is_double_duty: false,
            is_override: false,
            clocked_in_by: None,
            clocked_out_by: None,
        }
    }

    #[actix_web::test]
    async fn day_lookup_prefers_a_real_open_record() {
        let store = MemoryStore::default();
        let open = store.put_record(row(Some(at(8)), None));
        store.put_record(row(None, None));
        store.put_record(row(Some(at(6)), Some(at(7))));

        let found = store.find_for_day(1, 10, 100, at(0).date()).await.unwrap().unwrap();
        assert_eq!(found.id, open);
    }

    #[actix_web::test]
    async fn day_lookup_without_open_record_takes_latest_clock_in() {
        let store = MemoryStore::default();
        store.put_record(row(Some(at(6)), Some(at(7))));
        let latest = store.put_record(row(Some(at(12)), Some(at(13))));
        store.put_record(row(None, None));

        let found = store.find_for_day(1, 10, 100, at(0).date()).await.unwrap().unwrap();
        assert_eq!(found.id, latest);
    }
}
