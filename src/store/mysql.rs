use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::MySqlPool;

use super::{
    AssignmentStore, AttendanceStore, ConfigStore, Directory, HolidayCalendar, LeaveStore,
    LocationCatalog,
};
use crate::model::{
    assignment::{Assignment, SupervisorLocation},
    attendance::{AttendanceRecord, ClockOutUpdate, InsertOutcome, NewAttendance},
    leave_request::{LeaveRequest, LeaveStatus, LeaveType},
    location::Location,
    staff::{Credential, StaffMember},
    system_config::SystemConfig,
};

const STAFF_COLUMNS: &str =
    "id, name, role, department, departments, shift_days, shift_start, shift_end, is_active";

const LOCATION_COLUMNS: &str = "id, name, code, latitude, longitude, radius_m, \
     morning_shift_start, morning_shift_end, night_shift_start, night_shift_end, is_office";

/// Open records (clocked in, not out) first, then the most recent clock-in.
const FIND_FOR_DAY_ORDER: &str =
    "(clock_in_at IS NOT NULL AND clock_out_at IS NULL) DESC, clock_in_at DESC";

const ATTENDANCE_COLUMNS: &str = "id, staff_id, supervisor_id, location_id, attendance_date, \
     clock_in_at, clock_in_lat, clock_in_lng, clock_in_photo, \
     clock_out_at, clock_out_lat, clock_out_lng, clock_out_photo, \
     status, approval_status, is_overtime, is_double_duty, is_override, \
     clocked_in_by, clocked_out_by";

/// `?, ?, ?` for an IN list.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Every repository on one MySQL pool.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for MySqlStore {
    async fn find_staff(&self, id: u64) -> Result<Option<StaffMember>> {
        let sql = format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?");
        sqlx::query_as::<_, StaffMember>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("fetching staff member")
    }

    async fn find_staff_many(&self, ids: &[u64]) -> Result<Vec<StaffMember>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut q = sqlx::query_as::<_, StaffMember>(&sql);
        for id in ids {
            q = q.bind(*id);
        }
        q.fetch_all(&self.pool).await.context("fetching staff members")
    }

    async fn find_credential(&self, username: &str) -> Result<Option<Credential>> {
        sqlx::query_as::<_, Credential>(
            r#"
            SELECT id, username, password_hash, role
            FROM staff
            WHERE username = ? AND is_active = TRUE
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("fetching credential")
    }
}

#[async_trait]
impl LocationCatalog for MySqlStore {
    async fn find_location(&self, id: u64) -> Result<Option<Location>> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?");
        sqlx::query_as::<_, Location>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("fetching location")
    }

    async fn find_locations(&self, ids: &[u64]) -> Result<Vec<Location>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut q = sqlx::query_as::<_, Location>(&sql);
        for id in ids {
            q = q.bind(*id);
        }
        q.fetch_all(&self.pool).await.context("fetching locations")
    }
}

#[async_trait]
impl AssignmentStore for MySqlStore {
    async fn active_assignment(
        &self,
        staff_id: u64,
        supervisor_id: u64,
        location_id: u64,
    ) -> Result<Option<Assignment>> {
        sqlx::query_as::<_, Assignment>(
            r#"
            SELECT id, staff_id, supervisor_id, location_id, is_active
            FROM assignments
            WHERE staff_id = ? AND supervisor_id = ? AND location_id = ? AND is_active = TRUE
            LIMIT 1
            "#,
        )
        .bind(staff_id)
        .bind(supervisor_id)
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching assignment")
    }

    async fn active_supervisor_location(
        &self,
        supervisor_id: u64,
        location_id: u64,
    ) -> Result<Option<SupervisorLocation>> {
        sqlx::query_as::<_, SupervisorLocation>(
            r#"
            SELECT id, supervisor_id, location_id, is_active
            FROM supervisor_locations
            WHERE supervisor_id = ? AND location_id = ? AND is_active = TRUE
            "#,
        )
        .bind(supervisor_id)
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching supervisor location")
    }

    async fn staff_has_any_assignment(&self, staff_id: u64) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM assignments WHERE staff_id = ? LIMIT 1)",
        )
        .bind(staff_id)
        .fetch_one(&self.pool)
        .await
        .context("checking staff assignments")
    }

    async fn supervisor_has_any_location(&self, supervisor_id: u64) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM supervisor_locations WHERE supervisor_id = ? LIMIT 1)",
        )
        .bind(supervisor_id)
        .fetch_one(&self.pool)
        .await
        .context("checking supervisor locations")
    }

    async fn active_assignments(&self) -> Result<Vec<Assignment>> {
        sqlx::query_as::<_, Assignment>(
            r#"
            SELECT id, staff_id, supervisor_id, location_id, is_active
            FROM assignments
            WHERE is_active = TRUE
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("listing active assignments")
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_open(&self, staff_id: u64, date: NaiveDate) -> Result<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE staff_id = ? AND attendance_date = ? \
             AND clock_in_at IS NOT NULL AND clock_out_at IS NULL \
             LIMIT 1"
        );
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(staff_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .context("fetching open attendance")
    }

    async fn find_for_day(
        &self,
        staff_id: u64,
        supervisor_id: u64,
        location_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE staff_id = ? AND supervisor_id = ? AND location_id = ? AND attendance_date = ? \
             ORDER BY {FIND_FOR_DAY_ORDER} \
             LIMIT 1"
        );
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(staff_id)
            .bind(supervisor_id)
            .bind(location_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .context("fetching attendance for day")
    }

    async fn insert_if_no_open(&self, new: NewAttendance) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (staff_id, supervisor_id, location_id, attendance_date,
                 clock_in_at, clock_in_lat, clock_in_lng, clock_in_photo,
                 status, approval_status, is_overtime, is_double_duty, is_override, clocked_in_by)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?, ?
            FROM DUAL
            WHERE NOT EXISTS (
                SELECT 1 FROM attendance
                WHERE staff_id = ? AND attendance_date = ?
                AND clock_in_at IS NOT NULL AND clock_out_at IS NULL
            )
            "#,
        )
        .bind(new.staff_id)
        .bind(new.supervisor_id)
        .bind(new.location_id)
        .bind(new.attendance_date)
        .bind(new.clock_in_at)
        .bind(new.geo.map(|g| g.lat))
        .bind(new.geo.map(|g| g.lng))
        .bind(new.photo.as_deref())
        .bind(new.status.as_ref())
        .bind(new.is_overtime)
        .bind(new.is_double_duty)
        .bind(new.is_override)
        .bind(new.clocked_in_by)
        .bind(new.staff_id)
        .bind(new.attendance_date)
        .execute(&self.pool)
        .await
        .context("inserting attendance")?;

        if result.rows_affected() == 0 {
            let open = self
                .find_open(new.staff_id, new.attendance_date)
                .await?
                .context("open attendance vanished after conflicting insert")?;
            return Ok(InsertOutcome::Existing(open));
        }

        let created = self
            .find_by_id(result.last_insert_id())
            .await?
            .context("inserted attendance not readable")?;
        Ok(InsertOutcome::Created(created))
    }

    async fn close(&self, id: u64, update: ClockOutUpdate) -> Result<Option<AttendanceRecord>> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET clock_out_at = ?, clock_out_lat = ?, clock_out_lng = ?, clock_out_photo = ?,
                clocked_out_by = ?, is_override = ?
            WHERE id = ? AND clock_out_at IS NULL
            "#,
        )
        .bind(update.clock_out_at)
        .bind(update.geo.map(|g| g.lat))
        .bind(update.geo.map(|g| g.lng))
        .bind(update.photo.as_deref())
        .bind(update.clocked_out_by)
        .bind(update.is_override)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("closing attendance")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = ?");
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("fetching attendance")
    }

    async fn in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        supervisor_id: Option<u64>,
        location_id: Option<u64>,
    ) -> Result<Vec<AttendanceRecord>> {
        let mut sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE attendance_date BETWEEN ? AND ?"
        );
        if supervisor_id.is_some() {
            sql.push_str(" AND supervisor_id = ?");
        }
        if location_id.is_some() {
            sql.push_str(" AND location_id = ?");
        }

        let mut q = sqlx::query_as::<_, AttendanceRecord>(&sql).bind(from).bind(to);
        if let Some(id) = supervisor_id {
            q = q.bind(id);
        }
        if let Some(id) = location_id {
            q = q.bind(id);
        }
        q.fetch_all(&self.pool).await.context("listing attendance in range")
    }
}

#[async_trait]
impl LeaveStore for MySqlStore {
    async fn approved_overlapping(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRequest>(
            r#"
            SELECT id, staff_id, start_date, end_date, leave_type, status
            FROM leave_requests
            WHERE status = 'approved' AND start_date <= ? AND end_date >= ?
            "#,
        )
        .bind(to)
        .bind(from)
        .fetch_all(&self.pool)
        .await
        .context("listing approved leave")
    }

    async fn find_leave(&self, id: u64) -> Result<Option<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRequest>(
            r#"
            SELECT id, staff_id, start_date, end_date, leave_type, status
            FROM leave_requests
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching leave request")
    }

    async fn create_leave(
        &self,
        staff_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        leave_type: LeaveType,
    ) -> Result<LeaveRequest> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests (staff_id, start_date, end_date, leave_type, status)
            VALUES (?, ?, ?, ?, 'pending')
            "#,
        )
        .bind(staff_id)
        .bind(start)
        .bind(end)
        .bind(leave_type.as_ref())
        .execute(&self.pool)
        .await
        .context("inserting leave request")?;

        self.find_leave(result.last_insert_id())
            .await?
            .context("inserted leave request not readable")
    }

    async fn decide_leave(&self, id: u64, status: LeaveStatus) -> Result<Option<LeaveRequest>> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(status.as_ref())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("deciding leave request")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_leave(id).await
    }
}

#[async_trait]
impl HolidayCalendar for MySqlStore {
    async fn holidays_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>> {
        sqlx::query_scalar::<_, NaiveDate>(
            "SELECT holiday_date FROM holidays WHERE holiday_date BETWEEN ? AND ?",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .context("listing holidays")
    }
}

#[async_trait]
impl ConfigStore for MySqlStore {
    async fn load_config(&self) -> Result<Option<SystemConfig>> {
        sqlx::query_as::<_, SystemConfig>(
            "SELECT grace_period_minutes, min_clock_interval_hours FROM system_config WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("loading system config")
    }

    async fn save_config(&self, config: &SystemConfig) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO system_config (id, grace_period_minutes, min_clock_interval_hours)
            VALUES (1, ?, ?)
            ON DUPLICATE KEY UPDATE
                grace_period_minutes = VALUES(grace_period_minutes),
                min_clock_interval_hours = VALUES(min_clock_interval_hours)
            "#,
        )
        .bind(config.grace_period_minutes)
        .bind(config.min_clock_interval_hours)
        .execute(&self.pool)
        .await
        .context("saving system config")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FIND_FOR_DAY_ORDER, placeholders};

    #[test]
    fn placeholder_list() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn day_lookup_ranks_only_clocked_in_rows_as_open() {
        assert!(FIND_FOR_DAY_ORDER.starts_with("(clock_in_at IS NOT NULL AND clock_out_at IS NULL) DESC"));
    }
}
