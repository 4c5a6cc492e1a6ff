use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{
    bounded,
    error::{AttendanceError, EngineResult},
};
use crate::store::AssignmentStore;

/// Which assignment checks a clock action must pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CheckScope {
    /// Supervisor at location, and staff under supervisor at location.
    ClockIn,
    /// Supervisor at location only.
    ClockOut,
}

/// Decides whether the staff -> supervisor -> location chain an action names is real.
pub struct AssignmentResolver {
    store: Arc<dyn AssignmentStore>,
    io_timeout: Duration,
}

impl AssignmentResolver {
    pub fn new(store: Arc<dyn AssignmentStore>, io_timeout: Duration) -> Self {
        Self { store, io_timeout }
    }

    pub async fn resolve_supervisor_location(
        &self,
        supervisor_id: u64,
        location_id: u64,
    ) -> EngineResult<()> {
        let mapping = bounded(
            self.io_timeout,
            "active_supervisor_location",
            self.store.active_supervisor_location(supervisor_id, location_id),
        )
        .await?;
        match mapping {
            Some(_) => Ok(()),
            None => Err(AttendanceError::unauthorized(format!(
                "supervisor {supervisor_id} not assigned to location {location_id}"
            ))),
        }
    }

    /// A supervisor clocking themself needs no staff assignment.
    pub async fn resolve_staff_assignment(
        &self,
        staff_id: u64,
        supervisor_id: u64,
        location_id: u64,
    ) -> EngineResult<()> {
        if staff_id == supervisor_id {
            return Ok(());
        }
        let assignment = bounded(
            self.io_timeout,
            "active_assignment",
            self.store.active_assignment(staff_id, supervisor_id, location_id),
        )
        .await?;
        match assignment {
            Some(_) => Ok(()),
            None => Err(AttendanceError::unauthorized(format!(
                "staff {staff_id} not assigned to supervisor {supervisor_id} at location {location_id}"
            ))),
        }
    }

    /// Residual check under override: the target must be assigned somewhere.
    pub async fn resolve_override_target(&self, staff_id: u64, supervisor_id: u64) -> EngineResult<()> {
        let known = if staff_id == supervisor_id {
            bounded(
                self.io_timeout,
                "supervisor_has_any_location",
                self.store.supervisor_has_any_location(supervisor_id),
            )
            .await?
        } else {
            bounded(
                self.io_timeout,
                "staff_has_any_assignment",
                self.store.staff_has_any_assignment(staff_id),
            )
            .await?
        };
        if known {
            Ok(())
        } else {
            Err(AttendanceError::unauthorized(format!(
                "override refused: staff {staff_id} has no assignment anywhere"
            )))
        }
    }

    pub async fn authorize(
        &self,
        scope: CheckScope,
        override_mode: bool,
        staff_id: u64,
        supervisor_id: u64,
        location_id: u64,
    ) -> EngineResult<()> {
        if override_mode {
            debug!(staff_id, supervisor_id, "Assignment checks replaced by override");
            return self.resolve_override_target(staff_id, supervisor_id).await;
        }
        self.resolve_supervisor_location(supervisor_id, location_id).await?;
        if scope == CheckScope::ClockIn {
            self.resolve_staff_assignment(staff_id, supervisor_id, location_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn resolver(store: MemoryStore) -> AssignmentResolver {
        AssignmentResolver::new(Arc::new(store), Duration::from_secs(1))
    }

    #[actix_web::test]
    async fn full_chain_passes() {
        let store = MemoryStore::default();
        store.map_supervisor(10, 100);
        store.assign(1, 10, 100);
        let r = resolver(store);
        r.authorize(CheckScope::ClockIn, false, 1, 10, 100).await.unwrap();
    }

    #[actix_web::test]
    async fn missing_supervisor_mapping_fails() {
        let store = MemoryStore::default();
        store.assign(1, 10, 100);
        let r = resolver(store);
        let err = r.authorize(CheckScope::ClockIn, false, 1, 10, 100).await.unwrap_err();
        assert!(err.to_string().contains("supervisor 10 not assigned to location 100"));
    }

    #[actix_web::test]
    async fn inactive_assignment_does_not_count() {
        let store = MemoryStore::default();
        store.map_supervisor(10, 100);
        store.assign(1, 10, 100);
        store.assign(1, 11, 100);
        let r = resolver(store);
        let err = r.authorize(CheckScope::ClockIn, false, 1, 10, 100).await.unwrap_err();
        assert!(matches!(err, AttendanceError::AuthorizationFailure { .. }));
    }

    #[actix_web::test]
    async fn supervisor_self_action_skips_staff_assignment() {
        let store = MemoryStore::default();
        store.map_supervisor(10, 100);
        let r = resolver(store);
        r.authorize(CheckScope::ClockIn, false, 10, 10, 100).await.unwrap();
    }

    #[actix_web::test]
    async fn clock_out_does_not_recheck_staff_assignment() {
        let store = MemoryStore::default();
        store.map_supervisor(10, 100);
        let r = resolver(store);
        r.authorize(CheckScope::ClockOut, false, 1, 10, 100).await.unwrap();
    }

    #[actix_web::test]
    async fn override_still_needs_some_assignment() {
        let store = MemoryStore::default();
        store.assign(2, 99, 999);
        let r = resolver(store);

        let err = r.authorize(CheckScope::ClockIn, true, 1, 10, 100).await.unwrap_err();
        assert!(matches!(err, AttendanceError::AuthorizationFailure { .. }));
        r.authorize(CheckScope::ClockIn, true, 2, 10, 100).await.unwrap();
    }
}
