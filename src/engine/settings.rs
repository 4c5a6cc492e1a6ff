use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::info;

use super::{
    bounded,
    error::{AttendanceError, EngineResult},
    hierarchy::has_full_control,
};
use crate::model::{
    staff::StaffMember,
    system_config::{
        MAX_GRACE_PERIOD_MINUTES, MAX_MIN_CLOCK_INTERVAL_HOURS, SystemConfig, SystemConfigUpdate,
    },
};
use crate::store::ConfigStore;

/// Read-mostly access to the system configuration singleton.
pub struct Settings {
    store: Arc<dyn ConfigStore>,
    cache: Cache<(), SystemConfig>,
    io_timeout: Duration,
}

impl Settings {
    pub fn new(store: Arc<dyn ConfigStore>, io_timeout: Duration) -> Self {
        Self {
            store,
            cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(30))
                .build(),
            io_timeout,
        }
    }

    /// Stored values, or the defaults when nothing has been saved yet.
    pub async fn current(&self) -> EngineResult<SystemConfig> {
        if let Some(cached) = self.cache.get(&()).await {
            return Ok(cached);
        }
        let loaded = bounded(self.io_timeout, "load_config", self.store.load_config())
            .await?
            .unwrap_or_default();
        self.cache.insert((), loaded).await;
        Ok(loaded)
    }

    pub async fn update(
        &self,
        actor: &StaffMember,
        changes: SystemConfigUpdate,
    ) -> EngineResult<SystemConfig> {
        if !has_full_control(&actor.role) {
            return Err(AttendanceError::unauthorized(
                "only ceo or super admin may change system configuration",
            ));
        }

        let mut next = self.current().await?;
        if let Some(grace) = changes.grace_period_minutes {
            if grace > MAX_GRACE_PERIOD_MINUTES {
                return Err(AttendanceError::InvalidValue {
                    field: "grace_period_minutes",
                    min: 0.0,
                    max: MAX_GRACE_PERIOD_MINUTES as f64,
                });
            }
            next.grace_period_minutes = grace;
        }
        if let Some(hours) = changes.min_clock_interval_hours {
            if !(0.0..=MAX_MIN_CLOCK_INTERVAL_HOURS).contains(&hours) {
                return Err(AttendanceError::InvalidValue {
                    field: "min_clock_interval_hours",
                    min: 0.0,
                    max: MAX_MIN_CLOCK_INTERVAL_HOURS,
                });
            }
            next.min_clock_interval_hours = hours;
        }

        bounded(self.io_timeout, "save_config", self.store.save_config(&next)).await?;
        self.cache.invalidate(&()).await;
        info!(
            actor_id = actor.id,
            grace_period_minutes = next.grace_period_minutes,
            min_clock_interval_hours = next.min_clock_interval_hours,
            "System configuration updated"
        );
        Ok(next)
    }
}
