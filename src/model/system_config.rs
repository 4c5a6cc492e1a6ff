use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_GRACE_PERIOD_MINUTES: u32 = 15;
pub const DEFAULT_MIN_CLOCK_INTERVAL_HOURS: f64 = 6.0;
pub const MAX_GRACE_PERIOD_MINUTES: u32 = 1440;
pub const MAX_MIN_CLOCK_INTERVAL_HOURS: f64 = 24.0;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SystemConfig {
    #[schema(example = 15)]
    pub grace_period_minutes: u32,
    #[schema(example = 6.0)]
    pub min_clock_interval_hours: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            grace_period_minutes: DEFAULT_GRACE_PERIOD_MINUTES,
            min_clock_interval_hours: DEFAULT_MIN_CLOCK_INTERVAL_HOURS,
        }
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct SystemConfigUpdate {
    #[schema(example = 10)]
    pub grace_period_minutes: Option<u32>,
    #[schema(example = 8.0)]
    pub min_clock_interval_hours: Option<f64>,
}
