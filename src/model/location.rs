use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_GEOFENCE_RADIUS_M: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Location {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "Head Office")]
    pub name: String,
    #[schema(example = "HQ-OFFICE", nullable = true)]
    pub code: Option<String>,
    #[schema(example = 23.8103, nullable = true)]
    pub latitude: Option<f64>,
    #[schema(example = 90.4125, nullable = true)]
    pub longitude: Option<f64>,
    #[schema(example = 150.0, nullable = true)]
    pub radius_m: Option<f64>,
    #[schema(example = "08:00", nullable = true)]
    pub morning_shift_start: Option<String>,
    #[schema(example = "16:00", nullable = true)]
    pub morning_shift_end: Option<String>,
    #[schema(example = "20:00", nullable = true)]
    pub night_shift_start: Option<String>,
    #[schema(example = "04:00", nullable = true)]
    pub night_shift_end: Option<String>,
    pub is_office: bool,
}

impl Location {
    /// Explicit flag, or "office" anywhere in the name or code.
    pub fn is_office_location(&self) -> bool {
        let mentions_office = |s: &str| s.to_lowercase().contains("office");
        self.is_office || mentions_office(&self.name) || self.code.as_deref().is_some_and(mentions_office)
    }

    pub fn geocenter(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    pub fn geofence_radius(&self) -> f64 {
        self.radius_m.unwrap_or(DEFAULT_GEOFENCE_RADIUS_M)
    }
}
