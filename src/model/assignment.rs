use serde::{Deserialize, Serialize};

/// Staff member placed under a supervisor at a location. One active row per staff.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Assignment {
    pub id: u64,
    pub staff_id: u64,
    pub supervisor_id: u64,
    pub location_id: u64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SupervisorLocation {
    pub id: u64,
    pub supervisor_id: u64,
    pub location_id: u64,
    pub is_active: bool,
}
